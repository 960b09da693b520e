//! `/api/users` handlers: listing and lookup for ADMIN or MANAGER, changes for ADMIN.

use super::{ApiError, AppState, AtPath, BearerToken};
use crate::desk::UserView;
use crate::error::HelpdeskError;
use crate::types::{Role, UserId};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    Json,
};
use serde::Deserialize;

/// Query string of the role change.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleParams {
    /// `ROLE_TECHNICIAN` or `TECHNICIAN`, case-insensitive
    pub role: String,
}

/// Every account. ADMIN or MANAGER.
///
/// # Errors
///
/// 401 or 403.
pub async fn list_users(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
) -> Result<Json<Vec<UserView>>, ApiError> {
    state.store.users(&token).await.at(&uri).map(Json)
}

/// One account. ADMIN or MANAGER.
///
/// # Errors
///
/// 401, 403, or 404 for an unknown account.
pub async fn get_user(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<UserId>, PathRejection>,
) -> Result<Json<UserView>, ApiError> {
    let Path(user_id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    state.store.user(&token, user_id).await.at(&uri).map(Json)
}

/// Enable a disabled account or disable an enabled one. ADMIN only.
///
/// ```text
/// PATCH /api/users/:id/toggle
/// ```
///
/// # Errors
///
/// 401, 403, or 404 for an unknown account.
pub async fn toggle_user(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<UserId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(user_id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    state.store.toggle_user(&token, user_id).await.at(&uri)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete an account. ADMIN only.
///
/// # Errors
///
/// 401, 403, or 404 for an unknown account.
pub async fn delete_user(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<UserId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(user_id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    state.store.delete_user(&token, user_id).await.at(&uri)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change an account's role. ADMIN only. Takes effect at the account's next login.
///
/// ```text
/// PATCH /api/users/:id/role?role=ROLE_TECHNICIAN
/// ```
///
/// # Errors
///
/// 400 on an unknown role, 401, 403, or 404 for an unknown account.
pub async fn change_role(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<UserId>, PathRejection>,
    params: Result<Query<RoleParams>, QueryRejection>,
) -> Result<Json<UserView>, ApiError> {
    let Path(user_id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    let Query(params) = params.map_err(|r| ApiError::query(&r, &uri))?;
    let role: Role = params
        .role
        .parse()
        .map_err(|e: crate::types::ParseEnumError| HelpdeskError::invalid("role", e.to_string()))
        .at(&uri)?;
    state
        .store
        .change_role(&token, user_id, role)
        .await
        .at(&uri)
        .map(Json)
}
