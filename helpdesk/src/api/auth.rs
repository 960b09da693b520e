//! Bearer-token extraction and the `/api/auth` handlers.

use super::{ApiError, AppState, AtPath};
use crate::desk::AuthResponse;
use crate::error::HelpdeskError;
use crate::identity::SessionToken;
use crate::validation::{Credentials, Registration};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode, Uri},
    Json,
};

/// Token from an `Authorization: Bearer <token>` header.
///
/// Rejects with 401 when the header is missing or not a bearer credential.
/// Whether the token names a live session is decided by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(pub SessionToken);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_credential)
            .map(|t| Self(SessionToken::from_header(t)))
            .ok_or_else(|| {
                ApiError::new(
                    HelpdeskError::Unauthenticated("Authentication required".to_string()),
                    parts.uri.path(),
                )
            })
    }
}

/// Credential of a `Bearer` authorization value. The scheme is case-insensitive.
fn bearer_credential(value: &str) -> Option<&str> {
    let (scheme, credential) = value.trim_start().split_once(' ')?;
    let credential = credential.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !credential.is_empty()).then_some(credential)
}

/// Create a `USER` account and sign it in.
///
/// ```text
/// POST /api/auth/register
/// { "username": "alice", "email": "alice@example.com", "password": "..." }
/// ```
///
/// # Errors
///
/// 400 on invalid fields, 409 when the username or email is taken.
pub async fn register(
    State(state): State<AppState>,
    uri: Uri,
    body: Result<Json<Registration>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(registration) = body.map_err(|r| ApiError::body(&r, &uri))?;
    state.store.register(registration).await.at(&uri).map(Json)
}

/// Exchange credentials for a bearer token.
///
/// ```text
/// POST /api/auth/login
/// { "username": "alice", "password": "..." }
/// ```
///
/// # Errors
///
/// 400 on empty fields, 401 on bad credentials.
pub async fn login(
    State(state): State<AppState>,
    uri: Uri,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(credentials) = body.map_err(|r| ApiError::body(&r, &uri))?;
    state.store.login(credentials).await.at(&uri).map(Json)
}

/// End the caller's session.
///
/// # Errors
///
/// 401 without a bearer token.
pub async fn logout(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, ApiError> {
    state.store.logout(&token).await.at(&uri)?;
    Ok(StatusCode::NO_CONTENT)
}
