//! `/api/tickets/:id/comments` handlers.

use super::{ApiError, AppState, AtPath, BearerToken};
use crate::desk::CommentView;
use crate::types::{CommentId, TicketId};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{StatusCode, Uri},
    Json,
};
use serde::Deserialize;

/// Body of a new comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentBody {
    /// Comment text
    pub content: String,
}

/// Comments on a ticket, newest first.
///
/// # Errors
///
/// 401 without a session, 404 for an unknown ticket.
pub async fn list_comments(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<TicketId>, PathRejection>,
) -> Result<Json<Vec<CommentView>>, ApiError> {
    let Path(ticket_id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    state.store.comments(&token, ticket_id).await.at(&uri).map(Json)
}

/// Comment on a ticket.
///
/// ```text
/// POST /api/tickets/:id/comments
/// { "content": "Rebooted the router" }
/// ```
///
/// # Errors
///
/// 400 on empty or overlong content, 401, or 404 for an unknown ticket.
pub async fn add_comment(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<TicketId>, PathRejection>,
    body: Result<Json<CommentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let Path(ticket_id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    let Json(CommentBody { content }) = body.map_err(|r| ApiError::body(&r, &uri))?;
    let view = state
        .store
        .add_comment(&token, ticket_id, content)
        .await
        .at(&uri)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Remove a comment. Author or ADMIN.
///
/// # Errors
///
/// 401, 403, or 404 for an unknown ticket or comment.
pub async fn delete_comment(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    ids: Result<Path<(TicketId, CommentId)>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path((ticket_id, comment_id)) = ids.map_err(|r| ApiError::path(&r, &uri))?;
    state
        .store
        .delete_comment(&token, ticket_id, comment_id)
        .await
        .at(&uri)?;
    Ok(StatusCode::NO_CONTENT)
}
