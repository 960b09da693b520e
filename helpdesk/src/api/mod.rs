//! HTTP surface of the help desk.
//!
//! A thin axum layer over [`DeskStore`]: handlers extract the bearer token,
//! path and body, call one store operation and map the outcome to JSON or to
//! an [`ApiError`] envelope. No policy lives here.
//!
//! # Routes
//!
//! - `GET /health`
//! - `POST /api/auth/register`, `POST /api/auth/login`, `POST /api/auth/logout`
//! - `GET|POST /api/tickets`, `GET /api/tickets/search`
//! - `GET|PUT|DELETE /api/tickets/:id`
//! - `GET|POST /api/tickets/:id/comments`, `DELETE /api/tickets/:id/comments/:comment_id`
//! - `GET /api/users`, `GET|DELETE /api/users/:id`
//! - `PATCH /api/users/:id/role?role=...`, `PATCH /api/users/:id/toggle`

pub mod auth;
pub mod comments;
pub mod error;
pub mod tickets;
pub mod users;

pub use auth::BearerToken;
pub use error::{ApiError, AtPath};

use crate::config::PagingConfig;
use crate::desk::DeskStore;
use axum::{
    http::StatusCode,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    /// The backend
    pub store: Arc<DeskStore>,
    /// Page size limits
    pub paging: PagingConfig,
}

impl AppState {
    /// Creates a new `AppState`
    #[must_use]
    pub const fn new(store: Arc<DeskStore>, paging: PagingConfig) -> Self {
        Self { store, paging }
    }
}

/// Liveness check.
///
/// ```text
/// GET /health
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, &'static str) {
    (StatusCode::OK, "ok")
}

/// Build the router with every endpoint.
///
/// # Example
///
/// ```rust,ignore
/// let app = router(AppState::new(store, config.paging))
///     .layer(TraceLayer::new_for_http());
/// ```
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        // Tickets
        .route(
            "/api/tickets",
            get(tickets::list_tickets).post(tickets::create_ticket),
        )
        .route("/api/tickets/search", get(tickets::search_tickets))
        .route(
            "/api/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        // Comments
        .route(
            "/api/tickets/:id/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/api/tickets/:id/comments/:comment_id",
            delete(comments::delete_comment),
        )
        // Users
        .route("/api/users", get(users::list_users))
        .route(
            "/api/users/:id",
            get(users::get_user).delete(users::delete_user),
        )
        .route("/api/users/:id/role", patch(users::change_role))
        .route("/api/users/:id/toggle", patch(users::toggle_user))
        .with_state(state)
}
