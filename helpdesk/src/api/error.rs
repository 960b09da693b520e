//! HTTP error responses.
//!
//! Every failed request answers with an [`ErrorEnvelope`] body and the status
//! code of the underlying [`HelpdeskError`].

use crate::error::{ErrorEnvelope, HelpdeskError};
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::fmt;

/// A [`HelpdeskError`] raised while serving `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    error: HelpdeskError,
    path: String,
}

impl ApiError {
    /// Wrap `error` for the request to `path`.
    #[must_use]
    pub fn new(error: HelpdeskError, path: impl Into<String>) -> Self {
        Self {
            error,
            path: path.into(),
        }
    }

    /// The wrapped error
    #[must_use]
    pub const fn error(&self) -> &HelpdeskError {
        &self.error
    }

    /// Malformed JSON body.
    #[must_use]
    pub fn body(rejection: &JsonRejection, uri: &Uri) -> Self {
        Self::new(HelpdeskError::invalid("body", rejection.body_text()), uri.path())
    }

    /// Malformed query string.
    #[must_use]
    pub fn query(rejection: &QueryRejection, uri: &Uri) -> Self {
        Self::new(HelpdeskError::invalid("query", rejection.body_text()), uri.path())
    }

    /// Malformed path segment, such as an id that is not a UUID.
    #[must_use]
    pub fn path(rejection: &PathRejection, uri: &Uri) -> Self {
        Self::new(HelpdeskError::invalid("id", rejection.body_text()), uri.path())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.path)
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(
                status = %status,
                path = %self.path,
                error = %self.error,
                "Internal server error"
            );
        } else {
            tracing::debug!(
                status = %status,
                path = %self.path,
                error = %self.error,
                "Request rejected"
            );
        }

        let envelope = ErrorEnvelope::from_error(&self.error, self.path, Utc::now());
        (status, Json(envelope)).into_response()
    }
}

/// Attach the request path to a domain result.
pub trait AtPath<T> {
    /// Map the error side to an [`ApiError`] for `uri`.
    ///
    /// # Errors
    ///
    /// Returns the wrapped error when `self` is an error.
    fn at(self, uri: &Uri) -> Result<T, ApiError>;
}

impl<T> AtPath<T> for Result<T, HelpdeskError> {
    fn at(self, uri: &Uri) -> Result<T, ApiError> {
        self.map_err(|error| ApiError::new(error, uri.path()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrors;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn validation_error_renders_field_map() {
        let error = HelpdeskError::Validation(ValidationErrors::single("title", "Title is required"));
        let response = ApiError::new(error, "/api/tickets").into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["status"], 400);
        assert_eq!(body["path"], "/api/tickets");
        assert_eq!(body["validationErrors"]["title"], "Title is required");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn transport_error_hides_cause() {
        let error = HelpdeskError::Transport("lock poisoned at store.rs".into());
        let response = ApiError::new(error, "/api/tickets").into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], crate::error::GENERIC_FAILURE);
        assert!(body.get("validationErrors").is_none());
    }

    #[test]
    fn at_keeps_only_the_path() {
        let uri: Uri = "/api/tickets/abc?page=2".parse().unwrap();
        let err = Err::<(), _>(HelpdeskError::Conflict("taken".into()))
            .at(&uri)
            .unwrap_err();
        assert_eq!(err.to_string(), "taken (/api/tickets/abc)");
    }
}
