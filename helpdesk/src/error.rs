//! Error types for the help desk.
//!
//! [`HelpdeskError`] is the one error every layer speaks. The HTTP layer turns
//! it into an [`ErrorEnvelope`]; the board turns it into a user-facing notice.

use crate::policy::{Action, DenyReason};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors produced by help-desk operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelpdeskError {
    /// One or more fields failed validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// Missing, unknown or expired credentials
    #[error("{0}")]
    Unauthenticated(String),

    /// The policy refused the action
    #[error("{action} not permitted: {reason}")]
    AuthorizationDenied {
        /// What was attempted
        action: Action,
        /// Why it was refused
        reason: DenyReason,
    },

    /// The referenced entity does not exist
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// Kind of entity ("Ticket", "Comment", "User")
        resource: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Uniqueness violation (username, email)
    #[error("{0}")]
    Conflict(String),

    /// The backend could not be reached or failed unexpectedly
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for help-desk operations.
pub type Result<T> = std::result::Result<T, HelpdeskError>;

/// Message shown for transport failures instead of the raw cause.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

impl HelpdeskError {
    /// Not-found error for `resource` with `id`.
    #[must_use]
    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    /// Validation error with a single field.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }

    /// HTTP status code this error maps to.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthenticated(_) => 401,
            Self::AuthorizationDenied { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict(_) => 409,
            Self::Transport(_) => 500,
        }
    }

    /// Text safe to show an end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(_) => "Validation failed".to_string(),
            Self::AuthorizationDenied { .. } => {
                "You do not have permission to perform this action".to_string()
            },
            Self::Transport(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Field errors, for validation failures.
    #[must_use]
    pub const fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for HelpdeskError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Error body returned by the HTTP API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    /// HTTP status code
    pub status: u16,
    /// User-facing message
    pub message: String,
    /// When the error was produced
    pub timestamp: DateTime<Utc>,
    /// Request path
    pub path: String,
    /// Field errors, for validation failures only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<BTreeMap<String, String>>,
}

impl ErrorEnvelope {
    /// Build the envelope for `error` raised while serving `path`.
    #[must_use]
    pub fn from_error(error: &HelpdeskError, path: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            status: error.status_code(),
            message: error.user_message(),
            timestamp: now,
            path: path.into(),
            validation_errors: error.validation_errors().map(|e| e.fields().clone()),
        }
    }
}
