//! The desk: the authoritative help-desk backend.
//!
//! Commands arrive as [`DeskAction`]s, are checked by the [`DeskReducer`]
//! (authentication, validation, existence, policy) and become events that
//! update [`DeskState`]. [`DeskStore`] serialises access and projects results
//! into the response views defined here.

pub mod actions;
pub mod reducer;
pub mod state;
pub mod store;

pub use actions::DeskAction;
pub use reducer::{DeskEnvironment, DeskReducer};
pub use state::DeskState;
pub use store::DeskStore;

use crate::identity::SessionToken;
use crate::policy::Owned;
use crate::types::{
    CommentId, Role, TicketId, TicketPriority, TicketStatus, UserAccount, UserId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Public view of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    /// Account id
    pub id: UserId,
    /// Login name
    pub username: String,
    /// Contact address
    pub email: String,
    /// Current role
    pub role: Role,
    /// Whether the account may log in
    pub enabled: bool,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl From<&UserAccount> for UserView {
    fn from(account: &UserAccount) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            role: account.role,
            enabled: account.enabled,
            created_at: account.created_at,
        }
    }
}

/// A ticket with its account references resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    /// Ticket id
    pub id: TicketId,
    /// Short reference shown to users
    pub ticket_number: String,
    /// Summary
    pub title: String,
    /// Details
    pub description: String,
    /// Lifecycle status
    pub status: TicketStatus,
    /// Urgency
    pub priority: TicketPriority,
    /// Requester
    pub created_by: UserView,
    /// Assignee
    pub assigned_to: Option<UserView>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
    /// Resolution time
    pub resolved_at: Option<DateTime<Utc>>,
    /// Number of comments
    pub comment_count: usize,
}

impl Owned for TicketView {
    fn owner(&self) -> UserId {
        self.created_by.id
    }
}

/// A comment with its author resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    /// Comment id
    pub id: CommentId,
    /// Ticket it belongs to
    pub ticket_id: TicketId,
    /// Body
    pub content: String,
    /// Writer
    pub author: UserView,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Body returned by register and login.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Bearer token for subsequent requests
    pub token: SessionToken,
    /// Always `Bearer`
    #[serde(rename = "type")]
    pub token_type: String,
    /// The signed-in account
    pub user: UserView,
}

impl AuthResponse {
    /// Bearer response for `user`
    #[must_use]
    pub fn bearer(token: SessionToken, user: UserView) -> Self {
        Self {
            token,
            token_type: "Bearer".to_string(),
            user,
        }
    }
}
