//! Domain types for the help desk.
//!
//! Identifiers, roles, the ticket status/priority enums and the three
//! entities: user accounts (behind every [`Principal`]), tickets and comments.
//! Ticket lifecycle fields are only writable through [`crate::lifecycle`] and
//! the desk reducer, so their invariants cannot be broken from outside the
//! crate.

use crate::identity::PasswordDigest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for a user account
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket
///
/// Ordered so that listings can break `created_at` ties deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `TicketId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short display number (first 8 hex digits, upper case).
    #[must_use]
    pub fn ticket_number(&self) -> String {
        self.0.simple().to_string()[..8].to_uppercase()
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a comment
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(Uuid);

impl CommentId {
    /// Creates a new random `CommentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `CommentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Error returned when parsing a role, status or priority from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    /// What was being parsed ("role", "status", ...)
    pub kind: &'static str,
    /// The rejected input
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Role of an authenticated principal.
///
/// Roles are compared by set membership only (see [`crate::identity::has_role`]);
/// the declaration order carries no privilege meaning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Requester: opens tickets and comments on them
    #[serde(rename = "ROLE_USER")]
    User,
    /// Works tickets: may change status, priority and assignment
    #[serde(rename = "ROLE_TECHNICIAN")]
    Technician,
    /// Triage lead: technician rights plus the admin panel
    #[serde(rename = "ROLE_MANAGER")]
    Manager,
    /// Full rights, including deleting any ticket and changing roles
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// Every role
    pub const ALL: [Self; 4] = [Self::User, Self::Technician, Self::Manager, Self::Admin];

    /// Wire name (`ROLE_USER`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "ROLE_USER",
            Self::Technician => "ROLE_TECHNICIAN",
            Self::Manager => "ROLE_MANAGER",
            Self::Admin => "ROLE_ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    /// Accepts both `ROLE_ADMIN` and `ADMIN`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("ROLE_").unwrap_or(upper.as_str());
        match bare {
            "USER" => Ok(Self::User),
            "TECHNICIAN" => Ok(Self::Technician),
            "MANAGER" => Ok(Self::Manager),
            "ADMIN" => Ok(Self::Admin),
            _ => Err(ParseEnumError::new("role", s)),
        }
    }
}

/// Lifecycle status of a ticket
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    /// Newly opened, not yet picked up
    Open,
    /// Being worked on
    InProgress,
    /// Fixed, awaiting closure
    Resolved,
    /// Done
    Closed,
}

impl TicketStatus {
    /// Every status, in lifecycle order
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    /// Whether a ticket in this status carries a `resolved_at` timestamp.
    #[must_use]
    pub const fn is_resolution(self) -> bool {
        matches!(self, Self::Resolved | Self::Closed)
    }

    /// Wire name (`IN_PROGRESS`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::InProgress => "IN_PROGRESS",
            Self::Resolved => "RESOLVED",
            Self::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(Self::Open),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "RESOLVED" => Ok(Self::Resolved),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(ParseEnumError::new("status", s)),
        }
    }
}

/// Severity of a ticket. Ordered from least to most urgent.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketPriority {
    /// Can wait
    Low,
    /// Normal
    #[default]
    Medium,
    /// Needs attention soon
    High,
    /// Drop everything
    Critical,
}

impl TicketPriority {
    /// Every priority, least urgent first
    pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Wire name (`HIGH`, ...)
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            "CRITICAL" => Ok(Self::Critical),
            _ => Err(ParseEnumError::new("priority", s)),
        }
    }
}

// ============================================================================
// Principals and accounts
// ============================================================================

/// An authenticated caller, as loaded into a session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Account id
    pub id: UserId,
    /// Login name at the time the session was opened
    pub username: String,
    /// Role at the time the session was opened
    pub role: Role,
}

impl Principal {
    /// Creates a principal
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            role,
        }
    }
}

/// Stored user account. Tickets and comments refer to it by [`UserId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAccount {
    /// Account id
    pub id: UserId,
    /// Unique login name
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Salted password digest
    pub password: PasswordDigest,
    /// Current role
    pub role: Role,
    /// Disabled accounts cannot log in
    pub enabled: bool,
    /// Registration time
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Snapshot of this account as a session principal.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal::new(self.id, self.username.clone(), self.role)
    }
}

// ============================================================================
// Tickets
// ============================================================================

/// Fields a requester supplies when opening a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDraft {
    /// Short summary (1..=200 characters)
    pub title: String,
    /// Details (up to 2000 characters)
    #[serde(default)]
    pub description: String,
    /// Requested priority
    #[serde(default)]
    pub priority: TicketPriority,
}

impl TicketDraft {
    /// Creates a draft
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: TicketPriority,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
        }
    }
}

/// A support ticket.
///
/// Invariants kept by this crate:
/// - `resolved_at` is set iff `status` is `RESOLVED` or `CLOSED`
/// - `created_by` never changes
/// - `comment_count` equals the number of comments attached
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ticket {
    pub(crate) id: TicketId,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) status: TicketStatus,
    pub(crate) priority: TicketPriority,
    pub(crate) created_by: UserId,
    pub(crate) assigned_to: Option<UserId>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    pub(crate) resolved_at: Option<DateTime<Utc>>,
    pub(crate) comment_count: usize,
}

impl Ticket {
    /// Opens a new ticket in status `OPEN`.
    #[must_use]
    pub fn open(id: TicketId, draft: TicketDraft, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            status: TicketStatus::Open,
            priority: draft.priority,
            created_by,
            assigned_to: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            comment_count: 0,
        }
    }

    /// Ticket id
    #[must_use]
    pub const fn id(&self) -> TicketId {
        self.id
    }

    /// Summary line
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Details
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Current status
    #[must_use]
    pub const fn status(&self) -> TicketStatus {
        self.status
    }

    /// Current priority
    #[must_use]
    pub const fn priority(&self) -> TicketPriority {
        self.priority
    }

    /// Account that opened the ticket
    #[must_use]
    pub const fn created_by(&self) -> UserId {
        self.created_by
    }

    /// Account the ticket is assigned to, if any
    #[must_use]
    pub const fn assigned_to(&self) -> Option<UserId> {
        self.assigned_to
    }

    /// Creation time
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the last successful mutation
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Time the ticket entered `RESOLVED`/`CLOSED`
    #[must_use]
    pub const fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    /// Number of comments attached
    #[must_use]
    pub const fn comment_count(&self) -> usize {
        self.comment_count
    }
}

// ============================================================================
// Comments
// ============================================================================

/// A comment on a ticket. Append-only: never edited after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    /// Comment id
    pub id: CommentId,
    /// Ticket this comment belongs to
    pub ticket_id: TicketId,
    /// Body (1..=1000 characters)
    pub content: String,
    /// Account that wrote it
    pub author: UserId,
    /// Creation time
    pub created_at: DateTime<Utc>,
}
