//! Desk commands and events.

use crate::error::HelpdeskError;
use crate::identity::{Password, PasswordDigest, Session, SessionToken};
use crate::lifecycle::TicketPatch;
use crate::types::{
    Comment, CommentId, Role, Ticket, TicketDraft, TicketId, UserAccount, UserId,
};

/// Everything the desk reducer accepts.
///
/// Commands carry the caller's bearer token; the reducer resolves it to a
/// principal itself. Events are what the reducer applies to state, and can
/// also be replayed directly.
#[derive(Clone, Debug)]
pub enum DeskAction {
    // ========== Commands ==========
    /// Create an account. The password has already been validated and digested.
    RegisterUser {
        /// Id for the new account
        id: UserId,
        /// Login name
        username: String,
        /// Contact address
        email: String,
        /// Salted digest of the chosen password
        password: PasswordDigest,
        /// Initial role
        role: Role,
    },
    /// Log in
    OpenSession {
        /// Token to issue on success
        token: SessionToken,
        /// Login name
        username: String,
        /// Candidate password
        password: Password,
    },
    /// Log out
    CloseSession {
        /// Session to end
        token: SessionToken,
    },
    /// Open a ticket
    CreateTicket {
        /// Caller
        token: SessionToken,
        /// Id for the new ticket
        id: TicketId,
        /// Submitted fields
        draft: TicketDraft,
    },
    /// Partially update a ticket
    UpdateTicket {
        /// Caller
        token: SessionToken,
        /// Target
        id: TicketId,
        /// Fields to change
        patch: TicketPatch,
    },
    /// Remove a ticket and its comments
    DeleteTicket {
        /// Caller
        token: SessionToken,
        /// Target
        id: TicketId,
    },
    /// Comment on a ticket
    AddComment {
        /// Caller
        token: SessionToken,
        /// Id for the new comment
        id: CommentId,
        /// Target ticket
        ticket_id: TicketId,
        /// Body
        content: String,
    },
    /// Remove a comment
    DeleteComment {
        /// Caller
        token: SessionToken,
        /// Ticket the comment belongs to
        ticket_id: TicketId,
        /// Target comment
        comment_id: CommentId,
    },
    /// Change an account's role
    ChangeRole {
        /// Caller
        token: SessionToken,
        /// Target account
        user_id: UserId,
        /// New role
        role: Role,
    },
    /// Flip whether an account may log in
    ToggleUser {
        /// Caller
        token: SessionToken,
        /// Target account
        user_id: UserId,
    },
    /// Remove an account
    DeleteUser {
        /// Caller
        token: SessionToken,
        /// Target account
        user_id: UserId,
    },

    // ========== Events ==========
    /// An account was created
    UserRegistered {
        /// The new account
        account: UserAccount,
    },
    /// A session was opened
    SessionOpened {
        /// The new session
        session: Session,
    },
    /// A session ended
    SessionClosed {
        /// Its token
        token: SessionToken,
    },
    /// A ticket was opened
    TicketCreated {
        /// The new ticket
        ticket: Ticket,
    },
    /// A ticket changed
    TicketUpdated {
        /// Ticket after the change
        ticket: Ticket,
    },
    /// A ticket and its comments were removed
    TicketDeleted {
        /// Removed ticket
        id: TicketId,
    },
    /// A comment was posted
    CommentAdded {
        /// The new comment
        comment: Comment,
    },
    /// A comment was removed
    CommentDeleted {
        /// Ticket it belonged to
        ticket_id: TicketId,
        /// Removed comment
        comment_id: CommentId,
    },
    /// An account's role changed
    RoleChanged {
        /// Target account
        user_id: UserId,
        /// New role
        role: Role,
    },
    /// An account was enabled or disabled; disabling ends its sessions
    UserEnabledChanged {
        /// Target account
        user_id: UserId,
        /// Whether it may log in now
        enabled: bool,
    },
    /// An account and its sessions were removed
    UserDeleted {
        /// Removed account
        user_id: UserId,
    },
    /// A command was refused
    CommandRejected {
        /// Why
        error: HelpdeskError,
    },
}

impl DeskAction {
    /// Whether this is an event (as opposed to a command).
    #[must_use]
    pub const fn is_event(&self) -> bool {
        matches!(
            self,
            Self::UserRegistered { .. }
                | Self::SessionOpened { .. }
                | Self::SessionClosed { .. }
                | Self::TicketCreated { .. }
                | Self::TicketUpdated { .. }
                | Self::TicketDeleted { .. }
                | Self::CommentAdded { .. }
                | Self::CommentDeleted { .. }
                | Self::RoleChanged { .. }
                | Self::UserEnabledChanged { .. }
                | Self::UserDeleted { .. }
                | Self::CommandRejected { .. }
        )
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RegisterUser { .. } => "RegisterUser",
            Self::OpenSession { .. } => "OpenSession",
            Self::CloseSession { .. } => "CloseSession",
            Self::CreateTicket { .. } => "CreateTicket",
            Self::UpdateTicket { .. } => "UpdateTicket",
            Self::DeleteTicket { .. } => "DeleteTicket",
            Self::AddComment { .. } => "AddComment",
            Self::DeleteComment { .. } => "DeleteComment",
            Self::ChangeRole { .. } => "ChangeRole",
            Self::ToggleUser { .. } => "ToggleUser",
            Self::DeleteUser { .. } => "DeleteUser",
            Self::UserRegistered { .. } => "UserRegistered",
            Self::SessionOpened { .. } => "SessionOpened",
            Self::SessionClosed { .. } => "SessionClosed",
            Self::TicketCreated { .. } => "TicketCreated",
            Self::TicketUpdated { .. } => "TicketUpdated",
            Self::TicketDeleted { .. } => "TicketDeleted",
            Self::CommentAdded { .. } => "CommentAdded",
            Self::CommentDeleted { .. } => "CommentDeleted",
            Self::RoleChanged { .. } => "RoleChanged",
            Self::UserEnabledChanged { .. } => "UserEnabledChanged",
            Self::UserDeleted { .. } => "UserDeleted",
            Self::CommandRejected { .. } => "CommandRejected",
        }
    }
}
