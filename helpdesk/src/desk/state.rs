//! Desk state and its read-side projections.

use super::{CommentView, DeskAction, TicketView, UserView};
use crate::error::HelpdeskError;
use crate::identity::{Session, SessionRegistry, SessionToken};
use crate::types::{Comment, Principal, Role, Ticket, TicketId, UserAccount, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Everything the desk knows.
#[derive(Clone, Debug, Default)]
pub struct DeskState {
    /// Accounts by id
    pub users: HashMap<UserId, UserAccount>,
    /// Open sessions
    pub sessions: SessionRegistry,
    /// Tickets by id
    pub tickets: HashMap<TicketId, Ticket>,
    /// Comments per ticket, oldest first
    pub comments: HashMap<TicketId, Vec<Comment>>,
    /// Outcome of the last command: the event it produced, or why it failed
    pub last_outcome: Option<Result<DeskAction, HelpdeskError>>,
}

impl DeskState {
    /// Empty desk
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Active session for `token` at `now`.
    #[must_use]
    pub fn session(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<&Session> {
        self.sessions.active(token, now)
    }

    /// Principal behind `token` at `now`, if the session is active.
    #[must_use]
    pub fn principal(&self, token: &SessionToken, now: DateTime<Utc>) -> Option<&Principal> {
        self.session(token, now).map(|s| &s.principal)
    }

    /// Account by id
    #[must_use]
    pub fn user(&self, id: UserId) -> Option<&UserAccount> {
        self.users.get(&id)
    }

    /// Account by login name (exact match)
    #[must_use]
    pub fn user_by_username(&self, username: &str) -> Option<&UserAccount> {
        self.users.values().find(|u| u.username == username)
    }

    /// Account by email (case-insensitive)
    #[must_use]
    pub fn user_by_email(&self, email: &str) -> Option<&UserAccount> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    /// Ticket by id
    #[must_use]
    pub fn ticket(&self, id: TicketId) -> Option<&Ticket> {
        self.tickets.get(&id)
    }

    /// Ticket by id, or `NotFound`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no such ticket exists.
    pub fn require_ticket(&self, id: TicketId) -> Result<&Ticket, HelpdeskError> {
        self.ticket(id)
            .ok_or_else(|| HelpdeskError::not_found("Ticket", id))
    }

    /// Comments on `ticket_id`, oldest first
    #[must_use]
    pub fn comments_on(&self, ticket_id: TicketId) -> &[Comment] {
        self.comments.get(&ticket_id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Number of tickets
    #[must_use]
    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// View of account `id`. Unknown ids resolve to a placeholder.
    #[must_use]
    pub fn user_view(&self, id: UserId) -> UserView {
        self.user(id).map_or_else(
            || UserView {
                id,
                username: "unknown".to_string(),
                email: String::new(),
                role: Role::User,
                enabled: false,
                created_at: DateTime::<Utc>::UNIX_EPOCH,
            },
            UserView::from,
        )
    }

    /// `ticket` with its account references resolved to current names.
    #[must_use]
    pub fn ticket_view(&self, ticket: &Ticket) -> TicketView {
        TicketView {
            id: ticket.id(),
            ticket_number: ticket.id().ticket_number(),
            title: ticket.title().to_string(),
            description: ticket.description().to_string(),
            status: ticket.status(),
            priority: ticket.priority(),
            created_by: self.user_view(ticket.created_by()),
            assigned_to: ticket.assigned_to().map(|id| self.user_view(id)),
            created_at: ticket.created_at(),
            updated_at: ticket.updated_at(),
            resolved_at: ticket.resolved_at(),
            comment_count: ticket.comment_count(),
        }
    }

    /// `comment` with its author resolved.
    #[must_use]
    pub fn comment_view(&self, comment: &Comment) -> CommentView {
        CommentView {
            id: comment.id,
            ticket_id: comment.ticket_id,
            content: comment.content.clone(),
            author: self.user_view(comment.author),
            created_at: comment.created_at,
        }
    }

    /// Comment views on `ticket_id`, newest first.
    #[must_use]
    pub fn comment_views(&self, ticket_id: TicketId) -> Vec<CommentView> {
        let mut comments: Vec<&Comment> = self.comments_on(ticket_id).iter().collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        comments.into_iter().map(|c| self.comment_view(c)).collect()
    }

    /// Every account, oldest registration first.
    #[must_use]
    pub fn user_views(&self) -> Vec<UserView> {
        let mut users: Vec<UserView> = self.users.values().map(UserView::from).collect();
        users.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.username.cmp(&b.username))
        });
        users
    }
}
