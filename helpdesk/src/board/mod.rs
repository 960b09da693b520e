//! The board: the client-side view-model of the help desk.
//!
//! A reducer over what one signed-in user sees: the current ticket list, an
//! open ticket with its comments, form errors and a notice line. Every
//! backend call is an effect whose result comes back as an action.
//!
//! Two rules keep what is shown consistent with the backend:
//!
//! - each load carries a [`Generation`] per resource; a response whose
//!   generation is no longer the latest for that resource is discarded
//! - every successful mutation refetches the resources it affects

pub mod backend;
pub mod reducer;

pub use backend::Backend;
pub use reducer::{BoardEnvironment, BoardReducer};

use crate::desk::{CommentView, TicketView};
use crate::error::HelpdeskError;
use crate::identity::{Session, SessionToken};
use crate::lifecycle::TicketPatch;
use crate::policy::{self, Action, Owned};
use crate::query::{Page, TicketQuery};
use crate::types::{CommentId, TicketDraft, TicketId};
use crate::validation::ValidationErrors;

/// Request generation for one resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    /// The generation after this one
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Latest issued generation per resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Generations {
    /// Ticket list
    pub list: Generation,
    /// Open ticket
    pub ticket: Generation,
    /// Open ticket's comments
    pub comments: Generation,
}

/// The ticket currently open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Detail {
    /// Which ticket
    pub id: TicketId,
    /// Loaded ticket, once it arrives
    pub ticket: Option<TicketView>,
    /// Loaded comments, newest first
    pub comments: Vec<CommentView>,
    /// The backend reported the ticket missing
    pub not_found: bool,
}

impl Detail {
    fn new(id: TicketId) -> Self {
        Self {
            id,
            ticket: None,
            comments: Vec::new(),
            not_found: false,
        }
    }
}

/// What the notice line shows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// The session is gone; sign in again
    SignInRequired,
    /// The policy refused an action
    PermissionDenied(String),
    /// A referenced ticket or comment does not exist
    NotFound(String),
    /// Anything else
    Failed {
        /// What to show
        message: String,
        /// Whether offering "try again" makes sense
        retryable: bool,
    },
}

/// Board state
#[derive(Clone, Debug, Default)]
pub struct BoardState {
    /// Signed-in session, if any
    pub session: Option<Session>,
    /// Current list query
    pub query: TicketQuery,
    /// Current list page
    pub list: Option<Page<TicketView>>,
    /// A list load is in flight
    pub loading_list: bool,
    /// Open ticket
    pub detail: Option<Detail>,
    /// Latest generations issued
    pub generations: Generations,
    /// Field errors of the last submitted form
    pub form_errors: Option<ValidationErrors>,
    /// Notice line
    pub notice: Option<Notice>,
}

impl BoardState {
    /// Signed-out board
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token of the signed-in session
    #[must_use]
    pub fn token(&self) -> Option<SessionToken> {
        self.session.as_ref().map(|s| s.token.clone())
    }

    /// A ticket the board already holds, from the open detail or the list.
    #[must_use]
    pub fn known_ticket(&self, id: TicketId) -> Option<&TicketView> {
        self.detail
            .as_ref()
            .and_then(|d| d.ticket.as_ref())
            .filter(|t| t.id == id)
            .or_else(|| {
                self.list
                    .as_ref()
                    .and_then(|page| page.content.iter().find(|t| t.id == id))
            })
    }

    /// Actions to offer for ticket `id` (or for no ticket).
    #[must_use]
    pub fn capabilities(&self, id: Option<TicketId>) -> Vec<Action> {
        let principal = self.session.as_ref().map(|s| &s.principal);
        let ticket = id.and_then(|id| self.known_ticket(id));
        policy::capabilities(principal, ticket.map(|t| t as &dyn Owned))
    }

    /// Route an error to the form or the notice line.
    fn record_error(&mut self, error: &HelpdeskError) {
        match error {
            HelpdeskError::Validation(errors) => {
                self.form_errors = Some(errors.clone());
            },
            HelpdeskError::Unauthenticated(_) => {
                self.session = None;
                self.notice = Some(Notice::SignInRequired);
            },
            HelpdeskError::AuthorizationDenied { .. } => {
                self.notice = Some(Notice::PermissionDenied(error.user_message()));
            },
            HelpdeskError::NotFound { .. } => {
                self.notice = Some(Notice::NotFound(error.user_message()));
            },
            HelpdeskError::Conflict(_) | HelpdeskError::Transport(_) => {
                self.notice = Some(Notice::Failed {
                    message: error.user_message(),
                    retryable: error.is_retryable(),
                });
            },
        }
    }
}

/// Board actions
#[derive(Clone, Debug)]
pub enum BoardAction {
    // ========== Session ==========
    /// A session was obtained (login or registration)
    SignedIn {
        /// The session
        session: Session,
    },
    /// Sign out locally
    SignedOut,

    // ========== Loads ==========
    /// Replace the list query and load its first page
    Search {
        /// New query
        query: TicketQuery,
    },
    /// Load another page of the current query
    GoToPage {
        /// Zero-based page index
        page: usize,
    },
    /// Reload everything on screen
    Refresh,
    /// List response
    ListLoaded {
        /// Generation the request was issued with
        generation: Generation,
        /// Outcome
        result: Result<Page<TicketView>, HelpdeskError>,
    },
    /// Open a ticket
    OpenTicket {
        /// Which
        id: TicketId,
    },
    /// Close the open ticket
    CloseTicket,
    /// Ticket response
    TicketLoaded {
        /// Generation the request was issued with
        generation: Generation,
        /// Outcome
        result: Result<TicketView, HelpdeskError>,
    },
    /// Comments response
    CommentsLoaded {
        /// Generation the request was issued with
        generation: Generation,
        /// Outcome
        result: Result<Vec<CommentView>, HelpdeskError>,
    },

    // ========== Mutations ==========
    /// Submit the new-ticket form
    SubmitTicket {
        /// Form contents
        draft: TicketDraft,
    },
    /// Submit an edit
    UpdateTicket {
        /// Target
        id: TicketId,
        /// Changes
        patch: TicketPatch,
    },
    /// Delete a ticket
    DeleteTicket {
        /// Target
        id: TicketId,
    },
    /// Post a comment
    PostComment {
        /// Target ticket
        ticket_id: TicketId,
        /// Body
        content: String,
    },
    /// Remove a comment
    RemoveComment {
        /// Ticket it belongs to
        ticket_id: TicketId,
        /// Target
        comment_id: CommentId,
    },

    // ========== Mutation results ==========
    /// Create or update finished
    TicketSaved {
        /// Outcome
        result: Result<TicketView, HelpdeskError>,
    },
    /// Delete finished
    TicketRemoved {
        /// Target
        id: TicketId,
        /// Outcome
        result: Result<(), HelpdeskError>,
    },
    /// Comment post finished
    CommentSaved {
        /// Ticket commented on
        ticket_id: TicketId,
        /// Outcome
        result: Result<CommentView, HelpdeskError>,
    },
    /// Comment removal finished
    CommentRemoved {
        /// Ticket it belonged to
        ticket_id: TicketId,
        /// Outcome
        result: Result<(), HelpdeskError>,
    },

    /// Clear the notice line
    DismissNotice,
}
