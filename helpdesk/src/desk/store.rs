//! Store for the desk.
//!
//! Wraps [`DeskState`] in a `tokio` `RwLock`: commands take the write lock for
//! the whole reduce, reads take the read lock. A mutation that has returned
//! is therefore visible to every later read.

use super::{AuthResponse, CommentView, DeskAction, DeskEnvironment, DeskReducer, DeskState};
use super::{TicketView, UserView};
use crate::error::{HelpdeskError, Result};
use crate::identity::{PasswordDigest, Session, SessionToken};
use crate::lifecycle::TicketPatch;
use crate::policy::{self, Action};
use crate::query::{Page, PageRequest, TicketFilter, TicketQuery};
use crate::types::{CommentId, Principal, Role, TicketDraft, TicketId, UserId};
use crate::validation::{validate_login, validate_registration, Credentials, Registration};
use chrono::{DateTime, Utc};
use helpdesk_core::{environment::Clock, reducer::Reducer};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store for the desk.
pub struct DeskStore {
    state: Arc<RwLock<DeskState>>,
    reducer: DeskReducer,
    env: DeskEnvironment,
}

fn unexpected(event: &DeskAction) -> HelpdeskError {
    HelpdeskError::Transport(format!("unexpected outcome {}", event.name()))
}

impl DeskStore {
    /// Create an empty store.
    #[must_use]
    pub fn new(env: DeskEnvironment) -> Self {
        Self {
            state: Arc::new(RwLock::new(DeskState::new())),
            reducer: DeskReducer::new(),
            env,
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.env.clock.now()
    }

    /// Reduce `action` and project the event it produced.
    async fn dispatch<T>(
        &self,
        action: DeskAction,
        project: impl FnOnce(&DeskState, &DeskAction) -> Result<T>,
    ) -> Result<T> {
        let mut state = self.state.write().await;
        let _effects = self.reducer.reduce(&mut state, action, &self.env);
        match state.last_outcome.take() {
            Some(Ok(event)) => project(&state, &event),
            Some(Err(error)) => Err(error),
            None => Err(HelpdeskError::Transport("command produced no outcome".into())),
        }
    }

    /// Run a read against the current state as `token`'s principal.
    async fn read<T>(
        &self,
        token: &SessionToken,
        action: Action,
        view: impl FnOnce(&DeskState, &Principal) -> Result<T>,
    ) -> Result<T> {
        let state = self.state.read().await;
        let principal = state.principal(token, self.now());
        policy::authorize(principal, None, action).ensure(action)?;
        match principal {
            Some(principal) => view(&state, principal),
            None => Err(HelpdeskError::Unauthenticated("authentication required".into())),
        }
    }

    /// Get a snapshot of the current state.
    pub async fn state(&self) -> DeskState {
        self.state.read().await.clone()
    }

    // ========== Accounts and sessions ==========

    /// Create an account with `role` without signing it in.
    ///
    /// # Errors
    ///
    /// `Validation` for a malformed form, `Conflict` for a taken username or email.
    pub async fn create_account(&self, registration: Registration, role: Role) -> Result<UserView> {
        validate_registration(&registration, None)?;
        let digest = PasswordDigest::generate(&registration.password);
        let action = DeskAction::RegisterUser {
            id: UserId::new(),
            username: registration.username,
            email: registration.email,
            password: digest,
            role,
        };
        let view = self
            .dispatch(action, |_, event| match event {
                DeskAction::UserRegistered { account } => Ok(UserView::from(account)),
                other => Err(unexpected(other)),
            })
            .await?;
        tracing::info!(user_id = %view.id, username = %view.username, role = %view.role, "Account created");
        Ok(view)
    }

    /// Register a `USER` account and sign it in.
    ///
    /// # Errors
    ///
    /// As [`DeskStore::create_account`].
    pub async fn register(&self, registration: Registration) -> Result<AuthResponse> {
        let credentials = Credentials {
            username: registration.username.clone(),
            password: registration.password.clone(),
        };
        self.create_account(registration, Role::User).await?;
        self.login(credentials).await
    }

    /// Sign in.
    ///
    /// # Errors
    ///
    /// `Validation` for empty fields, `Unauthenticated` for wrong credentials.
    pub async fn login(&self, credentials: Credentials) -> Result<AuthResponse> {
        validate_login(&credentials)?;
        let action = DeskAction::OpenSession {
            token: SessionToken::generate(),
            username: credentials.username,
            password: credentials.password,
        };
        let response = self
            .dispatch(action, |state, event| match event {
                DeskAction::SessionOpened { session } => Ok(AuthResponse::bearer(
                    session.token.clone(),
                    state.user_view(session.principal.id),
                )),
                other => Err(unexpected(other)),
            })
            .await?;
        tracing::info!(user_id = %response.user.id, "Session opened");
        Ok(response)
    }

    /// Sign out. Unknown tokens are accepted.
    ///
    /// # Errors
    ///
    /// Never fails in practice; the signature matches the other commands.
    pub async fn logout(&self, token: &SessionToken) -> Result<()> {
        self.dispatch(
            DeskAction::CloseSession {
                token: token.clone(),
            },
            |_, _| Ok(()),
        )
        .await
    }

    /// The active session behind `token`.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when the token is unknown or expired.
    pub async fn session(&self, token: &SessionToken) -> Result<Session> {
        self.state
            .read()
            .await
            .session(token, self.now())
            .cloned()
            .ok_or_else(|| HelpdeskError::Unauthenticated("Session is missing or expired".into()))
    }

    /// Every account. Requires the admin panel.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` or `AuthorizationDenied`.
    pub async fn users(&self, token: &SessionToken) -> Result<Vec<UserView>> {
        self.read(token, Action::AdminPanel, |state, _| Ok(state.user_views()))
            .await
    }

    /// Change an account's role. ADMIN only.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `AuthorizationDenied`, or `NotFound` for the account.
    pub async fn change_role(
        &self,
        token: &SessionToken,
        user_id: UserId,
        role: Role,
    ) -> Result<UserView> {
        let action = DeskAction::ChangeRole {
            token: token.clone(),
            user_id,
            role,
        };
        let view = self
            .dispatch(action, |state, event| match event {
                DeskAction::RoleChanged { user_id, .. } => Ok(state.user_view(*user_id)),
                other => Err(unexpected(other)),
            })
            .await?;
        tracing::info!(user_id = %user_id, role = %role, "Role changed");
        Ok(view)
    }

    /// One account. Requires the admin panel.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `AuthorizationDenied`, or `NotFound` for the account.
    pub async fn user(&self, token: &SessionToken, user_id: UserId) -> Result<UserView> {
        self.read(token, Action::AdminPanel, |state, _| {
            state
                .user(user_id)
                .map(UserView::from)
                .ok_or_else(|| HelpdeskError::not_found("User", user_id))
        })
        .await
    }

    /// Flip whether an account may log in; disabling ends its sessions. ADMIN only.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `AuthorizationDenied`, or `NotFound` for the account.
    pub async fn toggle_user(&self, token: &SessionToken, user_id: UserId) -> Result<bool> {
        let action = DeskAction::ToggleUser {
            token: token.clone(),
            user_id,
        };
        let enabled = self
            .dispatch(action, |_, event| match event {
                DeskAction::UserEnabledChanged { enabled, .. } => Ok(*enabled),
                other => Err(unexpected(other)),
            })
            .await?;
        tracing::info!(user_id = %user_id, enabled, "Account toggled");
        Ok(enabled)
    }

    /// Remove an account and end its sessions. ADMIN only.
    ///
    /// Tickets and comments it wrote stay and show the unknown-user placeholder.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `AuthorizationDenied`, or `NotFound` for the account.
    pub async fn delete_user(&self, token: &SessionToken, user_id: UserId) -> Result<()> {
        let action = DeskAction::DeleteUser {
            token: token.clone(),
            user_id,
        };
        self.dispatch(action, |_, event| match event {
            DeskAction::UserDeleted { .. } => Ok(()),
            other => Err(unexpected(other)),
        })
        .await?;
        tracing::info!(user_id = %user_id, "Account deleted");
        Ok(())
    }

    // ========== Tickets ==========

    /// Filtered, ordered, paged ticket listing.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an active session.
    pub async fn list_tickets(
        &self,
        token: &SessionToken,
        query: &TicketQuery,
    ) -> Result<Page<TicketView>> {
        self.read(token, Action::View, |state, _| {
            Ok(query
                .run(state.tickets.values())
                .map(|ticket| state.ticket_view(&ticket)))
        })
        .await
    }

    /// Text search over every ticket, then paginate.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` without an active session.
    pub async fn search_tickets(
        &self,
        token: &SessionToken,
        text: &str,
        page: PageRequest,
    ) -> Result<Page<TicketView>> {
        let query = TicketQuery {
            filter: TicketFilter::text(text),
            page,
            ..TicketQuery::default()
        };
        self.list_tickets(token, &query).await
    }

    /// One ticket.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, or `NotFound`.
    pub async fn ticket(&self, token: &SessionToken, id: TicketId) -> Result<TicketView> {
        self.read(token, Action::View, |state, _| {
            state.require_ticket(id).map(|t| state.ticket_view(t))
        })
        .await
    }

    /// Open a ticket as `token`'s principal.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` or `Validation`.
    pub async fn create_ticket(&self, token: &SessionToken, draft: TicketDraft) -> Result<TicketView> {
        let action = DeskAction::CreateTicket {
            token: token.clone(),
            id: TicketId::new(),
            draft,
        };
        let view = self
            .dispatch(action, |state, event| match event {
                DeskAction::TicketCreated { ticket } => Ok(state.ticket_view(ticket)),
                other => Err(unexpected(other)),
            })
            .await?;
        tracing::info!(ticket_id = %view.id, priority = %view.priority, "Ticket created");
        Ok(view)
    }

    /// Partially update a ticket.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `Validation`, `NotFound` or `AuthorizationDenied`.
    pub async fn update_ticket(
        &self,
        token: &SessionToken,
        id: TicketId,
        patch: TicketPatch,
    ) -> Result<TicketView> {
        let action = DeskAction::UpdateTicket {
            token: token.clone(),
            id,
            patch,
        };
        let view = self
            .dispatch(action, |state, event| match event {
                DeskAction::TicketUpdated { ticket } => state
                    .require_ticket(ticket.id())
                    .map(|t| state.ticket_view(t)),
                other => Err(unexpected(other)),
            })
            .await?;
        tracing::info!(ticket_id = %id, status = %view.status, priority = %view.priority, "Ticket updated");
        Ok(view)
    }

    /// Delete a ticket and its comments.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `NotFound` or `AuthorizationDenied`.
    pub async fn delete_ticket(&self, token: &SessionToken, id: TicketId) -> Result<()> {
        let action = DeskAction::DeleteTicket {
            token: token.clone(),
            id,
        };
        self.dispatch(action, |_, _| Ok(())).await?;
        tracing::info!(ticket_id = %id, "Ticket deleted");
        Ok(())
    }

    // ========== Comments ==========

    /// Comments on a ticket, newest first.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, or `NotFound` for the ticket.
    pub async fn comments(&self, token: &SessionToken, ticket_id: TicketId) -> Result<Vec<CommentView>> {
        self.read(token, Action::View, |state, _| {
            state.require_ticket(ticket_id)?;
            Ok(state.comment_views(ticket_id))
        })
        .await
    }

    /// Comment on a ticket.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `Validation` or `NotFound`.
    pub async fn add_comment(
        &self,
        token: &SessionToken,
        ticket_id: TicketId,
        content: String,
    ) -> Result<CommentView> {
        let action = DeskAction::AddComment {
            token: token.clone(),
            id: CommentId::new(),
            ticket_id,
            content,
        };
        let view = self
            .dispatch(action, |state, event| match event {
                DeskAction::CommentAdded { comment } => Ok(state.comment_view(comment)),
                other => Err(unexpected(other)),
            })
            .await?;
        tracing::info!(ticket_id = %ticket_id, comment_id = %view.id, "Comment added");
        Ok(view)
    }

    /// Remove a comment.
    ///
    /// # Errors
    ///
    /// `Unauthenticated`, `NotFound` or `AuthorizationDenied`.
    pub async fn delete_comment(
        &self,
        token: &SessionToken,
        ticket_id: TicketId,
        comment_id: CommentId,
    ) -> Result<()> {
        let action = DeskAction::DeleteComment {
            token: token.clone(),
            ticket_id,
            comment_id,
        };
        self.dispatch(action, |_, _| Ok(())).await?;
        tracing::info!(ticket_id = %ticket_id, comment_id = %comment_id, "Comment deleted");
        Ok(())
    }
}
