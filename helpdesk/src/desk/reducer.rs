//! Desk reducer: validate commands, produce events, apply events.
//!
//! Every command is checked in the same order:
//!
//! 1. the bearer token must resolve to an active session (401)
//! 2. the submitted fields must validate (400)
//! 3. referenced entities must exist (404)
//! 4. the policy must allow the action (403)
//!
//! Only then is an event produced and applied. A refused command leaves the
//! state untouched apart from `last_outcome`.

use super::{DeskAction, DeskState};
use crate::error::HelpdeskError;
use crate::identity::{Session, SessionToken};
use crate::lifecycle::apply_patch;
use crate::policy::{self, Action};
use crate::types::{Comment, Principal, Ticket, UserAccount, UserId};
use crate::validation::{validate_comment, validate_draft, validate_patch};
use helpdesk_core::{effect::Effect, environment::Clock, reducer::Reducer, SmallVec};
use std::sync::Arc;

/// Environment dependencies for the desk reducer
#[derive(Clone)]
pub struct DeskEnvironment {
    /// Clock for timestamps and session expiry
    pub clock: Arc<dyn Clock>,
    /// How long a session stays valid after login
    pub session_ttl: chrono::Duration,
}

impl DeskEnvironment {
    /// Default session lifetime: one day
    pub const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;

    /// Creates a new `DeskEnvironment` with the default session lifetime
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            session_ttl: chrono::Duration::seconds(Self::DEFAULT_SESSION_TTL_SECS),
        }
    }

    /// Override the session lifetime
    #[must_use]
    pub const fn with_session_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.session_ttl = ttl;
        self
    }
}

/// Reducer for the desk
#[derive(Clone, Debug, Default)]
pub struct DeskReducer;

impl DeskReducer {
    /// Creates a new `DeskReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn authenticate<'a>(
        state: &'a DeskState,
        token: &SessionToken,
        env: &DeskEnvironment,
    ) -> Result<&'a Principal, HelpdeskError> {
        state
            .principal(token, env.clock.now())
            .ok_or_else(|| HelpdeskError::Unauthenticated("Session is missing or expired".into()))
    }

    /// Account `user_id`, when the caller may manage accounts.
    fn managed_account<'a>(
        state: &'a DeskState,
        token: &SessionToken,
        user_id: UserId,
        env: &DeskEnvironment,
    ) -> Result<&'a UserAccount, HelpdeskError> {
        let principal = Self::authenticate(state, token, env)?;
        policy::authorize(Some(principal), None, Action::ManageUsers).ensure(Action::ManageUsers)?;
        state
            .user(user_id)
            .ok_or_else(|| HelpdeskError::not_found("User", user_id))
    }

    /// Turn a command into the event it produces, or the reason it cannot.
    #[allow(clippy::too_many_lines)]
    fn decide(
        state: &DeskState,
        command: DeskAction,
        env: &DeskEnvironment,
    ) -> Result<DeskAction, HelpdeskError> {
        let now = env.clock.now();
        match command {
            DeskAction::RegisterUser {
                id,
                username,
                email,
                password,
                role,
            } => {
                let username = username.trim().to_string();
                let email = email.trim().to_string();
                if state.user_by_username(&username).is_some() {
                    return Err(HelpdeskError::Conflict("Username is already taken".into()));
                }
                if state.user_by_email(&email).is_some() {
                    return Err(HelpdeskError::Conflict("Email is already in use".into()));
                }
                if state.user(id).is_some() {
                    return Err(HelpdeskError::Conflict(format!("User {id} already exists")));
                }
                Ok(DeskAction::UserRegistered {
                    account: UserAccount {
                        id,
                        username,
                        email,
                        password,
                        role,
                        enabled: true,
                        created_at: now,
                    },
                })
            },

            DeskAction::OpenSession {
                token,
                username,
                password,
            } => {
                let account = state
                    .user_by_username(username.trim())
                    .filter(|account| account.password.verify(&password))
                    .ok_or_else(|| {
                        HelpdeskError::Unauthenticated("Invalid username or password".into())
                    })?;
                if !account.enabled {
                    return Err(HelpdeskError::Unauthenticated("Account is disabled".into()));
                }
                let expires_at = now.checked_add_signed(env.session_ttl).ok_or_else(|| {
                    HelpdeskError::Transport("session lifetime is out of range".into())
                })?;
                Ok(DeskAction::SessionOpened {
                    session: Session {
                        token,
                        principal: account.principal(),
                        issued_at: now,
                        expires_at,
                    },
                })
            },

            DeskAction::CloseSession { token } => Ok(DeskAction::SessionClosed { token }),

            DeskAction::CreateTicket { token, id, draft } => {
                let principal = Self::authenticate(state, &token, env)?;
                validate_draft(&draft)?;
                policy::authorize(Some(principal), None, Action::Create).ensure(Action::Create)?;
                if state.ticket(id).is_some() {
                    return Err(HelpdeskError::Conflict(format!("Ticket {id} already exists")));
                }
                Ok(DeskAction::TicketCreated {
                    ticket: Ticket::open(id, draft, principal.id, now),
                })
            },

            DeskAction::UpdateTicket { token, id, patch } => {
                let principal = Self::authenticate(state, &token, env)?;
                validate_patch(&patch)?;
                let current = state.require_ticket(id)?;
                policy::authorize(Some(principal), Some(current), Action::Edit)
                    .ensure(Action::Edit)?;
                if let Some(assignee) = patch.assigned_to_id {
                    if state.user(assignee).is_none() {
                        return Err(HelpdeskError::not_found("User", assignee));
                    }
                }
                let mut ticket = current.clone();
                apply_patch(&mut ticket, &patch, now);
                Ok(DeskAction::TicketUpdated { ticket })
            },

            DeskAction::DeleteTicket { token, id } => {
                let principal = Self::authenticate(state, &token, env)?;
                let ticket = state.require_ticket(id)?;
                policy::authorize(Some(principal), Some(ticket), Action::Delete)
                    .ensure(Action::Delete)?;
                Ok(DeskAction::TicketDeleted { id })
            },

            DeskAction::AddComment {
                token,
                id,
                ticket_id,
                content,
            } => {
                let principal = Self::authenticate(state, &token, env)?;
                validate_comment(&content)?;
                let ticket = state.require_ticket(ticket_id)?;
                policy::authorize(Some(principal), Some(ticket), Action::Comment)
                    .ensure(Action::Comment)?;
                Ok(DeskAction::CommentAdded {
                    comment: Comment {
                        id,
                        ticket_id,
                        content,
                        author: principal.id,
                        created_at: now,
                    },
                })
            },

            DeskAction::DeleteComment {
                token,
                ticket_id,
                comment_id,
            } => {
                let principal = Self::authenticate(state, &token, env)?;
                state.require_ticket(ticket_id)?;
                let comment = state
                    .comments_on(ticket_id)
                    .iter()
                    .find(|c| c.id == comment_id)
                    .ok_or_else(|| HelpdeskError::not_found("Comment", comment_id))?;
                policy::can_delete_comment(Some(principal), comment.author)
                    .ensure(Action::Delete)?;
                Ok(DeskAction::CommentDeleted {
                    ticket_id,
                    comment_id,
                })
            },

            DeskAction::ChangeRole {
                token,
                user_id,
                role,
            } => {
                Self::managed_account(state, &token, user_id, env)?;
                Ok(DeskAction::RoleChanged { user_id, role })
            },

            DeskAction::ToggleUser { token, user_id } => {
                let account = Self::managed_account(state, &token, user_id, env)?;
                Ok(DeskAction::UserEnabledChanged {
                    user_id,
                    enabled: !account.enabled,
                })
            },

            DeskAction::DeleteUser { token, user_id } => {
                Self::managed_account(state, &token, user_id, env)?;
                Ok(DeskAction::UserDeleted { user_id })
            },

            event => Ok(event),
        }
    }

    /// Applies an event to state
    fn apply_event(state: &mut DeskState, event: &DeskAction) {
        match event {
            DeskAction::UserRegistered { account } => {
                state.users.insert(account.id, account.clone());
            },
            DeskAction::SessionOpened { session } => {
                state.sessions.purge_expired(session.issued_at);
                state.sessions.insert(session.clone());
            },
            DeskAction::SessionClosed { token } => {
                state.sessions.remove(token);
            },
            DeskAction::TicketCreated { ticket } => {
                state.tickets.insert(ticket.id(), ticket.clone());
            },
            DeskAction::TicketUpdated { ticket } => {
                if let Some(existing) = state.tickets.get_mut(&ticket.id()) {
                    let comment_count = existing.comment_count;
                    *existing = ticket.clone();
                    existing.comment_count = comment_count;
                }
            },
            DeskAction::TicketDeleted { id } => {
                state.tickets.remove(id);
                state.comments.remove(id);
            },
            DeskAction::CommentAdded { comment } => {
                let comments = state.comments.entry(comment.ticket_id).or_default();
                comments.push(comment.clone());
                let count = comments.len();
                if let Some(ticket) = state.tickets.get_mut(&comment.ticket_id) {
                    ticket.comment_count = count;
                }
            },
            DeskAction::CommentDeleted {
                ticket_id,
                comment_id,
            } => {
                let count = state.comments.get_mut(ticket_id).map_or(0, |comments| {
                    comments.retain(|c| c.id != *comment_id);
                    comments.len()
                });
                if let Some(ticket) = state.tickets.get_mut(ticket_id) {
                    ticket.comment_count = count;
                }
            },
            DeskAction::RoleChanged { user_id, role } => {
                if let Some(account) = state.users.get_mut(user_id) {
                    account.role = *role;
                }
            },
            DeskAction::UserEnabledChanged { user_id, enabled } => {
                if let Some(account) = state.users.get_mut(user_id) {
                    account.enabled = *enabled;
                }
                if !enabled {
                    state.sessions.revoke_account(*user_id);
                }
            },
            DeskAction::UserDeleted { user_id } => {
                state.users.remove(user_id);
                state.sessions.revoke_account(*user_id);
            },
            DeskAction::CommandRejected { .. }
            // Commands are not applied to state
            | DeskAction::RegisterUser { .. }
            | DeskAction::OpenSession { .. }
            | DeskAction::CloseSession { .. }
            | DeskAction::CreateTicket { .. }
            | DeskAction::UpdateTicket { .. }
            | DeskAction::DeleteTicket { .. }
            | DeskAction::AddComment { .. }
            | DeskAction::DeleteComment { .. }
            | DeskAction::ChangeRole { .. }
            | DeskAction::ToggleUser { .. }
            | DeskAction::DeleteUser { .. } => {},
        }
    }
}

impl Reducer for DeskReducer {
    type State = DeskState;
    type Action = DeskAction;
    type Environment = DeskEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        if let DeskAction::CommandRejected { error } = action {
            state.last_outcome = Some(Err(error));
            return SmallVec::new();
        }

        // Replayed events skip the checks.
        if action.is_event() {
            Self::apply_event(state, &action);
            state.last_outcome = Some(Ok(action));
            return SmallVec::new();
        }

        let command = action.name();
        match Self::decide(state, action, env) {
            Ok(event) => {
                Self::apply_event(state, &event);
                state.last_outcome = Some(Ok(event));
            },
            Err(error) => {
                tracing::debug!(command, %error, "Command rejected");
                state.last_outcome = Some(Err(error));
            },
        }

        SmallVec::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::identity::{Password, PasswordDigest};
    use crate::lifecycle::TicketPatch;
    use crate::policy::DenyReason;
    use crate::types::{
        CommentId, Role, TicketDraft, TicketId, TicketPriority, TicketStatus, UserId,
    };
    use helpdesk_testing::{assertions, test_clock, ReducerTest};

    fn env() -> DeskEnvironment {
        DeskEnvironment::new(Arc::new(test_clock()))
    }

    /// State with one signed-in account per role; returns the tokens.
    fn staffed() -> (DeskState, Vec<(Role, UserId, SessionToken)>) {
        let env = env();
        let reducer = DeskReducer::new();
        let mut state = DeskState::new();
        let mut people = Vec::new();
        for role in Role::ALL {
            let id = UserId::new();
            let name = role.as_str().to_ascii_lowercase();
            let _ = reducer.reduce(
                &mut state,
                DeskAction::RegisterUser {
                    id,
                    username: name.clone(),
                    email: format!("{name}@desk.test"),
                    password: PasswordDigest::with_salt(&Password::new("password1"), [7; 16]),
                    role,
                },
                &env,
            );
            let token = SessionToken::generate();
            let _ = reducer.reduce(
                &mut state,
                DeskAction::OpenSession {
                    token: token.clone(),
                    username: name,
                    password: Password::new("password1"),
                },
                &env,
            );
            people.push((role, id, token));
        }
        (state, people)
    }

    fn token_of(people: &[(Role, UserId, SessionToken)], role: Role) -> SessionToken {
        people.iter().find(|p| p.0 == role).map(|p| p.2.clone()).unwrap()
    }

    fn with_ticket(state: &mut DeskState, owner_token: &SessionToken) -> TicketId {
        let id = TicketId::new();
        let _ = DeskReducer::new().reduce(
            state,
            DeskAction::CreateTicket {
                token: owner_token.clone(),
                id,
                draft: TicketDraft::new("Monitor flickers", "", TicketPriority::Medium),
            },
            &env(),
        );
        id
    }

    fn rejection(state: &DeskState) -> Option<&HelpdeskError> {
        match &state.last_outcome {
            Some(Err(error)) => Some(error),
            _ => None,
        }
    }

    #[test]
    fn create_ticket_opens_with_defaults() {
        let (state, people) = staffed();
        let token = token_of(&people, Role::User);
        let id = TicketId::new();

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::CreateTicket {
                token,
                id,
                draft: TicketDraft::new("Printer", "", TicketPriority::default()),
            })
            .then_state(move |state| {
                let ticket = state.ticket(id).unwrap();
                assert_eq!(ticket.status(), TicketStatus::Open);
                assert_eq!(ticket.priority(), TicketPriority::Medium);
                assert!(matches!(state.last_outcome, Some(Ok(DeskAction::TicketCreated { .. }))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn unknown_token_is_unauthenticated() {
        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(DeskState::new())
            .when_action(DeskAction::CreateTicket {
                token: SessionToken::generate(),
                id: TicketId::new(),
                draft: TicketDraft::new("x", "", TicketPriority::Low),
            })
            .then_state(|state| {
                assert!(matches!(rejection(state), Some(HelpdeskError::Unauthenticated(_))));
                assert_eq!(state.ticket_count(), 0);
            })
            .run();
    }

    #[test]
    fn invalid_draft_is_rejected_before_anything_is_stored() {
        let (state, people) = staffed();
        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::CreateTicket {
                token: token_of(&people, Role::User),
                id: TicketId::new(),
                draft: TicketDraft::new("  ", "", TicketPriority::Low),
            })
            .then_state(|state| {
                let errors = rejection(state).and_then(HelpdeskError::validation_errors);
                assert!(errors.and_then(|e| e.get("title")).is_some());
                assert_eq!(state.ticket_count(), 0);
            })
            .run();
    }

    #[test]
    fn user_cannot_edit_even_own_ticket() {
        let (mut state, people) = staffed();
        let user = token_of(&people, Role::User);
        let id = with_ticket(&mut state, &user);
        let before = state.ticket(id).cloned();

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::UpdateTicket {
                token: user,
                id,
                patch: TicketPatch::status(TicketStatus::Closed),
            })
            .then_state(move |state| {
                assert_eq!(
                    rejection(state),
                    Some(&HelpdeskError::AuthorizationDenied {
                        action: Action::Edit,
                        reason: DenyReason::MissingRole {
                            required: policy::EDITORS
                        },
                    })
                );
                assert_eq!(state.ticket(id).cloned(), before);
            })
            .run();
    }

    #[test]
    fn technician_resolves_ticket() {
        let (mut state, people) = staffed();
        let id = with_ticket(&mut state, &token_of(&people, Role::User));

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::UpdateTicket {
                token: token_of(&people, Role::Technician),
                id,
                patch: TicketPatch::status(TicketStatus::Resolved),
            })
            .then_state(move |state| {
                let ticket = state.ticket(id).unwrap();
                assert_eq!(ticket.status(), TicketStatus::Resolved);
                assert!(ticket.resolved_at().is_some());
            })
            .run();
    }

    #[test]
    fn assigning_unknown_user_is_not_found() {
        let (mut state, people) = staffed();
        let id = with_ticket(&mut state, &token_of(&people, Role::User));

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::UpdateTicket {
                token: token_of(&people, Role::Manager),
                id,
                patch: TicketPatch::assign(UserId::new()),
            })
            .then_state(|state| {
                assert!(matches!(
                    rejection(state),
                    Some(HelpdeskError::NotFound { resource: "User", .. })
                ));
            })
            .run();
    }

    #[test]
    fn delete_rules() {
        let (mut state, people) = staffed();
        let id = with_ticket(&mut state, &token_of(&people, Role::User));

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state.clone())
            .when_action(DeskAction::DeleteTicket {
                token: token_of(&people, Role::Manager),
                id,
            })
            .then_state(move |state| {
                assert!(state.ticket(id).is_some());
                assert!(matches!(
                    rejection(state),
                    Some(HelpdeskError::AuthorizationDenied { action: Action::Delete, .. })
                ));
            })
            .run();

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::DeleteTicket {
                token: token_of(&people, Role::Admin),
                id,
            })
            .then_state(move |state| assert!(state.ticket(id).is_none()))
            .run();
    }

    #[test]
    fn comment_count_follows_comments() {
        let (mut state, people) = staffed();
        let user = token_of(&people, Role::User);
        let tech = token_of(&people, Role::Technician);
        let id = with_ticket(&mut state, &user);
        let first = CommentId::new();

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::AddComment {
                token: user.clone(),
                id: first,
                ticket_id: id,
                content: "Still broken".into(),
            })
            .when_action(DeskAction::AddComment {
                token: tech,
                id: CommentId::new(),
                ticket_id: id,
                content: "On my way".into(),
            })
            .when_action(DeskAction::DeleteComment {
                token: user,
                ticket_id: id,
                comment_id: first,
            })
            .then_state(move |state| {
                assert_eq!(state.ticket(id).unwrap().comment_count(), 1);
                assert_eq!(state.comments_on(id).len(), 1);
            })
            .run();
    }

    #[test]
    fn only_author_or_admin_removes_a_comment() {
        let (mut state, people) = staffed();
        let user = token_of(&people, Role::User);
        let id = with_ticket(&mut state, &user);
        let comment_id = CommentId::new();
        let _ = DeskReducer::new().reduce(
            &mut state,
            DeskAction::AddComment {
                token: user,
                id: comment_id,
                ticket_id: id,
                content: "mine".into(),
            },
            &env(),
        );

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::DeleteComment {
                token: token_of(&people, Role::Manager),
                ticket_id: id,
                comment_id,
            })
            .then_state(move |state| {
                assert_eq!(state.ticket(id).unwrap().comment_count(), 1);
                assert!(matches!(
                    rejection(state),
                    Some(HelpdeskError::AuthorizationDenied {
                        reason: DenyReason::NotOwner,
                        ..
                    })
                ));
            })
            .run();
    }

    #[test]
    fn deleting_a_ticket_removes_its_comments() {
        let (mut state, people) = staffed();
        let user = token_of(&people, Role::User);
        let id = with_ticket(&mut state, &user);

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::AddComment {
                token: user.clone(),
                id: CommentId::new(),
                ticket_id: id,
                content: "bump".into(),
            })
            .when_action(DeskAction::DeleteTicket { token: user, id })
            .then_state(move |state| {
                assert!(state.ticket(id).is_none());
                assert!(state.comments_on(id).is_empty());
            })
            .run();
    }

    #[test]
    fn duplicate_username_conflicts() {
        let (state, _) = staffed();
        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::RegisterUser {
                id: UserId::new(),
                username: "role_admin".into(),
                email: "new@desk.test".into(),
                password: PasswordDigest::generate(&Password::new("password1")),
                role: Role::User,
            })
            .then_state(|state| {
                assert_eq!(
                    rejection(state),
                    Some(&HelpdeskError::Conflict("Username is already taken".into()))
                );
            })
            .run();
    }

    #[test]
    fn wrong_password_opens_no_session() {
        let (state, _) = staffed();
        let sessions_before = state.sessions.len();
        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::OpenSession {
                token: SessionToken::generate(),
                username: "role_user".into(),
                password: Password::new("not-the-password"),
            })
            .then_state(move |state| {
                assert!(matches!(rejection(state), Some(HelpdeskError::Unauthenticated(_))));
                assert_eq!(state.sessions.len(), sessions_before);
            })
            .run();
    }

    #[test]
    fn out_of_range_session_lifetime_opens_no_session() {
        let (state, _) = staffed();
        let sessions_before = state.sessions.len();
        let ttl = chrono::Duration::try_days(100_000_000).unwrap();
        ReducerTest::new(DeskReducer::new())
            .with_env(env().with_session_ttl(ttl))
            .given_state(state)
            .when_action(DeskAction::OpenSession {
                token: SessionToken::generate(),
                username: "role_user".into(),
                password: Password::new("password1"),
            })
            .then_state(move |state| {
                assert!(matches!(rejection(state), Some(HelpdeskError::Transport(_))));
                assert_eq!(state.sessions.len(), sessions_before);
            })
            .run();
    }

    #[test]
    fn role_change_is_admin_only_and_keeps_open_sessions() {
        let (state, people) = staffed();
        let user_id = people.iter().find(|p| p.0 == Role::User).map(|p| p.1).unwrap();
        let user_token = token_of(&people, Role::User);

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::ChangeRole {
                token: token_of(&people, Role::Admin),
                user_id,
                role: Role::Technician,
            })
            .then_state(move |state| {
                assert_eq!(state.user(user_id).unwrap().role, Role::Technician);
                let now = test_clock().now();
                assert_eq!(state.principal(&user_token, now).unwrap().role, Role::User);
            })
            .run();
    }

    #[test]
    fn disabling_an_account_ends_its_sessions_and_blocks_login() {
        let (state, people) = staffed();
        let user_id = people.iter().find(|p| p.0 == Role::User).map(|p| p.1).unwrap();
        let user_token = token_of(&people, Role::User);

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::ToggleUser {
                token: token_of(&people, Role::Admin),
                user_id,
            })
            .then_state(move |state| {
                assert!(!state.user(user_id).unwrap().enabled);
                assert!(state.principal(&user_token, test_clock().now()).is_none());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn disabled_account_cannot_open_a_session_until_enabled_again() {
        let (mut state, people) = staffed();
        let user_id = people.iter().find(|p| p.0 == Role::User).map(|p| p.1).unwrap();
        let admin = token_of(&people, Role::Admin);
        let reducer = DeskReducer::new();
        let env = env();

        let _ = reducer.reduce(
            &mut state,
            DeskAction::ToggleUser { token: admin.clone(), user_id },
            &env,
        );
        let sessions_before = state.sessions.len();
        let _ = reducer.reduce(
            &mut state,
            DeskAction::OpenSession {
                token: SessionToken::generate(),
                username: "role_user".into(),
                password: Password::new("password1"),
            },
            &env,
        );
        assert!(matches!(
            rejection(&state),
            Some(HelpdeskError::Unauthenticated(message)) if message == "Account is disabled"
        ));
        assert_eq!(state.sessions.len(), sessions_before);

        let _ = reducer.reduce(&mut state, DeskAction::ToggleUser { token: admin, user_id }, &env);
        assert!(state.user(user_id).unwrap().enabled);
        let _ = reducer.reduce(
            &mut state,
            DeskAction::OpenSession {
                token: SessionToken::generate(),
                username: "role_user".into(),
                password: Password::new("password1"),
            },
            &env,
        );
        assert!(rejection(&state).is_none());
        assert_eq!(state.sessions.len(), sessions_before + 1);
    }

    #[test]
    fn account_management_is_admin_only() {
        let (state, people) = staffed();
        let user_id = people.iter().find(|p| p.0 == Role::User).map(|p| p.1).unwrap();

        for role in [Role::Manager, Role::Technician, Role::User] {
            let token = token_of(&people, role);
            ReducerTest::new(DeskReducer::new())
                .with_env(env())
                .given_state(state.clone())
                .when_action(DeskAction::DeleteUser { token, user_id })
                .then_state(move |state| {
                    assert!(matches!(
                        rejection(state),
                        Some(HelpdeskError::AuthorizationDenied {
                            action: Action::ManageUsers,
                            ..
                        })
                    ));
                    assert!(state.user(user_id).is_some());
                })
                .run();
        }
    }

    #[test]
    fn deleting_an_account_keeps_its_tickets() {
        let (mut state, people) = staffed();
        let user_id = people.iter().find(|p| p.0 == Role::User).map(|p| p.1).unwrap();
        let user_token = token_of(&people, Role::User);
        let ticket_id = with_ticket(&mut state, &user_token);

        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::DeleteUser {
                token: token_of(&people, Role::Admin),
                user_id,
            })
            .then_state(move |state| {
                assert!(state.user(user_id).is_none());
                assert!(state.principal(&user_token, test_clock().now()).is_none());
                let ticket = state.ticket(ticket_id).unwrap();
                assert_eq!(ticket.created_by(), user_id);
                assert!(!state.user_view(user_id).enabled);
            })
            .run();
    }

    #[test]
    fn managing_an_unknown_account_is_not_found() {
        let (state, people) = staffed();
        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::ToggleUser {
                token: token_of(&people, Role::Admin),
                user_id: UserId::new(),
            })
            .then_state(|state| {
                assert!(matches!(rejection(state), Some(HelpdeskError::NotFound { .. })));
            })
            .run();
    }

    #[test]
    fn logout_ends_the_session() {
        let (state, people) = staffed();
        let token = token_of(&people, Role::User);
        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(DeskAction::CloseSession {
                token: token.clone(),
            })
            .then_state(move |state| {
                assert!(state.principal(&token, test_clock().now()).is_none());
            })
            .run();
    }

    #[test]
    fn replayed_event_applies_without_checks() {
        let now = test_clock().now();
        let draft = TicketDraft::new("Replayed", "", TicketPriority::Low);
        let ticket = Ticket::open(TicketId::new(), draft, UserId::new(), now);
        let id = ticket.id();
        ReducerTest::new(DeskReducer::new())
            .with_env(env())
            .given_state(DeskState::new())
            .when_action(DeskAction::TicketCreated { ticket })
            .then_state(move |state| {
                assert_eq!(state.ticket_count(), 1);
                assert!(state.ticket(id).is_some());
                assert!(matches!(state.last_outcome, Some(Ok(_))));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }
}
