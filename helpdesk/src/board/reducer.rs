//! Board reducer.

use super::{Backend, BoardAction, BoardState, Detail, Generation};
use crate::error::HelpdeskError;
use crate::identity::SessionToken;
use crate::policy::{self, Action, Decision, Owned};
use crate::types::{Principal, TicketId};
use crate::validation::{validate_comment, validate_draft, validate_patch, ValidationErrors};
use helpdesk_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
use std::sync::Arc;

type Effects = SmallVec<[Effect<BoardAction>; 4]>;

/// Environment dependencies for the board reducer
#[derive(Clone)]
pub struct BoardEnvironment {
    /// Backend the effects call
    pub backend: Arc<dyn Backend>,
}

impl BoardEnvironment {
    /// Creates a new `BoardEnvironment`
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

/// Reducer for the board
#[derive(Clone, Debug, Default)]
pub struct BoardReducer;

impl BoardReducer {
    /// Creates a new `BoardReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // ========== Loads ==========

    fn load_list(state: &mut BoardState, env: &BoardEnvironment) -> Effect<BoardAction> {
        let Some(token) = state.token() else {
            return Effect::None;
        };
        state.generations.list = state.generations.list.next();
        state.loading_list = true;

        let generation = state.generations.list;
        let query = state.query.clone();
        let backend = Arc::clone(&env.backend);
        Effect::future(async move {
            let result = backend.list_tickets(&token, &query).await;
            Some(BoardAction::ListLoaded { generation, result })
        })
    }

    fn load_ticket(state: &mut BoardState, env: &BoardEnvironment, id: TicketId) -> Effect<BoardAction> {
        let Some(token) = state.token() else {
            return Effect::None;
        };
        state.generations.ticket = state.generations.ticket.next();

        let generation = state.generations.ticket;
        let backend = Arc::clone(&env.backend);
        Effect::future(async move {
            let result = backend.ticket(&token, id).await;
            Some(BoardAction::TicketLoaded { generation, result })
        })
    }

    fn load_comments(
        state: &mut BoardState,
        env: &BoardEnvironment,
        id: TicketId,
    ) -> Effect<BoardAction> {
        let Some(token) = state.token() else {
            return Effect::None;
        };
        state.generations.comments = state.generations.comments.next();

        let generation = state.generations.comments;
        let backend = Arc::clone(&env.backend);
        Effect::future(async move {
            let result = backend.comments(&token, id).await;
            Some(BoardAction::CommentsLoaded { generation, result })
        })
    }

    /// Reload the list, and the open ticket when `ticket` is it (or `None`).
    fn refetch(state: &mut BoardState, env: &BoardEnvironment, ticket: Option<TicketId>) -> Effects {
        let mut loads = vec![Self::load_list(state, env)];
        let open = state.detail.as_ref().map(|d| d.id);
        if let Some(open) = open.filter(|open| ticket.is_none_or(|t| t == *open)) {
            loads.push(Self::load_ticket(state, env, open));
            loads.push(Self::load_comments(state, env, open));
        }
        smallvec![Effect::merge(loads)]
    }

    /// Invalidate in-flight detail loads.
    fn retire_detail(state: &mut BoardState) {
        state.detail = None;
        state.generations.ticket = state.generations.ticket.next();
        state.generations.comments = state.generations.comments.next();
    }

    fn is_stale(latest: Generation, generation: Generation, resource: &'static str) -> bool {
        if generation == latest {
            return false;
        }
        tracing::debug!(resource, ?generation, ?latest, "Discarding stale response");
        true
    }

    // ========== Pre-checks ==========

    fn signed_in(state: &mut BoardState) -> Option<(SessionToken, Principal)> {
        if let Some(session) = &state.session {
            return Some((session.token.clone(), session.principal.clone()));
        }
        state.record_error(&HelpdeskError::Unauthenticated("Sign in to continue".into()));
        None
    }

    fn permitted(state: &mut BoardState, decision: Decision, action: Action) -> bool {
        match decision.ensure(action) {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(%action, %error, "Action refused before sending");
                state.record_error(&error);
                false
            },
        }
    }

    fn valid(state: &mut BoardState, checked: Result<(), ValidationErrors>) -> bool {
        match checked {
            Ok(()) => {
                state.form_errors = None;
                true
            },
            Err(errors) => {
                state.form_errors = Some(errors);
                false
            },
        }
    }

    fn call<F>(f: F) -> Effects
    where
        F: std::future::Future<Output = BoardAction> + Send + 'static,
    {
        smallvec![Effect::future(async move { Some(f.await) })]
    }
}

impl Reducer for BoardReducer {
    type State = BoardState;
    type Action = BoardAction;
    type Environment = BoardEnvironment;

    #[allow(clippy::too_many_lines)]
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Session ==========
            BoardAction::SignedIn { session } => {
                state.session = Some(session);
                state.notice = None;
                state.form_errors = None;
                smallvec![Self::load_list(state, env)]
            },

            BoardAction::SignedOut => {
                let generations = state.generations;
                *state = BoardState::new();
                state.generations.list = generations.list.next();
                state.generations.ticket = generations.ticket.next();
                state.generations.comments = generations.comments.next();
                SmallVec::new()
            },

            // ========== Loads ==========
            BoardAction::Search { query } => {
                state.query = query.at_page(0);
                smallvec![Self::load_list(state, env)]
            },

            BoardAction::GoToPage { page } => {
                state.query = state.query.at_page(page);
                smallvec![Self::load_list(state, env)]
            },

            BoardAction::Refresh => Self::refetch(state, env, None),

            BoardAction::ListLoaded { generation, result } => {
                if Self::is_stale(state.generations.list, generation, "list") {
                    return SmallVec::new();
                }
                state.loading_list = false;
                match result {
                    Ok(page) => state.list = Some(page),
                    Err(error) => state.record_error(&error),
                }
                SmallVec::new()
            },

            BoardAction::OpenTicket { id } => {
                state.detail = Some(Detail::new(id));
                smallvec![Effect::merge(vec![
                    Self::load_ticket(state, env, id),
                    Self::load_comments(state, env, id),
                ])]
            },

            BoardAction::CloseTicket => {
                Self::retire_detail(state);
                SmallVec::new()
            },

            BoardAction::TicketLoaded { generation, result } => {
                if Self::is_stale(state.generations.ticket, generation, "ticket") {
                    return SmallVec::new();
                }
                match result {
                    Ok(ticket) => {
                        if let Some(detail) = state.detail.as_mut().filter(|d| d.id == ticket.id) {
                            detail.ticket = Some(ticket);
                            detail.not_found = false;
                        }
                    },
                    Err(HelpdeskError::NotFound { .. }) => {
                        if let Some(detail) = state.detail.as_mut() {
                            detail.ticket = None;
                            detail.not_found = true;
                        }
                    },
                    Err(error) => state.record_error(&error),
                }
                SmallVec::new()
            },

            BoardAction::CommentsLoaded { generation, result } => {
                if Self::is_stale(state.generations.comments, generation, "comments") {
                    return SmallVec::new();
                }
                match result {
                    Ok(comments) => {
                        if let Some(detail) = state.detail.as_mut() {
                            if comments.iter().all(|c| c.ticket_id == detail.id) {
                                detail.comments = comments;
                            }
                        }
                    },
                    Err(HelpdeskError::NotFound { .. }) => {
                        if let Some(detail) = state.detail.as_mut() {
                            detail.comments.clear();
                        }
                    },
                    Err(error) => state.record_error(&error),
                }
                SmallVec::new()
            },

            // ========== Mutations ==========
            BoardAction::SubmitTicket { draft } => {
                let Some((token, principal)) = Self::signed_in(state) else {
                    return SmallVec::new();
                };
                if !Self::valid(state, validate_draft(&draft)) {
                    return SmallVec::new();
                }
                let decision = policy::authorize(Some(&principal), None, Action::Create);
                if !Self::permitted(state, decision, Action::Create) {
                    return SmallVec::new();
                }
                let backend = Arc::clone(&env.backend);
                Self::call(async move {
                    BoardAction::TicketSaved {
                        result: backend.create_ticket(&token, draft).await,
                    }
                })
            },

            BoardAction::UpdateTicket { id, patch } => {
                let Some((token, principal)) = Self::signed_in(state) else {
                    return SmallVec::new();
                };
                if !Self::valid(state, validate_patch(&patch)) {
                    return SmallVec::new();
                }
                let target = state.known_ticket(id).map(|t| t as &dyn Owned);
                let decision = policy::authorize(Some(&principal), target, Action::Edit);
                if !Self::permitted(state, decision, Action::Edit) {
                    return SmallVec::new();
                }
                let backend = Arc::clone(&env.backend);
                Self::call(async move {
                    BoardAction::TicketSaved {
                        result: backend.update_ticket(&token, id, patch).await,
                    }
                })
            },

            BoardAction::DeleteTicket { id } => {
                let Some((token, principal)) = Self::signed_in(state) else {
                    return SmallVec::new();
                };
                // Ownership can only be checked up front for a ticket already on screen.
                if let Some(target) = state.known_ticket(id) {
                    let target = Some(target as &dyn Owned);
                    let decision = policy::authorize(Some(&principal), target, Action::Delete);
                    if !Self::permitted(state, decision, Action::Delete) {
                        return SmallVec::new();
                    }
                }
                let backend = Arc::clone(&env.backend);
                Self::call(async move {
                    BoardAction::TicketRemoved {
                        id,
                        result: backend.delete_ticket(&token, id).await,
                    }
                })
            },

            BoardAction::PostComment { ticket_id, content } => {
                let Some((token, principal)) = Self::signed_in(state) else {
                    return SmallVec::new();
                };
                if !Self::valid(state, validate_comment(&content)) {
                    return SmallVec::new();
                }
                let target = state.known_ticket(ticket_id).map(|t| t as &dyn Owned);
                let decision = policy::authorize(Some(&principal), target, Action::Comment);
                if !Self::permitted(state, decision, Action::Comment) {
                    return SmallVec::new();
                }
                let backend = Arc::clone(&env.backend);
                Self::call(async move {
                    BoardAction::CommentSaved {
                        ticket_id,
                        result: backend.add_comment(&token, ticket_id, content).await,
                    }
                })
            },

            BoardAction::RemoveComment {
                ticket_id,
                comment_id,
            } => {
                let Some((token, principal)) = Self::signed_in(state) else {
                    return SmallVec::new();
                };
                let author = state
                    .detail
                    .as_ref()
                    .and_then(|d| d.comments.iter().find(|c| c.id == comment_id))
                    .map(|c| c.author.id);
                if let Some(author) = author {
                    let decision = policy::can_delete_comment(Some(&principal), author);
                    if !Self::permitted(state, decision, Action::Delete) {
                        return SmallVec::new();
                    }
                }
                let backend = Arc::clone(&env.backend);
                Self::call(async move {
                    BoardAction::CommentRemoved {
                        ticket_id,
                        result: backend.delete_comment(&token, ticket_id, comment_id).await,
                    }
                })
            },

            // ========== Mutation results ==========
            BoardAction::TicketSaved { result } => match result {
                Ok(ticket) => {
                    state.form_errors = None;
                    let id = ticket.id;
                    if let Some(detail) = state.detail.as_mut().filter(|d| d.id == id) {
                        detail.ticket = Some(ticket);
                    }
                    Self::refetch(state, env, Some(id))
                },
                Err(error) => {
                    state.record_error(&error);
                    SmallVec::new()
                },
            },

            BoardAction::TicketRemoved { id, result } => match result {
                Ok(()) => {
                    if state.detail.as_ref().is_some_and(|d| d.id == id) {
                        Self::retire_detail(state);
                    }
                    Self::refetch(state, env, Some(id))
                },
                Err(error) => {
                    state.record_error(&error);
                    SmallVec::new()
                },
            },

            BoardAction::CommentSaved { ticket_id, result } => match result {
                Ok(_) => {
                    state.form_errors = None;
                    Self::refetch(state, env, Some(ticket_id))
                },
                Err(error) => {
                    state.record_error(&error);
                    SmallVec::new()
                },
            },

            BoardAction::CommentRemoved { ticket_id, result } => match result {
                Ok(()) => Self::refetch(state, env, Some(ticket_id)),
                Err(error) => {
                    state.record_error(&error);
                    SmallVec::new()
                },
            },

            BoardAction::DismissNotice => {
                state.notice = None;
                SmallVec::new()
            },
        }
    }
}
