//! # Helpdesk
//!
//! A help-desk ticket tracker: users open tickets, technicians, managers and
//! admins triage and resolve them, and everyone involved discusses them in
//! comments.
//!
//! The core is pure and synchronous:
//!
//! - [`types`] and [`identity`]: principals, roles, sessions, tickets, comments
//! - [`lifecycle`]: status transitions and the `resolvedAt` invariant
//! - [`policy`]: the ordered authorization rule table
//! - [`query`]: filtering, ordering and pagination of ticket collections
//! - [`validation`] and [`error`]: form checks and the error taxonomy
//!
//! Around it sit two reducers:
//!
//! - [`desk`]: the authoritative backend, driven through a [`DeskStore`]
//! - [`board`]: a client view-model that talks to any [`Backend`] and keeps
//!   what it shows consistent with it
//!
//! and a thin shell: [`api`] serves the desk over HTTP, configured by [`config`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod board;
pub mod config;
pub mod desk;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod policy;
pub mod query;
pub mod types;
pub mod validation;

pub use board::{Backend, BoardAction, BoardReducer, BoardState};
pub use desk::{DeskAction, DeskReducer, DeskState, DeskStore};
pub use error::{HelpdeskError, Result};
pub use types::{Comment, Principal, Role, Ticket, TicketPriority, TicketStatus};
