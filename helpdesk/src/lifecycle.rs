//! Ticket state machine.
//!
//! Every status → status assignment is legal, including regressions such as
//! `CLOSED → OPEN`. What the machine governs is the timestamp output of each
//! transition, which depends on both the current and the target status:
//!
//! ```text
//!   into RESOLVED / CLOSED      resolved_at := resolved_at or now
//!   into OPEN / IN_PROGRESS     resolved_at := none
//!   any field actually changed  updated_at  := now
//! ```
//!
//! `RESOLVED → CLOSED` therefore keeps the original resolution time.

use crate::types::{Ticket, TicketPriority, TicketStatus, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Move `ticket` to `to`, applying the timestamp side effects.
pub fn transition(ticket: &mut Ticket, to: TicketStatus, now: DateTime<Utc>) {
    if to.is_resolution() {
        if ticket.resolved_at.is_none() {
            ticket.resolved_at = Some(now);
        }
    } else {
        ticket.resolved_at = None;
    }
    ticket.status = to;
    ticket.updated_at = now;
}

/// Partial update of a ticket: only supplied fields change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPatch {
    /// New title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    /// New priority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TicketPriority>,
    /// Account to assign the ticket to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to_id: Option<UserId>,
}

impl TicketPatch {
    /// Patch changing only the status
    #[must_use]
    pub fn status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Patch changing only the priority
    #[must_use]
    pub fn priority(priority: TicketPriority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    /// Patch assigning the ticket
    #[must_use]
    pub fn assign(user: UserId) -> Self {
        Self {
            assigned_to_id: Some(user),
            ..Self::default()
        }
    }

    /// Whether no field is supplied
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assigned_to_id.is_none()
    }
}

/// Apply `patch` to `ticket`.
///
/// Every supplied field is written and the status goes through [`transition`].
/// Returns whether any value differs afterwards; only then is `updated_at`
/// refreshed. An empty patch, or one repeating current values, leaves the
/// ticket untouched.
pub fn apply_patch(ticket: &mut Ticket, patch: &TicketPatch, now: DateTime<Utc>) -> bool {
    if patch.is_empty() {
        return false;
    }
    let before = ticket.clone();

    if let Some(title) = &patch.title {
        ticket.title = title.trim().to_string();
    }
    if let Some(description) = &patch.description {
        ticket.description.clone_from(description);
    }
    if let Some(priority) = patch.priority {
        ticket.priority = priority;
    }
    if let Some(assignee) = patch.assigned_to_id {
        ticket.assigned_to = Some(assignee);
    }
    if let Some(status) = patch.status {
        transition(ticket, status, now);
    }

    ticket.updated_at = before.updated_at;
    let changed = *ticket != before;
    if changed {
        ticket.updated_at = now;
    }
    changed
}

/// Whether `ticket` satisfies the `resolved_at` ⇔ resolution-status invariant.
#[must_use]
pub fn resolution_consistent(ticket: &Ticket) -> bool {
    ticket.resolved_at.is_some() == ticket.status.is_resolution()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TicketDraft, TicketId};
    use chrono::Duration;
    use helpdesk_core::environment::Clock;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        helpdesk_testing::test_clock().now()
    }

    fn open_ticket() -> Ticket {
        Ticket::open(
            TicketId::new(),
            TicketDraft::new("VPN drops", "every hour", TicketPriority::Medium),
            UserId::new(),
            t0(),
        )
    }

    #[test]
    fn closing_an_open_ticket_stamps_resolution() {
        let mut ticket = open_ticket();
        let later = t0() + Duration::minutes(10);

        transition(&mut ticket, TicketStatus::Closed, later);

        assert_eq!(ticket.status(), TicketStatus::Closed);
        assert_eq!(ticket.resolved_at(), Some(later));
        assert_eq!(ticket.updated_at(), later);
    }

    #[test]
    fn reopening_clears_resolution() {
        let mut ticket = open_ticket();
        transition(&mut ticket, TicketStatus::Closed, t0() + Duration::minutes(1));
        transition(&mut ticket, TicketStatus::Open, t0() + Duration::minutes(2));

        assert_eq!(ticket.resolved_at(), None);
        assert_eq!(ticket.updated_at(), t0() + Duration::minutes(2));
    }

    #[test]
    fn resolved_to_closed_keeps_first_resolution_time() {
        let mut ticket = open_ticket();
        let resolved = t0() + Duration::minutes(5);
        transition(&mut ticket, TicketStatus::Resolved, resolved);
        transition(&mut ticket, TicketStatus::Closed, resolved + Duration::days(1));

        assert_eq!(ticket.resolved_at(), Some(resolved));
        assert_eq!(ticket.updated_at(), resolved + Duration::days(1));
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut ticket = open_ticket();
        let before = ticket.clone();

        assert!(!apply_patch(&mut ticket, &TicketPatch::default(), t0() + Duration::hours(1)));
        assert_eq!(ticket, before);
    }

    #[test]
    fn patch_repeating_current_values_changes_nothing() {
        let mut ticket = open_ticket();
        transition(&mut ticket, TicketStatus::Resolved, t0() + Duration::minutes(1));
        let before = ticket.clone();
        let patch = TicketPatch {
            title: Some(" VPN drops ".to_string()),
            description: Some("every hour".to_string()),
            status: Some(TicketStatus::Resolved),
            priority: Some(TicketPriority::Medium),
            assigned_to_id: None,
        };

        assert!(!apply_patch(&mut ticket, &patch, t0() + Duration::hours(1)));
        assert_eq!(ticket, before);
    }

    #[test]
    fn one_changed_field_among_repeats_counts_as_a_change() {
        let mut ticket = open_ticket();
        let later = t0() + Duration::hours(1);
        let patch = TicketPatch {
            title: Some("VPN drops".to_string()),
            status: Some(TicketStatus::Open),
            priority: Some(TicketPriority::Low),
            ..TicketPatch::default()
        };

        assert!(apply_patch(&mut ticket, &patch, later));
        assert_eq!(ticket.priority(), TicketPriority::Low);
        assert_eq!(ticket.updated_at(), later);
    }

    #[test]
    fn priority_patch_refreshes_updated_at_only() {
        let mut ticket = open_ticket();
        let later = t0() + Duration::hours(1);

        assert!(apply_patch(&mut ticket, &TicketPatch::priority(TicketPriority::Critical), later));

        assert_eq!(ticket.priority(), TicketPriority::Critical);
        assert_eq!(ticket.status(), TicketStatus::Open);
        assert_eq!(ticket.updated_at(), later);
        assert_eq!(ticket.created_at(), t0());
    }

    #[test]
    fn full_patch_writes_every_field() {
        let mut ticket = open_ticket();
        let tech = UserId::new();
        let patch = TicketPatch {
            title: Some(" VPN drops hourly ".to_string()),
            description: Some("since Monday".to_string()),
            status: Some(TicketStatus::InProgress),
            priority: Some(TicketPriority::High),
            assigned_to_id: Some(tech),
        };

        assert!(apply_patch(&mut ticket, &patch, t0() + Duration::minutes(3)));

        assert_eq!(ticket.title(), "VPN drops hourly");
        assert_eq!(ticket.description(), "since Monday");
        assert_eq!(ticket.status(), TicketStatus::InProgress);
        assert_eq!(ticket.assigned_to(), Some(tech));
        assert!(resolution_consistent(&ticket));
    }

    fn status_strategy() -> impl Strategy<Value = TicketStatus> {
        prop::sample::select(TicketStatus::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn resolution_invariant_holds_after_any_walk(
            walk in prop::collection::vec(status_strategy(), 1..20)
        ) {
            let mut ticket = open_ticket();
            for (step, status) in walk.into_iter().enumerate() {
                let now = t0() + Duration::minutes(i64::try_from(step).unwrap_or(0) + 1);
                transition(&mut ticket, status, now);
                prop_assert!(resolution_consistent(&ticket));
                prop_assert_eq!(ticket.updated_at(), now);
                prop_assert_eq!(ticket.status(), status);
            }
        }
    }
}
