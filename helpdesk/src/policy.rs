//! Authorization policy.
//!
//! A single ordered rule table decides what a principal may do with a ticket.
//! Rules are evaluated top-down and the first rule whose action set contains
//! the requested action decides. Unauthenticated callers are denied before
//! the table is consulted.
//!
//! | Action                 | Rule                                         |
//! |------------------------|----------------------------------------------|
//! | `CREATE COMMENT VIEW`  | any authenticated principal                  |
//! | `EDIT`                 | ADMIN, MANAGER or TECHNICIAN                 |
//! | `DELETE`               | ticket creator, or ADMIN                     |
//! | `ADMIN_PANEL`          | ADMIN or MANAGER                             |
//! | `MANAGE_USERS`         | ADMIN                                        |
//!
//! Evaluating the policy never changes anything. The board calls it before
//! offering an action and the desk calls it again before applying one.

use crate::error::HelpdeskError;
use crate::identity::has_role;
use crate::types::{Principal, Role, Ticket, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Something a principal may attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Read a ticket or listing
    View,
    /// Open a ticket
    Create,
    /// Change status, priority, assignment or text
    Edit,
    /// Remove a ticket
    Delete,
    /// Post a comment
    Comment,
    /// Reach the administration screens
    AdminPanel,
    /// Change, disable or delete an account
    ManageUsers,
}

impl Action {
    /// Every action
    pub const ALL: [Self; 7] = [
        Self::View,
        Self::Create,
        Self::Edit,
        Self::Delete,
        Self::Comment,
        Self::AdminPanel,
        Self::ManageUsers,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::View => "VIEW",
            Self::Create => "CREATE",
            Self::Edit => "EDIT",
            Self::Delete => "DELETE",
            Self::Comment => "COMMENT",
            Self::AdminPanel => "ADMIN_PANEL",
            Self::ManageUsers => "MANAGE_USERS",
        };
        f.write_str(name)
    }
}

/// Why a request was denied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    /// No principal
    Unauthenticated,
    /// The principal's role is not one of `required`
    MissingRole {
        /// Roles that would have been accepted
        required: &'static [Role],
    },
    /// Only the owner (or an admin) may do this
    NotOwner,
    /// The action needs a ticket and none was given
    NoTicket,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => f.write_str("not signed in"),
            Self::MissingRole { required } => {
                let names: Vec<&str> = required.iter().map(|r| r.as_str()).collect();
                write!(f, "requires one of {}", names.join(", "))
            },
            Self::NotOwner => f.write_str("only the owner or an administrator may do this"),
            Self::NoTicket => f.write_str("no ticket given"),
        }
    }
}

/// Outcome of a policy check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Go ahead
    Allow,
    /// Refused
    Deny(DenyReason),
}

impl Decision {
    /// Whether the decision is [`Decision::Allow`]
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Convert a denial into [`HelpdeskError`].
    ///
    /// # Errors
    ///
    /// `Unauthenticated` for a missing principal, `AuthorizationDenied`
    /// for any other denial.
    pub fn ensure(self, action: Action) -> Result<(), HelpdeskError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(DenyReason::Unauthenticated) => Err(HelpdeskError::Unauthenticated(
                "authentication required".to_string(),
            )),
            Self::Deny(reason) => Err(HelpdeskError::AuthorizationDenied { action, reason }),
        }
    }
}

/// Anything with an owning account the `DELETE` rule can check against.
pub trait Owned {
    /// Account that created the resource
    fn owner(&self) -> UserId;
}

impl Owned for Ticket {
    fn owner(&self) -> UserId {
        self.created_by()
    }
}

/// Roles allowed to edit a ticket
pub const EDITORS: &[Role] = &[Role::Admin, Role::Manager, Role::Technician];
/// Roles allowed into the admin panel
pub const PANEL: &[Role] = &[Role::Admin, Role::Manager];
/// Roles with unconditional delete rights
pub const ADMINS: &[Role] = &[Role::Admin];

type Check = fn(&Principal, Option<&dyn Owned>) -> Decision;

struct Rule {
    actions: &'static [Action],
    check: Check,
}

const RULES: &[Rule] = &[
    Rule {
        actions: &[Action::Create, Action::Comment, Action::View],
        check: signed_in,
    },
    Rule {
        actions: &[Action::Edit],
        check: staff,
    },
    Rule {
        actions: &[Action::Delete],
        check: owner_or_admin,
    },
    Rule {
        actions: &[Action::AdminPanel],
        check: panel,
    },
    Rule {
        actions: &[Action::ManageUsers],
        check: admin_only,
    },
];

fn signed_in(_: &Principal, _: Option<&dyn Owned>) -> Decision {
    Decision::Allow
}

fn staff(principal: &Principal, _: Option<&dyn Owned>) -> Decision {
    require(principal, EDITORS)
}

fn panel(principal: &Principal, _: Option<&dyn Owned>) -> Decision {
    require(principal, PANEL)
}

fn admin_only(principal: &Principal, _: Option<&dyn Owned>) -> Decision {
    require(principal, ADMINS)
}

fn require(principal: &Principal, required: &'static [Role]) -> Decision {
    if has_role(Some(principal), required) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::MissingRole { required })
    }
}

fn owner_or_admin(principal: &Principal, resource: Option<&dyn Owned>) -> Decision {
    let Some(resource) = resource else {
        return Decision::Deny(DenyReason::NoTicket);
    };
    if resource.owner() == principal.id || has_role(Some(principal), ADMINS) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::NotOwner)
    }
}

/// Decide whether `principal` may perform `action` on `ticket`.
///
/// `ticket` is `None` for actions without a target (`CREATE`, `ADMIN_PANEL`,
/// `MANAGE_USERS`, listing). `DELETE` without a ticket is denied.
#[must_use]
pub fn authorize(
    principal: Option<&Principal>,
    ticket: Option<&dyn Owned>,
    action: Action,
) -> Decision {
    let Some(principal) = principal else {
        return Decision::Deny(DenyReason::Unauthenticated);
    };

    RULES
        .iter()
        .find(|rule| rule.actions.contains(&action))
        .map_or(Decision::Deny(DenyReason::MissingRole { required: &[] }), |rule| {
            (rule.check)(principal, ticket)
        })
}

/// Every action `principal` may currently perform on `ticket`.
///
/// Used by the board to decide which controls to offer.
#[must_use]
pub fn capabilities(principal: Option<&Principal>, ticket: Option<&dyn Owned>) -> Vec<Action> {
    Action::ALL
        .into_iter()
        .filter(|action| authorize(principal, ticket, *action).is_allowed())
        .collect()
}

/// Comment removal: the comment's author, or an ADMIN.
#[must_use]
pub fn can_delete_comment(principal: Option<&Principal>, author: UserId) -> Decision {
    match principal {
        None => Decision::Deny(DenyReason::Unauthenticated),
        Some(p) if p.id == author || has_role(Some(p), ADMINS) => Decision::Allow,
        Some(_) => Decision::Deny(DenyReason::NotOwner),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TicketDraft, TicketId, TicketPriority};
    use chrono::Utc;

    fn principal(role: Role) -> Principal {
        Principal::new(UserId::new(), format!("{role}"), role)
    }

    fn ticket_by(owner: UserId) -> Ticket {
        Ticket::open(
            TicketId::new(),
            TicketDraft::new("Laptop", "", TicketPriority::Low),
            owner,
            Utc::now(),
        )
    }

    #[test]
    fn unauthenticated_is_denied_everything() {
        let ticket = ticket_by(UserId::new());
        for action in Action::ALL {
            assert_eq!(
                authorize(None, Some(&ticket), action),
                Decision::Deny(DenyReason::Unauthenticated)
            );
        }
        assert!(capabilities(None, None).is_empty());
    }

    #[test]
    fn anyone_signed_in_may_view_create_and_comment() {
        for role in Role::ALL {
            let p = principal(role);
            for action in [Action::View, Action::Create, Action::Comment] {
                assert!(authorize(Some(&p), None, action).is_allowed());
            }
        }
    }

    #[test]
    fn user_never_edits() {
        let user = principal(Role::User);
        let own = ticket_by(user.id);
        assert_eq!(
            authorize(Some(&user), Some(&own), Action::Edit),
            Decision::Deny(DenyReason::MissingRole { required: EDITORS })
        );
    }

    #[test]
    fn staff_may_edit() {
        let ticket = ticket_by(UserId::new());
        for role in [Role::Technician, Role::Manager, Role::Admin] {
            assert!(authorize(Some(&principal(role)), Some(&ticket), Action::Edit).is_allowed());
        }
    }

    #[test]
    fn delete_is_owner_or_admin() {
        let owner = principal(Role::User);
        let ticket = ticket_by(owner.id);

        assert!(authorize(Some(&owner), Some(&ticket), Action::Delete).is_allowed());
        assert!(authorize(Some(&principal(Role::Admin)), Some(&ticket), Action::Delete).is_allowed());
        assert_eq!(
            authorize(Some(&principal(Role::Manager)), Some(&ticket), Action::Delete),
            Decision::Deny(DenyReason::NotOwner)
        );
        assert_eq!(
            authorize(Some(&principal(Role::Technician)), Some(&ticket), Action::Delete),
            Decision::Deny(DenyReason::NotOwner)
        );
    }

    #[test]
    fn delete_without_ticket_is_denied() {
        assert_eq!(
            authorize(Some(&principal(Role::Admin)), None, Action::Delete),
            Decision::Deny(DenyReason::NoTicket)
        );
    }

    #[test]
    fn admin_panel_for_admin_and_manager() {
        assert!(authorize(Some(&principal(Role::Admin)), None, Action::AdminPanel).is_allowed());
        assert!(authorize(Some(&principal(Role::Manager)), None, Action::AdminPanel).is_allowed());
        assert!(!authorize(Some(&principal(Role::Technician)), None, Action::AdminPanel).is_allowed());
        assert!(!authorize(Some(&principal(Role::User)), None, Action::AdminPanel).is_allowed());
    }

    #[test]
    fn capabilities_for_ticket_owner() {
        let owner = principal(Role::User);
        let ticket = ticket_by(owner.id);
        assert_eq!(
            capabilities(Some(&owner), Some(&ticket)),
            vec![Action::View, Action::Create, Action::Delete, Action::Comment]
        );
    }

    #[test]
    fn comment_removal_and_user_management() {
        let author = principal(Role::User);
        let other = principal(Role::Manager);

        assert!(can_delete_comment(Some(&author), author.id).is_allowed());
        assert!(can_delete_comment(Some(&principal(Role::Admin)), author.id).is_allowed());
        assert!(!can_delete_comment(Some(&other), author.id).is_allowed());
        assert!(!can_delete_comment(None, author.id).is_allowed());

        assert!(authorize(Some(&principal(Role::Admin)), None, Action::ManageUsers).is_allowed());
        assert_eq!(
            authorize(Some(&other), None, Action::ManageUsers),
            Decision::Deny(DenyReason::MissingRole { required: ADMINS })
        );
        assert!(!authorize(None, None, Action::ManageUsers).is_allowed());
    }

    #[test]
    fn ensure_maps_denials_to_errors() {
        assert_eq!(Decision::Allow.ensure(Action::Edit), Ok(()));
        assert!(matches!(
            Decision::Deny(DenyReason::Unauthenticated).ensure(Action::View),
            Err(HelpdeskError::Unauthenticated(_))
        ));
        assert_eq!(
            Decision::Deny(DenyReason::NotOwner).ensure(Action::Delete),
            Err(HelpdeskError::AuthorizationDenied {
                action: Action::Delete,
                reason: DenyReason::NotOwner,
            })
        );
    }
}
