//! The access control evaluator.
//!
//! [`authorize`] is a pure decision over facts the caller has already loaded:
//! the actor, the action, the resource's scope and the actor's parent links.
//! It never touches storage, so it can be exercised without a database.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::actor::{Actor, ParentLink, Role};

/// What the actor is trying to do.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr,
  Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
  Read,
  Submit,
  Review,
  RequestLeave,
  CheckIn,
}

impl Action {
  pub const ALL: [Action; 5] = [
    Action::Read,
    Action::Submit,
    Action::Review,
    Action::RequestLeave,
    Action::CheckIn,
  ];

  /// Whether `role` may perform this action at all, before any scope rule.
  pub fn allows_role(self, role: Role) -> bool {
    match (self, role) {
      (_, Role::Admin) => true,
      (Action::Read | Action::RequestLeave, _) => true,
      (Action::Submit, Role::Athlete) => true,
      (Action::Review, Role::Coach) => true,
      (Action::CheckIn, Role::Coach | Role::Athlete) => true,
      _ => false,
    }
  }
}

/// The scope of the thing being acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
  pub club_id:    Uuid,
  /// The athlete or user the resource is about, if any.
  pub subject_id: Option<Uuid>,
}

impl Resource {
  pub fn club(club_id: Uuid) -> Self { Self { club_id, subject_id: None } }

  pub fn about(club_id: Uuid, subject_id: Uuid) -> Self {
    Self { club_id, subject_id: Some(subject_id) }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Allow,
  Deny(DenyReason),
}

impl Decision {
  pub fn is_allowed(&self) -> bool { matches!(self, Self::Allow) }

  /// Convert into a result, mapping every denial to
  /// [`Error::Unauthorized`](crate::Error::Unauthorized).
  pub fn into_result(self) -> crate::Result<()> {
    match self {
      Self::Allow => Ok(()),
      Self::Deny(_) => Err(crate::Error::Unauthorized),
    }
  }
}

/// Why a request was denied. Kept for logs only; callers always see the same
/// generic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DenyReason {
  RoleNotPermitted,
  OutsideClub,
  NotSubject,
  NoParentLink,
}

/// Decide whether `actor` may perform `action` on `resource`.
///
/// `links` are the parent links held by `actor`; they are only consulted for
/// parents.
pub fn authorize(
  actor: &Actor,
  action: Action,
  resource: &Resource,
  links: &[ParentLink],
) -> Decision {
  if !action.allows_role(actor.role) {
    return Decision::Deny(DenyReason::RoleNotPermitted);
  }

  match actor.role {
    Role::Admin => Decision::Allow,
    Role::Coach => {
      if actor.club_id == Some(resource.club_id) {
        Decision::Allow
      } else {
        Decision::Deny(DenyReason::OutsideClub)
      }
    }
    Role::Athlete => {
      if resource.subject_id == Some(actor.id) {
        Decision::Allow
      } else {
        Decision::Deny(DenyReason::NotSubject)
      }
    }
    Role::Parent => match resource.subject_id {
      Some(athlete_id)
        if links.iter().any(|l| l.grants(actor.id, athlete_id)) =>
      {
        Decision::Allow
      }
      _ => Decision::Deny(DenyReason::NoParentLink),
    },
  }
}
