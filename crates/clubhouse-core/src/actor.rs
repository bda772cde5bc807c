//! Actors and the relationship facts consulted when authorising them.
//!
//! Actors are issued by the authentication layer; this crate only consumes
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// The role an actor holds.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Admin,
  Coach,
  Athlete,
  Parent,
}

/// An authenticated identity. `club_id` is `None` only for admins, meaning
/// "all clubs".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub id:      Uuid,
  pub role:    Role,
  pub club_id: Option<Uuid>,
}

impl Actor {
  pub fn admin(id: Uuid) -> Self {
    Self { id, role: Role::Admin, club_id: None }
  }

  pub fn coach(id: Uuid, club_id: Uuid) -> Self {
    Self { id, role: Role::Coach, club_id: Some(club_id) }
  }

  pub fn athlete(id: Uuid, club_id: Uuid) -> Self {
    Self { id, role: Role::Athlete, club_id: Some(club_id) }
  }

  pub fn parent(id: Uuid, club_id: Uuid) -> Self {
    Self { id, role: Role::Parent, club_id: Some(club_id) }
  }

  pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

// ─── Parent links ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LinkStatus {
  Pending,
  Approved,
  Revoked,
}

/// A connection between a parent account and an athlete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
  pub link_id:    Uuid,
  pub parent_id:  Uuid,
  pub athlete_id: Uuid,
  pub status:     LinkStatus,
  pub active:     bool,
  pub created_at: DateTime<Utc>,
}

impl ParentLink {
  /// Whether this link grants `parent_id` access to `athlete_id`.
  pub fn grants(&self, parent_id: Uuid, athlete_id: Uuid) -> bool {
    self.active
      && self.status == LinkStatus::Approved
      && self.parent_id == parent_id
      && self.athlete_id == athlete_id
  }
}
