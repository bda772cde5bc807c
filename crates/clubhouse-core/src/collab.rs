//! Athlete profiles and the outbound notification collaborator.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::correlation::CorrelationId;

// ─── Profiles ────────────────────────────────────────────────────────────────

/// The athlete profile created when a membership application is approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteProfile {
  pub profile_id: Uuid,
  pub user_id:    Uuid,
  pub club_id:    Uuid,
  pub created_at: DateTime<Utc>,
}

impl AthleteProfile {
  /// A fresh profile for `user_id` in `club_id`. The store keeps it only if
  /// the pair has none yet.
  pub fn new(user_id: Uuid, club_id: Uuid, created_at: DateTime<Utc>) -> Self {
    Self { profile_id: Uuid::new_v4(), user_id, club_id, created_at }
  }
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
  ApplicationSubmitted,
  ApplicationReviewed,
  LeaveRequested,
  LeaveReviewed,
  CheckedIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
  pub kind:           NotificationKind,
  /// The user the event is about.
  pub recipient:      Uuid,
  pub entity_id:      Uuid,
  /// New status of the entity, e.g. `approved` or `late`.
  pub status:         String,
  pub correlation_id: CorrelationId,
}

/// Delivers notifications. Called after a transition commits; its failure
/// is logged and never undoes the transition.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn notify(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
