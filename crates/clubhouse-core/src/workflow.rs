//! The review state machine shared by membership applications and leave
//! requests.
//!
//! ```text
//! pending ──approve──▶ approved
//!    └─────reject────▶ rejected
//! ```
//!
//! Both outcomes are terminal. [`plan_review`] validates a transition against
//! an entity snapshot and produces a [`Review`]; the store then commits it
//! with a compare-and-swap on the entity's `version`, so two reviewers racing
//! on the same snapshot cannot both win.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{
  access::Resource,
  activity::{ActivityLog, ActivityLogEntry},
  actor::{Actor, Role},
  validate, Error, Result,
};

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
pub enum ReviewStatus {
  Pending,
  Approved,
  Rejected,
}

impl ReviewStatus {
  pub fn is_terminal(self) -> bool { self != Self::Pending }
}

/// Who reviewed an entity, when, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewInfo {
  pub reviewed_by:   Uuid,
  pub reviewed_at:   DateTime<Utc>,
  pub reviewer_role: Role,
  pub notes:         Option<String>,
}

/// A reviewer's verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewDecision {
  Approve { notes: Option<String> },
  Reject { reason: String },
}

impl ReviewDecision {
  pub fn target(&self) -> ReviewStatus {
    match self {
      Self::Approve { .. } => ReviewStatus::Approved,
      Self::Reject { .. } => ReviewStatus::Rejected,
    }
  }

  /// Input checks that do not depend on the entity.
  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Approve { notes } => {
        if let Some(n) = notes {
          validate::max_len("notes", n, validate::MAX_TEXT_LEN).into_result()?;
        }
        Ok(())
      }
      Self::Reject { reason } => {
        validate::required("reason", reason).into_result()?;
        validate::max_len("reason", reason, validate::MAX_TEXT_LEN)
          .into_result()
      }
    }
  }

  fn into_notes(self) -> Option<String> {
    match self {
      Self::Approve { notes } => notes.filter(|n| !n.trim().is_empty()),
      Self::Reject { reason } => Some(reason.trim().to_owned()),
    }
  }
}

/// An entity governed by the review state machine.
pub trait WorkflowEntity {
  /// Human-readable entity name used in error messages.
  const KIND: &'static str;

  fn id(&self) -> Uuid;
  fn status(&self) -> ReviewStatus;
  fn version(&self) -> i64;
  fn activity_log(&self) -> &ActivityLog;
  /// The scope the access control evaluator checks against.
  fn resource(&self) -> Resource;
}

/// A validated, not yet committed transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
  pub entity_id:        Uuid,
  pub expected_version: i64,
  pub to:               ReviewStatus,
  pub info:             ReviewInfo,
  /// Appended at position `seq`.
  pub entry:            ActivityLogEntry,
  pub seq:              usize,
}

/// Check that `entity` may move to `decision.target()` and build the
/// transition. Authorisation is the caller's job.
pub fn plan_review<E: WorkflowEntity>(
  entity: &E,
  decision: ReviewDecision,
  reviewer: &Actor,
  now: DateTime<Utc>,
) -> Result<Review> {
  decision.validate()?;

  let from = entity.status();
  if from.is_terminal() {
    return Err(Error::InvalidState(format!(
      "{} {} is already {from}",
      E::KIND,
      entity.id()
    )));
  }

  let to = decision.target();
  let notes = decision.into_notes();
  let entry =
    ActivityLogEntry::status_changed(reviewer.id, now, from, to, notes.clone());

  Ok(Review {
    entity_id: entity.id(),
    expected_version: entity.version(),
    to,
    info: ReviewInfo {
      reviewed_by: reviewer.id,
      reviewed_at: now,
      reviewer_role: reviewer.role,
      notes,
    },
    entry,
    seq: entity.activity_log().len(),
  })
}
