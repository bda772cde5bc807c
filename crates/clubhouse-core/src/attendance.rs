//! Training sessions, attendance records and the check-in window.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;
use uuid::Uuid;

/// A scheduled training session. Owned by coaches; read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingSession {
  pub session_id: Uuid,
  pub club_id:    Uuid,
  pub title:      String,
  pub start_time: DateTime<Utc>,
}

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
pub enum AttendanceStatus {
  Present,
  Late,
  Absent,
  Excused,
}

/// At most one per `(session_id, athlete_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub record_id:     Uuid,
  pub session_id:    Uuid,
  pub athlete_id:    Uuid,
  pub status:        AttendanceStatus,
  /// `None` for records created by leave approval.
  pub check_in_time: Option<DateTime<Utc>>,
  pub recorded_at:   DateTime<Utc>,
}

impl AttendanceRecord {
  pub fn checked_in(
    session_id: Uuid,
    athlete_id: Uuid,
    status: AttendanceStatus,
    at: DateTime<Utc>,
  ) -> Self {
    Self {
      record_id: Uuid::new_v4(),
      session_id,
      athlete_id,
      status,
      check_in_time: Some(at),
      recorded_at: at,
    }
  }

  pub fn excused(session_id: Uuid, athlete_id: Uuid, at: DateTime<Utc>) -> Self {
    Self {
      record_id: Uuid::new_v4(),
      session_id,
      athlete_id,
      status: AttendanceStatus::Excused,
      check_in_time: None,
      recorded_at: at,
    }
  }
}

// ─── Check-in window ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WindowViolation {
  #[error("too early, check-in opens at {opens_at}")]
  TooEarly { opens_at: DateTime<Utc> },

  #[error("too late, check-in closed at {closed_at}")]
  TooLate { closed_at: DateTime<Utc> },
}

/// The interval around a session start during which check-in is accepted.
/// Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckInWindow {
  /// How long before the start check-in opens.
  pub opens_before: Duration,
  /// How long after the start check-in stays open.
  pub closes_after: Duration,
}

impl Default for CheckInWindow {
  fn default() -> Self {
    Self {
      opens_before: Duration::minutes(30),
      closes_after: Duration::minutes(15),
    }
  }
}

impl CheckInWindow {
  pub fn bounds(&self, start: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (start - self.opens_before, start + self.closes_after)
  }

  /// Classify a check-in at `at` for a session starting at `start`.
  pub fn evaluate(
    &self,
    start: DateTime<Utc>,
    at: DateTime<Utc>,
  ) -> Result<AttendanceStatus, WindowViolation> {
    let (earliest, latest) = self.bounds(start);
    if at < earliest {
      Err(WindowViolation::TooEarly { opens_at: earliest })
    } else if at > latest {
      Err(WindowViolation::TooLate { closed_at: latest })
    } else if at <= start {
      Ok(AttendanceStatus::Present)
    } else {
      Ok(AttendanceStatus::Late)
    }
  }
}
