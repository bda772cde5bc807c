//! Leave requests: an athlete asking to be excused from a training session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  access::Resource,
  activity::ActivityLog,
  validate::{self, MAX_TEXT_LEN},
  workflow::{ReviewInfo, ReviewStatus, WorkflowEntity},
  Result,
};

/// Unique per `(session_id, athlete_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRequest {
  pub leave_request_id: Uuid,
  pub session_id:       Uuid,
  pub athlete_id:       Uuid,
  /// Copied from the session at submission.
  pub club_id:          Uuid,
  pub requested_by:     Uuid,
  pub reason:           String,
  pub status:           ReviewStatus,
  pub review:           Option<ReviewInfo>,
  pub activity_log:     ActivityLog,
  pub version:          i64,
  pub created_at:       DateTime<Utc>,
}

impl WorkflowEntity for LeaveRequest {
  const KIND: &'static str = "leave request";

  fn id(&self) -> Uuid { self.leave_request_id }

  fn status(&self) -> ReviewStatus { self.status }

  fn version(&self) -> i64 { self.version }

  fn activity_log(&self) -> &ActivityLog { &self.activity_log }

  fn resource(&self) -> Resource {
    Resource::about(self.club_id, self.athlete_id)
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLeaveRequest {
  pub session_id: Uuid,
  pub athlete_id: Uuid,
  pub reason:     String,
}

impl NewLeaveRequest {
  pub fn validate(&self) -> Result<()> {
    validate::required("reason", &self.reason)
      .and(validate::max_len("reason", &self.reason, MAX_TEXT_LEN))
      .into_result()
  }
}
