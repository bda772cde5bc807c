//! Membership applications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
  access::Resource,
  activity::ActivityLog,
  validate::{self, MAX_DOCUMENTS, MAX_TEXT_LEN},
  workflow::{ReviewInfo, ReviewStatus, WorkflowEntity},
  Result,
};

/// A reference to an uploaded document. File storage itself lives elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
  pub name: String,
  pub uri:  String,
}

/// An athlete's request to join a club. Unique per `(user_id, club_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MembershipApplication {
  pub application_id: Uuid,
  pub user_id:        Uuid,
  pub club_id:        Uuid,
  pub personal_info:  Value,
  pub documents:      Vec<DocumentRef>,
  pub status:         ReviewStatus,
  pub review:         Option<ReviewInfo>,
  pub activity_log:   ActivityLog,
  /// Set only on approval.
  pub profile_id:     Option<Uuid>,
  /// Row version; bumped on every committed transition.
  pub version:        i64,
  pub created_at:     DateTime<Utc>,
}

impl WorkflowEntity for MembershipApplication {
  const KIND: &'static str = "membership application";

  fn id(&self) -> Uuid { self.application_id }

  fn status(&self) -> ReviewStatus { self.status }

  fn version(&self) -> i64 { self.version }

  fn activity_log(&self) -> &ActivityLog { &self.activity_log }

  fn resource(&self) -> Resource { Resource::about(self.club_id, self.user_id) }
}

/// Input to [`Engine::submit_application`](crate::engine::Engine::submit_application).
/// The applicant is always the calling actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplication {
  pub club_id:       Uuid,
  pub personal_info: Value,
  #[serde(default)]
  pub documents:     Vec<DocumentRef>,
}

impl NewApplication {
  pub fn validate(&self) -> Result<()> {
    let mut check = validate::object("personal_info", &self.personal_info)
      .and(validate::max_items("documents", self.documents.len(), MAX_DOCUMENTS));
    for doc in &self.documents {
      check = check
        .and(validate::required("document name", &doc.name))
        .and(validate::required("document uri", &doc.uri))
        .and(validate::max_len("document uri", &doc.uri, MAX_TEXT_LEN));
    }
    check.into_result()
  }
}
