//! The append-only activity log attached to workflow entities.
//!
//! Entries are never edited or removed. [`ActivityLog`] exposes no mutation
//! other than [`ActivityLog::append`], and storage backends persist each
//! entry as its own row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::workflow::ReviewStatus;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActivityAction {
  Submitted,
  StatusChanged,
}

/// One audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
  pub action:    ActivityAction,
  pub by_user:   Uuid,
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub from:      Option<ReviewStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub to:        Option<ReviewStatus>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes:     Option<String>,
  #[serde(default, skip_serializing_if = "Map::is_empty")]
  pub details:   Map<String, Value>,
}

impl ActivityLogEntry {
  pub fn submitted(by_user: Uuid, timestamp: DateTime<Utc>) -> Self {
    Self {
      action: ActivityAction::Submitted,
      by_user,
      timestamp,
      from: None,
      to: None,
      notes: None,
      details: Map::new(),
    }
  }

  pub fn status_changed(
    by_user: Uuid,
    timestamp: DateTime<Utc>,
    from: ReviewStatus,
    to: ReviewStatus,
    notes: Option<String>,
  ) -> Self {
    Self {
      action: ActivityAction::StatusChanged,
      by_user,
      timestamp,
      from: Some(from),
      to: Some(to),
      notes,
      details: Map::new(),
    }
  }

  pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
    self.details.insert(key.to_owned(), value.into());
    self
  }
}

/// An ordered, append-only list of [`ActivityLogEntry`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLog(Vec<ActivityLogEntry>);

impl ActivityLog {
  pub fn new() -> Self { Self::default() }

  /// Rebuild a log from persisted entries, in sequence order.
  pub fn from_entries(entries: Vec<ActivityLogEntry>) -> Self { Self(entries) }

  pub fn append(&mut self, entry: ActivityLogEntry) { self.0.push(entry); }

  pub fn entries(&self) -> &[ActivityLogEntry] { &self.0 }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn last(&self) -> Option<&ActivityLogEntry> { self.0.last() }

  /// Whether every entry of `earlier` appears unchanged at the start of
  /// this log.
  pub fn extends(&self, earlier: &ActivityLog) -> bool {
    self.0.starts_with(&earlier.0)
  }
}
