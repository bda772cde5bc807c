//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanosecond
//! precision, `Z` suffix) so they sort lexically. Structured fields are
//! compact JSON. Enums use their lowercase string form.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use clubhouse_core::{
  activity::{ActivityLog, ActivityLogEntry},
  actor::ParentLink,
  application::MembershipApplication,
  attendance::{AttendanceRecord, TrainingSession},
  collab::AthleteProfile,
  idempotency::IdempotencyRecord,
  leave::LeaveRequest,
  workflow::ReviewInfo,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownVariant { column, value: s.to_owned() })
}

pub fn encode_review(review: Option<&ReviewInfo>) -> Result<Option<String>> {
  review.map(serde_json::to_string).transpose().map_err(Error::from)
}

fn decode_review(s: Option<&str>) -> Result<Option<ReviewInfo>> {
  s.map(serde_json::from_str).transpose().map_err(Error::from)
}

pub fn encode_entries(log: &ActivityLog) -> Result<Vec<String>> {
  log
    .entries()
    .iter()
    .map(|e| serde_json::to_string(e).map_err(Error::from))
    .collect()
}

pub fn encode_entry(entry: &ActivityLogEntry) -> Result<String> {
  Ok(serde_json::to_string(entry)?)
}

fn decode_log(entries: &[String]) -> Result<ActivityLog> {
  let entries = entries
    .iter()
    .map(|s| serde_json::from_str(s))
    .collect::<serde_json::Result<Vec<ActivityLogEntry>>>()?;
  Ok(ActivityLog::from_entries(entries))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from a `membership_applications` row plus its log.
pub struct RawApplication {
  pub application_id: String,
  pub user_id:        String,
  pub club_id:        String,
  pub personal_info:  String,
  pub documents:      String,
  pub status:         String,
  pub review:         Option<String>,
  pub profile_id:     Option<String>,
  pub version:        i64,
  pub created_at:     String,
  pub log:            Vec<String>,
}

impl RawApplication {
  pub fn into_application(self) -> Result<MembershipApplication> {
    Ok(MembershipApplication {
      application_id: decode_uuid(&self.application_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      club_id:        decode_uuid(&self.club_id)?,
      personal_info:  serde_json::from_str(&self.personal_info)?,
      documents:      serde_json::from_str(&self.documents)?,
      status:         decode_enum("status", &self.status)?,
      review:         decode_review(self.review.as_deref())?,
      activity_log:   decode_log(&self.log)?,
      profile_id:     self.profile_id.as_deref().map(decode_uuid).transpose()?,
      version:        self.version,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read from a `leave_requests` row plus its log.
pub struct RawLeaveRequest {
  pub leave_request_id: String,
  pub session_id:       String,
  pub athlete_id:       String,
  pub club_id:          String,
  pub requested_by:     String,
  pub reason:           String,
  pub status:           String,
  pub review:           Option<String>,
  pub version:          i64,
  pub created_at:       String,
  pub log:              Vec<String>,
}

impl RawLeaveRequest {
  pub fn into_leave_request(self) -> Result<LeaveRequest> {
    Ok(LeaveRequest {
      leave_request_id: decode_uuid(&self.leave_request_id)?,
      session_id:       decode_uuid(&self.session_id)?,
      athlete_id:       decode_uuid(&self.athlete_id)?,
      club_id:          decode_uuid(&self.club_id)?,
      requested_by:     decode_uuid(&self.requested_by)?,
      reason:           self.reason,
      status:           decode_enum("status", &self.status)?,
      review:           decode_review(self.review.as_deref())?,
      activity_log:     decode_log(&self.log)?,
      version:          self.version,
      created_at:       decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAttendance {
  pub record_id:     String,
  pub session_id:    String,
  pub athlete_id:    String,
  pub status:        String,
  pub check_in_time: Option<String>,
  pub recorded_at:   String,
}

impl RawAttendance {
  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      record_id:     decode_uuid(&self.record_id)?,
      session_id:    decode_uuid(&self.session_id)?,
      athlete_id:    decode_uuid(&self.athlete_id)?,
      status:        decode_enum("attendance status", &self.status)?,
      check_in_time: self.check_in_time.as_deref().map(decode_dt).transpose()?,
      recorded_at:   decode_dt(&self.recorded_at)?,
    })
  }
}

pub struct RawSession {
  pub session_id: String,
  pub club_id:    String,
  pub title:      String,
  pub start_time: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<TrainingSession> {
    Ok(TrainingSession {
      session_id: decode_uuid(&self.session_id)?,
      club_id:    decode_uuid(&self.club_id)?,
      title:      self.title,
      start_time: decode_dt(&self.start_time)?,
    })
  }
}

pub struct RawParentLink {
  pub link_id:    String,
  pub parent_id:  String,
  pub athlete_id: String,
  pub status:     String,
  pub active:     bool,
  pub created_at: String,
}

impl RawParentLink {
  pub fn into_link(self) -> Result<ParentLink> {
    Ok(ParentLink {
      link_id:    decode_uuid(&self.link_id)?,
      parent_id:  decode_uuid(&self.parent_id)?,
      athlete_id: decode_uuid(&self.athlete_id)?,
      status:     decode_enum("link status", &self.status)?,
      active:     self.active,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawProfile {
  pub profile_id: String,
  pub user_id:    String,
  pub club_id:    String,
  pub created_at: String,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<AthleteProfile> {
    Ok(AthleteProfile {
      profile_id: decode_uuid(&self.profile_id)?,
      user_id:    decode_uuid(&self.user_id)?,
      club_id:    decode_uuid(&self.club_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawIdempotency {
  pub key:          String,
  pub operation_id: String,
  pub result:       String,
  pub created_at:   String,
}

impl RawIdempotency {
  pub fn into_record(self) -> Result<IdempotencyRecord> {
    Ok(IdempotencyRecord {
      key:          self.key,
      operation_id: self.operation_id,
      result:       serde_json::from_str(&self.result)?,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2025, 1, 1, 9, 0, 0).unwrap();
    let b = a + chrono::Duration::nanoseconds(1500);
    assert!(encode_dt(a) < encode_dt(b));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn unknown_enum_value_is_reported() {
    let err = decode_enum::<clubhouse_core::workflow::ReviewStatus>("status", "limbo")
      .unwrap_err();
    assert!(matches!(err, Error::UnknownVariant { column: "status", .. }));
  }
}
