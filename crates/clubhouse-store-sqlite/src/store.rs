//! [`SqliteStore`], the SQLite implementation of the Clubhouse store traits.

use std::path::Path;

use clubhouse_core::{
  actor::ParentLink,
  application::MembershipApplication,
  attendance::{AttendanceRecord, TrainingSession},
  collab::AthleteProfile,
  idempotency::{IdempotencyRecord, Receipt},
  leave::LeaveRequest,
  store::{ClubStore, IdempotencyStore, Outcome},
  workflow::Review,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  encode::{
    encode_dt, encode_entries, encode_entry, encode_review, encode_uuid, RawApplication,
    RawAttendance, RawIdempotency, RawLeaveRequest, RawParentLink, RawProfile, RawSession,
  },
  schema::SCHEMA,
  Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Clubhouse store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Seeding ───────────────────────────────────────────────────────────────
  //
  // Sessions and parent links are owned by other parts of the system; the
  // engine only reads them.

  pub async fn insert_session(&self, session: &TrainingSession) -> Result<()> {
    let id_str    = encode_uuid(session.session_id);
    let club_str  = encode_uuid(session.club_id);
    let title     = session.title.clone();
    let start_str = encode_dt(session.start_time);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO training_sessions (session_id, club_id, title, start_time)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, club_str, title, start_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  pub async fn insert_parent_link(&self, link: &ParentLink) -> Result<()> {
    let id_str      = encode_uuid(link.link_id);
    let parent_str  = encode_uuid(link.parent_id);
    let athlete_str = encode_uuid(link.athlete_id);
    let status      = link.status.as_ref().to_owned();
    let active      = link.active;
    let at_str      = encode_dt(link.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO parent_links (link_id, parent_id, athlete_id, status, active, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, parent_str, athlete_str, status, active, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// All athlete profiles held by `user_id`, across clubs.
  pub async fn profiles_for_user(&self, user_id: Uuid) -> Result<Vec<AthleteProfile>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawProfile> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT profile_id, user_id, club_id, created_at
           FROM athlete_profiles WHERE user_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], profile_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }
}

// ─── Row helpers ─────────────────────────────────────────────────────────────
//
// These run on the connection thread, inside `call` closures.

const APPLICATION_COLUMNS: &str = "application_id, user_id, club_id, personal_info, \
  documents, status, review, profile_id, version, created_at";

const LEAVE_COLUMNS: &str = "leave_request_id, session_id, athlete_id, club_id, \
  requested_by, reason, status, review, version, created_at";

const ATTENDANCE_COLUMNS: &str =
  "record_id, session_id, athlete_id, status, check_in_time, recorded_at";

fn application_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawApplication> {
  Ok(RawApplication {
    application_id: row.get(0)?,
    user_id:        row.get(1)?,
    club_id:        row.get(2)?,
    personal_info:  row.get(3)?,
    documents:      row.get(4)?,
    status:         row.get(5)?,
    review:         row.get(6)?,
    profile_id:     row.get(7)?,
    version:        row.get(8)?,
    created_at:     row.get(9)?,
    log:            Vec::new(),
  })
}

fn leave_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLeaveRequest> {
  Ok(RawLeaveRequest {
    leave_request_id: row.get(0)?,
    session_id:       row.get(1)?,
    athlete_id:       row.get(2)?,
    club_id:          row.get(3)?,
    requested_by:     row.get(4)?,
    reason:           row.get(5)?,
    status:           row.get(6)?,
    review:           row.get(7)?,
    version:          row.get(8)?,
    created_at:       row.get(9)?,
    log:              Vec::new(),
  })
}

fn attendance_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAttendance> {
  Ok(RawAttendance {
    record_id:     row.get(0)?,
    session_id:    row.get(1)?,
    athlete_id:    row.get(2)?,
    status:        row.get(3)?,
    check_in_time: row.get(4)?,
    recorded_at:   row.get(5)?,
  })
}

fn profile_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawProfile> {
  Ok(RawProfile {
    profile_id: row.get(0)?,
    user_id:    row.get(1)?,
    club_id:    row.get(2)?,
    created_at: row.get(3)?,
  })
}

fn load_log(conn: &rusqlite::Connection, entity_id: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt =
    conn.prepare("SELECT entry FROM activity_log WHERE entity_id = ?1 ORDER BY seq")?;
  stmt
    .query_map(rusqlite::params![entity_id], |r| r.get(0))?
    .collect()
}

fn append_entry(
  conn: &rusqlite::Connection,
  entity_id: &str,
  seq: i64,
  entry: &str,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO activity_log (entity_id, seq, entry) VALUES (?1, ?2, ?3)",
    rusqlite::params![entity_id, seq, entry],
  )?;
  Ok(())
}

fn load_application(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawApplication>> {
  let raw = conn
    .query_row(
      &format!("SELECT {APPLICATION_COLUMNS} FROM membership_applications WHERE application_id = ?1"),
      rusqlite::params![id],
      application_from_row,
    )
    .optional()?;
  match raw {
    Some(mut raw) => {
      raw.log = load_log(conn, id)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

fn load_leave_request(
  conn: &rusqlite::Connection,
  id: &str,
) -> rusqlite::Result<Option<RawLeaveRequest>> {
  let raw = conn
    .query_row(
      &format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE leave_request_id = ?1"),
      rusqlite::params![id],
      leave_from_row,
    )
    .optional()?;
  match raw {
    Some(mut raw) => {
      raw.log = load_log(conn, id)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

fn insert_attendance_row(
  conn: &rusqlite::Connection,
  row: &AttendanceRow,
) -> rusqlite::Result<bool> {
  let changed = conn.execute(
    &format!(
      "INSERT INTO attendance ({ATTENDANCE_COLUMNS})
       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
       ON CONFLICT DO NOTHING"
    ),
    rusqlite::params![
      row.record_id,
      row.session_id,
      row.athlete_id,
      row.status,
      row.check_in_time,
      row.recorded_at,
    ],
  )?;
  Ok(changed == 1)
}

/// Carry a decode or encode failure out of a `call` closure.
fn in_call(e: impl Into<crate::Error>) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e.into()))
}

/// An attendance record in column form.
struct AttendanceRow {
  record_id:     String,
  session_id:    String,
  athlete_id:    String,
  status:        String,
  check_in_time: Option<String>,
  recorded_at:   String,
}

impl AttendanceRow {
  fn new(record: &AttendanceRecord) -> Self {
    Self {
      record_id:     encode_uuid(record.record_id),
      session_id:    encode_uuid(record.session_id),
      athlete_id:    encode_uuid(record.athlete_id),
      status:        record.status.as_ref().to_owned(),
      check_in_time: record.check_in_time.map(encode_dt),
      recorded_at:   encode_dt(record.recorded_at),
    }
  }
}

/// A gatekeeper receipt in column form.
struct ReceiptRow {
  key:          String,
  operation_id: String,
  created_at:   String,
}

impl ReceiptRow {
  fn new(receipt: Receipt) -> Self {
    Self {
      key:          receipt.key,
      operation_id: receipt.operation_id,
      created_at:   encode_dt(receipt.issued_at),
    }
  }

  /// Cache `result_json` under this receipt. `false` if the pair already has
  /// a record, in which case the caller must roll back.
  fn record(&self, conn: &rusqlite::Connection, result_json: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
      "INSERT INTO idempotency_records (key, operation_id, result, created_at)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT DO NOTHING",
      rusqlite::params![self.key, self.operation_id, result_json, self.created_at],
    )?;
    Ok(changed == 1)
  }
}

// ─── ClubStore impl ──────────────────────────────────────────────────────────

impl ClubStore for SqliteStore {
  type Error = crate::Error;

  // ── Lookups ───────────────────────────────────────────────────────────────

  async fn get_session(&self, session_id: Uuid) -> Result<Option<TrainingSession>> {
    let id_str = encode_uuid(session_id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT session_id, club_id, title, start_time
             FROM training_sessions WHERE session_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawSession {
                session_id: row.get(0)?,
                club_id:    row.get(1)?,
                title:      row.get(2)?,
                start_time: row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn parent_links(&self, parent_id: Uuid) -> Result<Vec<ParentLink>> {
    let parent_str = encode_uuid(parent_id);

    let raws: Vec<RawParentLink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT link_id, parent_id, athlete_id, status, active, created_at
           FROM parent_links WHERE parent_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![parent_str], |row| {
            Ok(RawParentLink {
              link_id:    row.get(0)?,
              parent_id:  row.get(1)?,
              athlete_id: row.get(2)?,
              status:     row.get(3)?,
              active:     row.get(4)?,
              created_at: row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawParentLink::into_link).collect()
  }

  // ── Membership applications ───────────────────────────────────────────────

  async fn insert_application(
    &self,
    application: MembershipApplication,
    receipt: Receipt,
  ) -> Result<Outcome<MembershipApplication>> {
    let id_str        = encode_uuid(application.application_id);
    let user_str      = encode_uuid(application.user_id);
    let club_str      = encode_uuid(application.club_id);
    let info_json     = serde_json::to_string(&application.personal_info)?;
    let docs_json     = serde_json::to_string(&application.documents)?;
    let status        = application.status.as_ref().to_owned();
    let review_json   = encode_review(application.review.as_ref())?;
    let profile_str   = application.profile_id.map(encode_uuid);
    let version       = application.version;
    let created_str   = encode_dt(application.created_at);
    let entries       = encode_entries(&application.activity_log)?;
    let result_json   = serde_json::to_string(&application)?;
    let receipt       = ReceiptRow::new(receipt);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "INSERT INTO membership_applications (
             application_id, user_id, club_id, personal_info, documents,
             status, review, profile_id, version, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT DO NOTHING",
          rusqlite::params![
            id_str,
            user_str,
            club_str,
            info_json,
            docs_json,
            status,
            review_json,
            profile_str,
            version,
            created_str,
          ],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        for (seq, entry) in entries.iter().enumerate() {
          append_entry(&tx, &id_str, seq as i64, entry)?;
        }
        if !receipt.record(&tx, &result_json)? {
          return Ok(false);
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if inserted { Outcome::Committed(application) } else { Outcome::Duplicate })
  }

  async fn get_application(
    &self,
    application_id: Uuid,
  ) -> Result<Option<MembershipApplication>> {
    let id_str = encode_uuid(application_id);

    let raw = self
      .conn
      .call(move |conn| Ok(load_application(conn, &id_str)?))
      .await?;

    raw.map(RawApplication::into_application).transpose()
  }

  async fn list_applications(
    &self,
    club_id: Option<Uuid>,
  ) -> Result<Vec<MembershipApplication>> {
    let club_str = club_id.map(encode_uuid);

    let raws: Vec<RawApplication> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {APPLICATION_COLUMNS} FROM membership_applications
           WHERE ?1 IS NULL OR club_id = ?1
           ORDER BY created_at, rowid"
        ))?;
        let mut rows = stmt
          .query_map(rusqlite::params![club_str], application_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          raw.log = load_log(conn, &raw.application_id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApplication::into_application).collect()
  }

  async fn commit_application_review(
    &self,
    review: Review,
    profile: Option<AthleteProfile>,
    receipt: Receipt,
  ) -> Result<Outcome<MembershipApplication>> {
    let id_str      = encode_uuid(review.entity_id);
    let status      = review.to.as_ref().to_owned();
    let review_json = encode_review(Some(&review.info))?;
    let seq         = review.seq as i64;
    let expected    = review.expected_version;
    let entry       = review.entry;
    let profile_row = profile.map(|p| {
      (
        encode_uuid(p.profile_id),
        encode_uuid(p.user_id),
        encode_uuid(p.club_id),
        encode_dt(p.created_at),
      )
    });
    let receipt     = ReceiptRow::new(receipt);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE membership_applications
              SET status = ?1, review = ?2, version = version + 1
            WHERE application_id = ?3 AND version = ?4 AND status = 'pending'",
          rusqlite::params![status, review_json, id_str, expected],
        )?;
        if changed == 0 {
          return Ok(Outcome::Stale);
        }

        let mut entry = entry;
        if let Some((profile_id, user_id, club_id, created_at)) = profile_row {
          tx.execute(
            "INSERT INTO athlete_profiles (profile_id, user_id, club_id, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, club_id) DO NOTHING",
            rusqlite::params![profile_id, user_id, club_id, created_at],
          )?;
          let linked: String = tx.query_row(
            "SELECT profile_id FROM athlete_profiles WHERE user_id = ?1 AND club_id = ?2",
            rusqlite::params![user_id, club_id],
            |r| r.get(0),
          )?;
          tx.execute(
            "UPDATE membership_applications SET profile_id = ?1 WHERE application_id = ?2",
            rusqlite::params![linked, id_str],
          )?;
          entry = entry.with_detail("profile_id", linked);
        }

        append_entry(&tx, &id_str, seq, &encode_entry(&entry).map_err(in_call)?)?;
        let application = load_application(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?
          .into_application()
          .map_err(in_call)?;
        let result_json = serde_json::to_string(&application).map_err(in_call)?;
        if !receipt.record(&tx, &result_json)? {
          // Dropping `tx` rolls the transition and the profile back.
          return Ok(Outcome::Duplicate);
        }
        tx.commit()?;
        Ok(Outcome::Committed(application))
      })
      .await?;

    Ok(outcome)
  }

  // ── Leave requests ────────────────────────────────────────────────────────

  async fn insert_leave_request(
    &self,
    request: LeaveRequest,
    receipt: Receipt,
  ) -> Result<Outcome<LeaveRequest>> {
    let id_str       = encode_uuid(request.leave_request_id);
    let session_str  = encode_uuid(request.session_id);
    let athlete_str  = encode_uuid(request.athlete_id);
    let club_str     = encode_uuid(request.club_id);
    let by_str       = encode_uuid(request.requested_by);
    let reason       = request.reason.clone();
    let status       = request.status.as_ref().to_owned();
    let review_json  = encode_review(request.review.as_ref())?;
    let version      = request.version;
    let created_str  = encode_dt(request.created_at);
    let entries      = encode_entries(&request.activity_log)?;
    let result_json  = serde_json::to_string(&request)?;
    let receipt      = ReceiptRow::new(receipt);

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "INSERT INTO leave_requests (
             leave_request_id, session_id, athlete_id, club_id, requested_by,
             reason, status, review, version, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
           ON CONFLICT DO NOTHING",
          rusqlite::params![
            id_str,
            session_str,
            athlete_str,
            club_str,
            by_str,
            reason,
            status,
            review_json,
            version,
            created_str,
          ],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        for (seq, entry) in entries.iter().enumerate() {
          append_entry(&tx, &id_str, seq as i64, entry)?;
        }
        if !receipt.record(&tx, &result_json)? {
          return Ok(false);
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if inserted { Outcome::Committed(request) } else { Outcome::Duplicate })
  }

  async fn get_leave_request(&self, leave_request_id: Uuid) -> Result<Option<LeaveRequest>> {
    let id_str = encode_uuid(leave_request_id);

    let raw = self
      .conn
      .call(move |conn| Ok(load_leave_request(conn, &id_str)?))
      .await?;

    raw.map(RawLeaveRequest::into_leave_request).transpose()
  }

  async fn commit_leave_review(
    &self,
    review: Review,
    excused: Option<AttendanceRecord>,
    receipt: Receipt,
  ) -> Result<Outcome<LeaveRequest>> {
    let id_str      = encode_uuid(review.entity_id);
    let status      = review.to.as_ref().to_owned();
    let review_json = encode_review(Some(&review.info))?;
    let entry_json  = encode_entry(&review.entry)?;
    let seq         = review.seq as i64;
    let expected    = review.expected_version;
    let excused_row = excused.as_ref().map(AttendanceRow::new);
    let receipt     = ReceiptRow::new(receipt);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE leave_requests
              SET status = ?1, review = ?2, version = version + 1
            WHERE leave_request_id = ?3 AND version = ?4 AND status = 'pending'",
          rusqlite::params![status, review_json, id_str, expected],
        )?;
        if changed == 0 {
          return Ok(Outcome::Stale);
        }

        if let Some(row) = &excused_row {
          if !insert_attendance_row(&tx, row)? {
            // Dropping `tx` rolls the status update back.
            return Ok(Outcome::Duplicate);
          }
        }

        append_entry(&tx, &id_str, seq, &entry_json)?;
        let request = load_leave_request(&tx, &id_str)?
          .ok_or(rusqlite::Error::QueryReturnedNoRows)?
          .into_leave_request()
          .map_err(in_call)?;
        let result_json = serde_json::to_string(&request).map_err(in_call)?;
        if !receipt.record(&tx, &result_json)? {
          return Ok(Outcome::Duplicate);
        }
        tx.commit()?;
        Ok(Outcome::Committed(request))
      })
      .await?;

    Ok(outcome)
  }

  // ── Attendance ────────────────────────────────────────────────────────────

  async fn insert_attendance(
    &self,
    record: AttendanceRecord,
    receipt: Receipt,
  ) -> Result<Outcome<AttendanceRecord>> {
    let row         = AttendanceRow::new(&record);
    let result_json = serde_json::to_string(&record)?;
    let receipt     = ReceiptRow::new(receipt);

    // The UNIQUE (session_id, athlete_id) constraint picks exactly one
    // winner among concurrent check-ins.
    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !insert_attendance_row(&tx, &row)? || !receipt.record(&tx, &result_json)? {
          return Ok(false);
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if inserted { Outcome::Committed(record) } else { Outcome::Duplicate })
  }

  async fn list_attendance(&self, session_id: Uuid) -> Result<Vec<AttendanceRecord>> {
    let session_str = encode_uuid(session_id);

    let raws: Vec<RawAttendance> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTENDANCE_COLUMNS} FROM attendance
           WHERE session_id = ?1 ORDER BY recorded_at, rowid"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![session_str], attendance_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttendance::into_record).collect()
  }
}

// ─── IdempotencyStore impl ───────────────────────────────────────────────────

impl IdempotencyStore for SqliteStore {
  type Error = crate::Error;

  async fn get_idempotency(
    &self,
    key: String,
    operation_id: String,
  ) -> Result<Option<IdempotencyRecord>> {
    let raw: Option<RawIdempotency> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT key, operation_id, result, created_at
             FROM idempotency_records WHERE key = ?1 AND operation_id = ?2",
            rusqlite::params![key, operation_id],
            |row| {
              Ok(RawIdempotency {
                key:          row.get(0)?,
                operation_id: row.get(1)?,
                result:       row.get(2)?,
                created_at:   row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawIdempotency::into_record).transpose()
  }
}
