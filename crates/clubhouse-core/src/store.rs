//! Storage traits and the outcome type for conditional writes.
//!
//! Traits are implemented by storage backends (e.g. `clubhouse-store-sqlite`).
//! The engine depends on these abstractions, not on any concrete backend.
//!
//! Every write is a single atomic conditional operation. A lost race is not
//! an error at this layer: it is reported as [`Outcome::Duplicate`] (a unique
//! key already exists) or [`Outcome::Stale`] (the row version moved), and the
//! engine translates it into a domain error.
//!
//! Every mutating method takes the gatekeeper's [`Receipt`] and records the
//! committed value under it in the same transaction. If the receipt's pair is
//! already recorded the whole write is rolled back and reported as
//! [`Outcome::Duplicate`].

use std::future::Future;

use uuid::Uuid;

use crate::{
  actor::ParentLink,
  application::MembershipApplication,
  attendance::{AttendanceRecord, TrainingSession},
  collab::AthleteProfile,
  idempotency::{IdempotencyRecord, Receipt},
  leave::LeaveRequest,
  workflow::Review,
};

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
  Committed(T),
  /// A uniqueness constraint rejected the write. Nothing was changed.
  Duplicate,
  /// The compare-and-swap precondition failed. Nothing was changed.
  Stale,
}

impl<T> Outcome<T> {
  pub fn committed(self) -> Option<T> {
    match self {
      Self::Committed(t) => Some(t),
      _ => None,
    }
  }
}

/// Abstraction over the club data store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ClubStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Lookups ───────────────────────────────────────────────────────────

  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<TrainingSession>, Self::Error>> + Send + '_;

  /// All links held by `parent_id`, in any status.
  fn parent_links(
    &self,
    parent_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ParentLink>, Self::Error>> + Send + '_;

  // ── Membership applications ───────────────────────────────────────────

  /// Insert a new application together with its initial activity log.
  /// [`Outcome::Duplicate`] if `(user_id, club_id)` already applied.
  fn insert_application(
    &self,
    application: MembershipApplication,
    receipt: Receipt,
  ) -> impl Future<Output = Result<Outcome<MembershipApplication>, Self::Error>>
  + Send
  + '_;

  fn get_application(
    &self,
    application_id: Uuid,
  ) -> impl Future<Output = Result<Option<MembershipApplication>, Self::Error>>
  + Send
  + '_;

  /// List applications, optionally restricted to one club, oldest first.
  fn list_applications(
    &self,
    club_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<MembershipApplication>, Self::Error>>
  + Send
  + '_;

  /// Apply `review` if the row is still pending at `review.expected_version`,
  /// appending `review.entry`, all in one commit.
  ///
  /// When `profile` is given the applicant's profile for the club is created
  /// from it, or the existing one reused, and linked to the application in
  /// the same commit. The entry records the linked `profile_id`. Nothing is
  /// provisioned unless the transition commits.
  fn commit_application_review(
    &self,
    review: Review,
    profile: Option<AthleteProfile>,
    receipt: Receipt,
  ) -> impl Future<Output = Result<Outcome<MembershipApplication>, Self::Error>>
  + Send
  + '_;

  // ── Leave requests ────────────────────────────────────────────────────

  /// [`Outcome::Duplicate`] if `(session_id, athlete_id)` already has one.
  fn insert_leave_request(
    &self,
    request: LeaveRequest,
    receipt: Receipt,
  ) -> impl Future<Output = Result<Outcome<LeaveRequest>, Self::Error>> + Send + '_;

  fn get_leave_request(
    &self,
    leave_request_id: Uuid,
  ) -> impl Future<Output = Result<Option<LeaveRequest>, Self::Error>> + Send + '_;

  /// Apply `review` under the same precondition as
  /// [`commit_application_review`](Self::commit_application_review). When
  /// `excused` is given it is inserted in the same commit;
  /// [`Outcome::Duplicate`] if attendance already exists for the pair, in
  /// which case the request is left untouched.
  fn commit_leave_review(
    &self,
    review: Review,
    excused: Option<AttendanceRecord>,
    receipt: Receipt,
  ) -> impl Future<Output = Result<Outcome<LeaveRequest>, Self::Error>> + Send + '_;

  // ── Attendance ────────────────────────────────────────────────────────

  /// Conditional insert; [`Outcome::Duplicate`] if the pair already has a
  /// record.
  fn insert_attendance(
    &self,
    record: AttendanceRecord,
    receipt: Receipt,
  ) -> impl Future<Output = Result<Outcome<AttendanceRecord>, Self::Error>> + Send + '_;

  fn list_attendance(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;
}

/// Read access to idempotency records. They are written by the
/// [`ClubStore`] methods that take a [`Receipt`].
pub trait IdempotencyStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn get_idempotency(
    &self,
    key: String,
    operation_id: String,
  ) -> impl Future<Output = Result<Option<IdempotencyRecord>, Self::Error>> + Send + '_;
}
