//! Check-in and attendance reads.

use uuid::Uuid;

use super::{missing, Call, Engine, Reply};
use crate::{
  access::{Action, Resource},
  actor::Role,
  attendance::AttendanceRecord,
  collab::{Notification, NotificationKind, Notifier},
  store::{ClubStore, IdempotencyStore, Outcome},
  Error, Result,
};

const SESSION: &str = "training session";

impl<S, N> Engine<S, N>
where
  S: ClubStore + IdempotencyStore,
  N: Notifier,
{
  /// Record `athlete_id` as present or late for `session_id` at the current
  /// clock time.
  pub async fn check_in(
    &self,
    call: &Call,
    session_id: Uuid,
    athlete_id: Uuid,
  ) -> Result<Reply<AttendanceRecord>> {
    let target = [session_id, athlete_id];
    self
      .mutate(call, "attendance.check_in", &target, move |step, receipt| async move {
        let actor = &call.actor;
        let session = self
          .store
          .get_session(session_id)
          .await
          .map_err(Error::storage)?
          .ok_or_else(|| missing(actor, SESSION))?;
        self
          .authorize(actor, Action::CheckIn, &Resource::about(session.club_id, athlete_id))
          .await?;

        let now = self.clock.now();
        let status = self
          .config
          .check_in
          .evaluate(session.start_time, now)
          .map_err(Error::TimeWindow)?;

        let record = AttendanceRecord::checked_in(session_id, athlete_id, status, now);
        let record = match self
          .store
          .insert_attendance(record, receipt)
          .await
          .map_err(Error::storage)?
        {
          Outcome::Committed(r) => r,
          Outcome::Duplicate | Outcome::Stale => return Err(Error::AlreadyCheckedIn),
        };

        tracing::info!(%session_id, %athlete_id, status = %record.status, "checked in");
        self
          .notify(Notification {
            kind:           NotificationKind::CheckedIn,
            recipient:      athlete_id,
            entity_id:      record.record_id,
            status:         record.status.to_string(),
            correlation_id: step.correlation_id,
          })
          .await;

        Ok(record)
      })
      .await
  }

  /// Attendance for a session. Staff see every record; athletes and parents
  /// only the ones they may read.
  pub async fn list_attendance(
    &self,
    call: &Call,
    session_id: Uuid,
  ) -> Result<Reply<Vec<AttendanceRecord>>> {
    self
      .read(call, "attendance.list", |_| async move {
        let actor = &call.actor;
        let session = self
          .store
          .get_session(session_id)
          .await
          .map_err(Error::storage)?
          .ok_or_else(|| missing(actor, SESSION))?;

        if matches!(actor.role, Role::Admin | Role::Coach) {
          self.authorize(actor, Action::Read, &Resource::club(session.club_id)).await?;
        }

        let records = self
          .store
          .list_attendance(session_id)
          .await
          .map_err(Error::storage)?;
        self
          .visible(actor, records, |r| Resource::about(session.club_id, r.athlete_id))
          .await
      })
      .await
  }
}
