//! Leave request operations.

use uuid::Uuid;

use super::{missing, Call, Engine, Reply};
use crate::{
  access::{Action, Resource},
  activity::{ActivityLog, ActivityLogEntry},
  attendance::AttendanceRecord,
  collab::{Notification, NotificationKind, Notifier},
  leave::{LeaveRequest, NewLeaveRequest},
  store::{ClubStore, IdempotencyStore, Outcome},
  workflow::{plan_review, ReviewDecision, ReviewStatus, WorkflowEntity},
  Error, Result,
};

const LEAVE_REQUEST: &str = "leave request";
const SESSION: &str = "training session";

impl<S, N> Engine<S, N>
where
  S: ClubStore + IdempotencyStore,
  N: Notifier,
{
  /// File a leave request for an athlete. Parents may file for linked
  /// athletes, coaches for anyone in their club.
  pub async fn submit_leave_request(
    &self,
    call: &Call,
    input: NewLeaveRequest,
  ) -> Result<Reply<LeaveRequest>> {
    let target = [input.session_id, input.athlete_id];
    self
      .mutate(call, "leave.submit", &target, move |step, receipt| async move {
        input.validate()?;
        let actor = &call.actor;

        let session = self
          .store
          .get_session(input.session_id)
          .await
          .map_err(Error::storage)?
          .ok_or_else(|| missing(actor, SESSION))?;
        self
          .authorize(
            actor,
            Action::RequestLeave,
            &Resource::about(session.club_id, input.athlete_id),
          )
          .await?;

        let now = self.clock.now();
        let deadline = session.start_time - self.config.leave_min_lead;
        if now >= deadline {
          return Err(Error::Validation(format!(
            "leave must be requested before {deadline}"
          )));
        }

        let mut activity_log = ActivityLog::new();
        activity_log.append(
          ActivityLogEntry::submitted(actor.id, now)
            .with_detail("athlete_id", input.athlete_id.to_string()),
        );

        let request = LeaveRequest {
          leave_request_id: Uuid::new_v4(),
          session_id: session.session_id,
          athlete_id: input.athlete_id,
          club_id: session.club_id,
          requested_by: actor.id,
          reason: input.reason.trim().to_owned(),
          status: ReviewStatus::Pending,
          review: None,
          activity_log,
          version: 0,
          created_at: now,
        };

        let request = match self
          .store
          .insert_leave_request(request, receipt)
          .await
          .map_err(Error::storage)?
        {
          Outcome::Committed(r) => r,
          Outcome::Duplicate | Outcome::Stale => {
            return Err(Error::Conflict(
              "a leave request for this session already exists".into(),
            ));
          }
        };

        tracing::info!(leave_request_id = %request.leave_request_id, "leave requested");
        self
          .notify(Notification {
            kind:           NotificationKind::LeaveRequested,
            recipient:      request.athlete_id,
            entity_id:      request.leave_request_id,
            status:         request.status.to_string(),
            correlation_id: step.correlation_id,
          })
          .await;

        Ok(request)
      })
      .await
  }

  pub async fn approve_leave_request(
    &self,
    call: &Call,
    leave_request_id: Uuid,
    notes: Option<String>,
  ) -> Result<Reply<LeaveRequest>> {
    self
      .review_leave_request(
        call,
        "leave.approve",
        leave_request_id,
        ReviewDecision::Approve { notes },
      )
      .await
  }

  pub async fn reject_leave_request(
    &self,
    call: &Call,
    leave_request_id: Uuid,
    reason: String,
  ) -> Result<Reply<LeaveRequest>> {
    self
      .review_leave_request(
        call,
        "leave.reject",
        leave_request_id,
        ReviewDecision::Reject { reason },
      )
      .await
  }

  async fn review_leave_request(
    &self,
    call: &Call,
    operation: &'static str,
    leave_request_id: Uuid,
    decision: ReviewDecision,
  ) -> Result<Reply<LeaveRequest>> {
    self
      .mutate(call, operation, &[leave_request_id], move |step, receipt| async move {
        decision.validate()?;
        let actor = &call.actor;

        let current = self
          .store
          .get_leave_request(leave_request_id)
          .await
          .map_err(Error::storage)?
          .ok_or_else(|| missing(actor, LEAVE_REQUEST))?;
        self.authorize(actor, Action::Review, &current.resource()).await?;

        let now = self.clock.now();
        let review = plan_review(&current, decision, actor, now)?;
        let excused = (review.to == ReviewStatus::Approved)
          .then(|| AttendanceRecord::excused(current.session_id, current.athlete_id, now));

        let updated = match self
          .store
          .commit_leave_review(review, excused, receipt)
          .await
          .map_err(Error::storage)?
        {
          Outcome::Committed(r) => r,
          Outcome::Duplicate => {
            return Err(Error::Conflict(
              "attendance is already recorded for this session".into(),
            ));
          }
          Outcome::Stale => {
            return Err(Error::InvalidState(format!(
              "{LEAVE_REQUEST} {leave_request_id} was reviewed concurrently"
            )));
          }
        };

        tracing::info!(
          leave_request_id = %updated.leave_request_id,
          status = %updated.status,
          "leave request reviewed"
        );
        self
          .notify(Notification {
            kind:           NotificationKind::LeaveReviewed,
            recipient:      updated.athlete_id,
            entity_id:      updated.leave_request_id,
            status:         updated.status.to_string(),
            correlation_id: step.correlation_id,
          })
          .await;

        Ok(updated)
      })
      .await
  }

  pub async fn get_leave_request(
    &self,
    call: &Call,
    leave_request_id: Uuid,
  ) -> Result<Reply<LeaveRequest>> {
    self
      .read(call, "leave.get", |_| async move {
        let actor = &call.actor;
        let request = self
          .store
          .get_leave_request(leave_request_id)
          .await
          .map_err(Error::storage)?
          .ok_or_else(|| missing(actor, LEAVE_REQUEST))?;
        self.authorize(actor, Action::Read, &request.resource()).await?;
        Ok(request)
      })
      .await
  }
}
