use chrono::Duration;
use clubhouse_core::{
  activity::ActivityAction,
  actor::Actor,
  attendance::AttendanceStatus,
  leave::{LeaveRequest, NewLeaveRequest},
  store::ClubStore as _,
  workflow::ReviewStatus,
  ErrorKind,
};
use uuid::Uuid;

use super::{harness, kind_of, session_start, Harness};

fn leave_for(h: &Harness, athlete: &Actor) -> NewLeaveRequest {
  NewLeaveRequest {
    session_id: h.session.session_id,
    athlete_id: athlete.id,
    reason:     "dentist appointment".into(),
  }
}

async fn requested(h: &Harness) -> LeaveRequest {
  h.engine
    .submit_leave_request(&h.call(&h.parent), leave_for(h, &h.athlete))
    .await
    .expect("submit leave request")
    .data
}

async fn stored(h: &Harness, id: Uuid) -> LeaveRequest {
  h.engine
    .get_leave_request(&h.call(&h.admin), id)
    .await
    .expect("admin read")
    .data
}

#[tokio::test]
async fn linked_parent_files_leave() {
  let h = harness().await;
  let request = requested(&h).await;

  assert_eq!(request.status, ReviewStatus::Pending);
  assert_eq!(request.athlete_id, h.athlete.id);
  assert_eq!(request.requested_by, h.parent.id);
  assert_eq!(request.club_id, h.club);
  assert_eq!(request.activity_log.len(), 1);
  assert_eq!(request.activity_log.entries()[0].action, ActivityAction::Submitted);
  assert_eq!(stored(&h, request.leave_request_id).await, request);
}

#[tokio::test]
async fn unlinked_parent_cannot_file_leave() {
  let h = harness().await;
  let result = h
    .engine
    .submit_leave_request(&h.call(&h.parent), leave_for(&h, &h.teammate))
    .await;
  assert_eq!(kind_of(result), ErrorKind::Authorization);
}

#[tokio::test]
async fn athlete_files_only_for_themselves() {
  let h = harness().await;
  let own = h
    .engine
    .submit_leave_request(&h.call(&h.athlete), leave_for(&h, &h.athlete))
    .await;
  assert!(own.is_ok());

  let other = h
    .engine
    .submit_leave_request(&h.call(&h.athlete), leave_for(&h, &h.teammate))
    .await;
  assert_eq!(kind_of(other), ErrorKind::Authorization);
}

#[tokio::test]
async fn duplicate_leave_request_conflicts() {
  let h = harness().await;
  requested(&h).await;

  let again = h
    .engine
    .submit_leave_request(&h.call(&h.athlete), leave_for(&h, &h.athlete))
    .await;
  assert_eq!(kind_of(again), ErrorKind::Conflict);
}

#[tokio::test]
async fn leave_must_precede_the_session() {
  let h = harness().await;
  h.clock.set(session_start());

  let result = h
    .engine
    .submit_leave_request(&h.call(&h.parent), leave_for(&h, &h.athlete))
    .await;
  assert_eq!(kind_of(result), ErrorKind::Validation);
}

#[tokio::test]
async fn empty_reason_is_rejected() {
  let h = harness().await;
  let mut input = leave_for(&h, &h.athlete);
  input.reason = "  ".into();

  let result = h.engine.submit_leave_request(&h.call(&h.parent), input).await;
  assert_eq!(kind_of(result), ErrorKind::Validation);
}

#[tokio::test]
async fn approval_records_one_excused_attendance() {
  let h = harness().await;
  let before = requested(&h).await;

  let approved = h
    .engine
    .approve_leave_request(&h.call(&h.coach), before.leave_request_id, None)
    .await
    .unwrap()
    .data;
  assert_eq!(approved.status, ReviewStatus::Approved);
  assert!(approved.activity_log.extends(&before.activity_log));
  assert_eq!(approved.activity_log.len(), 2);

  let records = h.store.list_attendance(h.session.session_id).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].athlete_id, h.athlete.id);
  assert_eq!(records[0].status, AttendanceStatus::Excused);
  assert_eq!(records[0].check_in_time, None);

  let again = h
    .engine
    .approve_leave_request(&h.call(&h.coach), before.leave_request_id, None)
    .await;
  assert_eq!(kind_of(again), ErrorKind::State);
  assert_eq!(h.store.list_attendance(h.session.session_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rejection_records_no_attendance() {
  let h = harness().await;
  let request = requested(&h).await;

  let rejected = h
    .engine
    .reject_leave_request(&h.call(&h.coach), request.leave_request_id, "team trip".into())
    .await
    .unwrap()
    .data;
  assert_eq!(rejected.status, ReviewStatus::Rejected);
  assert!(h.store.list_attendance(h.session.session_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn approval_after_check_in_conflicts_and_stays_pending() {
  let h = harness().await;
  let request = requested(&h).await;

  h.clock.set(session_start() - Duration::minutes(10));
  h.engine
    .check_in(&h.call(&h.athlete), h.session.session_id, h.athlete.id)
    .await
    .unwrap();

  let result = h
    .engine
    .approve_leave_request(&h.call(&h.coach), request.leave_request_id, None)
    .await;
  assert_eq!(kind_of(result), ErrorKind::Conflict);

  assert_eq!(stored(&h, request.leave_request_id).await, request);
  let records = h.store.list_attendance(h.session.session_id).await.unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0].status, AttendanceStatus::Present);
}

#[tokio::test]
async fn parents_cannot_review_leave() {
  let h = harness().await;
  let request = requested(&h).await;

  let result = h
    .engine
    .approve_leave_request(&h.call(&h.parent), request.leave_request_id, None)
    .await;
  assert_eq!(kind_of(result), ErrorKind::Authorization);
}

#[tokio::test]
async fn rival_coach_cannot_see_or_review_leave() {
  let h = harness().await;
  let request = requested(&h).await;

  let read = h
    .engine
    .get_leave_request(&h.call(&h.rival_coach), request.leave_request_id)
    .await;
  assert_eq!(kind_of(read), ErrorKind::Authorization);

  let review = h
    .engine
    .reject_leave_request(&h.call(&h.rival_coach), request.leave_request_id, "no".into())
    .await;
  assert_eq!(kind_of(review), ErrorKind::Authorization);
  assert_eq!(stored(&h, request.leave_request_id).await, request);
}

#[tokio::test]
async fn unknown_session_is_hidden_from_non_admins() {
  let h = harness().await;
  let mut input = leave_for(&h, &h.athlete);
  input.session_id = Uuid::new_v4();

  let parent = h.engine.submit_leave_request(&h.call(&h.parent), input.clone()).await;
  assert_eq!(kind_of(parent), ErrorKind::Authorization);

  let admin = h.engine.submit_leave_request(&h.call(&h.admin), input).await;
  assert_eq!(kind_of(admin), ErrorKind::NotFound);
}
