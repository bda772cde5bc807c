use clubhouse_core::{
  activity::ActivityAction,
  actor::{Actor, Role},
  collab::NotificationKind,
  workflow::ReviewStatus,
  ErrorKind,
};
use uuid::Uuid;

use super::{application_for, harness, kind_of};

#[tokio::test]
async fn submit_creates_pending_application() {
  let h = harness().await;
  let app = h.submitted().await;

  assert_eq!(app.status, ReviewStatus::Pending);
  assert_eq!(app.user_id, h.athlete.id);
  assert_eq!(app.version, 0);
  assert!(app.review.is_none());
  assert_eq!(app.activity_log.len(), 1);
  assert_eq!(app.activity_log.entries()[0].action, ActivityAction::Submitted);

  let stored = h.application(app.application_id).await;
  assert_eq!(stored, app);

  let sent = h.notifier.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].kind, NotificationKind::ApplicationSubmitted);
}

#[tokio::test]
async fn second_submission_for_same_club_conflicts() {
  let h = harness().await;
  h.submitted().await;

  let again = h
    .engine
    .submit_application(&h.call(&h.athlete), application_for(h.club))
    .await;
  assert_eq!(kind_of(again), ErrorKind::Conflict);
}

#[tokio::test]
async fn submission_requires_object_personal_info() {
  let h = harness().await;
  let mut input = application_for(h.club);
  input.personal_info = serde_json::json!("just a string");

  let result = h.engine.submit_application(&h.call(&h.athlete), input).await;
  assert_eq!(kind_of(result), ErrorKind::Validation);
}

#[tokio::test]
async fn coach_cannot_submit_applications() {
  let h = harness().await;
  let result = h
    .engine
    .submit_application(&h.call(&h.coach), application_for(h.club))
    .await;
  assert_eq!(kind_of(result), ErrorKind::Authorization);
}

#[tokio::test]
async fn approval_provisions_profile_and_appends_entry() {
  let h = harness().await;
  let before = h.submitted().await;

  let approved = h
    .engine
    .approve_application(&h.call(&h.coach), before.application_id, Some("welcome".into()))
    .await
    .unwrap()
    .data;

  assert_eq!(approved.status, ReviewStatus::Approved);
  assert_eq!(approved.version, before.version + 1);
  let review = approved.review.as_ref().expect("review info");
  assert_eq!(review.reviewed_by, h.coach.id);
  assert_eq!(review.reviewer_role, Role::Coach);
  assert_eq!(review.notes.as_deref(), Some("welcome"));

  assert_eq!(approved.activity_log.len(), 2);
  assert!(approved.activity_log.extends(&before.activity_log));
  let last = approved.activity_log.last().unwrap();
  assert_eq!(last.action, ActivityAction::StatusChanged);
  assert_eq!(last.from, Some(ReviewStatus::Pending));
  assert_eq!(last.to, Some(ReviewStatus::Approved));

  let profiles = h.store.profiles_for_user(h.athlete.id).await.unwrap();
  assert_eq!(profiles.len(), 1);
  assert_eq!(approved.profile_id, Some(profiles[0].profile_id));
  assert_eq!(profiles[0].club_id, h.club);
  // Stamped by the engine's clock, same as the review.
  assert_eq!(profiles[0].created_at, review.reviewed_at);
}

#[tokio::test]
async fn rejection_needs_a_reason() {
  let h = harness().await;
  let before = h.submitted().await;

  let result = h
    .engine
    .reject_application(&h.call(&h.coach), before.application_id, "   ".into())
    .await;
  assert_eq!(kind_of(result), ErrorKind::Validation);
  assert_eq!(h.application(before.application_id).await, before);
}

#[tokio::test]
async fn rejection_records_reason_without_profile() {
  let h = harness().await;
  let before = h.submitted().await;

  let rejected = h
    .engine
    .reject_application(&h.call(&h.admin), before.application_id, "club is full".into())
    .await
    .unwrap()
    .data;

  assert_eq!(rejected.status, ReviewStatus::Rejected);
  assert_eq!(rejected.profile_id, None);
  assert_eq!(
    rejected.review.and_then(|r| r.notes).as_deref(),
    Some("club is full")
  );
  assert!(h.store.profiles_for_user(h.athlete.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn terminal_application_cannot_be_reviewed_again() {
  let h = harness().await;
  let app = h.submitted().await;
  let approved = h
    .engine
    .approve_application(&h.call(&h.coach), app.application_id, None)
    .await
    .unwrap()
    .data;

  let again = h
    .engine
    .approve_application(&h.call(&h.coach), app.application_id, None)
    .await;
  assert_eq!(kind_of(again), ErrorKind::State);

  let flip = h
    .engine
    .reject_application(&h.call(&h.admin), app.application_id, "changed my mind".into())
    .await;
  assert_eq!(kind_of(flip), ErrorKind::State);

  assert_eq!(h.application(app.application_id).await, approved);
  assert_eq!(h.store.profiles_for_user(h.athlete.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn coach_from_another_club_is_denied_and_nothing_changes() {
  let h = harness().await;
  let before = h.submitted().await;
  let snapshot = serde_json::to_string(&before).unwrap();

  let result = h
    .engine
    .approve_application(&h.call(&h.rival_coach), before.application_id, None)
    .await;
  assert_eq!(kind_of(result), ErrorKind::Authorization);

  let after = h.application(before.application_id).await;
  assert_eq!(serde_json::to_string(&after).unwrap(), snapshot);
  assert!(h.store.profiles_for_user(h.athlete.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn athletes_cannot_review_their_own_application() {
  let h = harness().await;
  let app = h.submitted().await;

  let result = h
    .engine
    .approve_application(&h.call(&h.athlete), app.application_id, None)
    .await;
  assert_eq!(kind_of(result), ErrorKind::Authorization);
}

#[tokio::test]
async fn missing_application_looks_denied_to_non_admins() {
  let h = harness().await;
  let id = Uuid::new_v4();

  let coach = h.engine.get_application(&h.call(&h.coach), id).await;
  assert_eq!(kind_of(coach), ErrorKind::Authorization);

  let admin = h.engine.get_application(&h.call(&h.admin), id).await;
  assert_eq!(kind_of(admin), ErrorKind::NotFound);
}

#[tokio::test]
async fn parent_reads_linked_athlete_only() {
  let h = harness().await;
  let app = h.submitted().await;

  let linked = h.engine.get_application(&h.call(&h.parent), app.application_id).await;
  assert_eq!(linked.unwrap().data, app);

  let stranger = Actor::parent(Uuid::new_v4(), h.club);
  let result = h.engine.get_application(&h.call(&stranger), app.application_id).await;
  assert_eq!(kind_of(result), ErrorKind::Authorization);
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
  let h = harness().await;
  let mine = h.submitted().await;
  h.engine
    .submit_application(&h.call(&h.teammate), application_for(h.club))
    .await
    .unwrap();

  let athlete = h.engine.list_applications(&h.call(&h.athlete), None).await.unwrap();
  assert_eq!(athlete.data, vec![mine.clone()]);

  let parent = h.engine.list_applications(&h.call(&h.parent), None).await.unwrap();
  assert_eq!(parent.data, vec![mine]);

  let coach = h.engine.list_applications(&h.call(&h.coach), None).await.unwrap();
  assert_eq!(coach.data.len(), 2);

  let rival = h
    .engine
    .list_applications(&h.call(&h.rival_coach), Some(h.club))
    .await;
  assert_eq!(kind_of(rival), ErrorKind::Authorization);

  let admin = h.engine.list_applications(&h.call(&h.admin), None).await.unwrap();
  assert_eq!(admin.data.len(), 2);
}

#[tokio::test]
async fn notifier_failure_does_not_undo_the_transition() {
  let h = harness().await;
  let app = h.submitted().await;
  h.notifier.fail();

  let approved = h
    .engine
    .approve_application(&h.call(&h.coach), app.application_id, None)
    .await
    .expect("approval survives notifier failure")
    .data;

  assert_eq!(approved.status, ReviewStatus::Approved);
  assert_eq!(h.application(app.application_id).await.status, ReviewStatus::Approved);
}

#[tokio::test]
async fn reply_continues_the_callers_trace() {
  let h = harness().await;
  let call = h.call(&h.athlete);

  let reply = h
    .engine
    .submit_application(&call, application_for(h.club))
    .await
    .unwrap();

  assert_eq!(reply.correlation_id, call.context.correlation_id);
  assert_ne!(reply.causation_id, call.context.causation_id);
  assert_eq!(h.notifier.sent()[0].correlation_id, call.context.correlation_id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_approvals_have_exactly_one_winner() {
  let h = harness().await;
  let app = h.submitted().await;

  let mut tasks = Vec::new();
  for i in 0..8 {
    let engine = h.engine.clone();
    let reviewer = if i % 2 == 0 { h.coach.clone() } else { h.admin.clone() };
    let call = h.call(&reviewer);
    let id = app.application_id;
    tasks.push(tokio::spawn(async move {
      engine.approve_application(&call, id, None).await
    }));
  }

  let mut wins = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(_) => wins += 1,
      Err(e) => assert_eq!(e.kind(), ErrorKind::State),
    }
  }
  assert_eq!(wins, 1);

  let stored = h.application(app.application_id).await;
  assert_eq!(stored.status, ReviewStatus::Approved);
  assert_eq!(stored.version, 1);
  assert_eq!(stored.activity_log.len(), 2);
  assert_eq!(h.store.profiles_for_user(h.athlete.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn approve_and_reject_race_commits_exactly_one() {
  for _ in 0..8 {
    let h = harness().await;
    let app = h.submitted().await;

    let approve = {
      let (engine, call, id) = (h.engine.clone(), h.call(&h.coach), app.application_id);
      tokio::spawn(async move { engine.approve_application(&call, id, None).await })
    };
    let reject = {
      let (engine, call, id) = (h.engine.clone(), h.call(&h.admin), app.application_id);
      tokio::spawn(async move { engine.reject_application(&call, id, "full".into()).await })
    };
    let approved = approve.await.unwrap();
    let rejected = reject.await.unwrap();
    assert!(approved.is_ok() != rejected.is_ok());

    let stored = h.application(app.application_id).await;
    let profiles = h.store.profiles_for_user(h.athlete.id).await.unwrap();
    assert_eq!(stored.activity_log.len(), 2);
    match stored.status {
      ReviewStatus::Approved => {
        assert_eq!(kind_of(rejected), ErrorKind::State);
        assert_eq!(profiles.len(), 1);
        assert_eq!(stored.profile_id, Some(profiles[0].profile_id));
      }
      ReviewStatus::Rejected => {
        assert_eq!(kind_of(approved), ErrorKind::State);
        assert!(profiles.is_empty());
        assert_eq!(stored.profile_id, None);
      }
      ReviewStatus::Pending => panic!("one review must commit"),
    }
  }
}
