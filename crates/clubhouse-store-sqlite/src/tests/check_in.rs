use chrono::Duration;
use clubhouse_core::{
  actor::Actor, attendance::AttendanceStatus, store::ClubStore as _, Error, ErrorKind,
};
use uuid::Uuid;

use super::{harness, kind_of, session_start};

#[tokio::test]
async fn status_follows_the_window() {
  let cases = [
    (Duration::minutes(-30), AttendanceStatus::Present),
    (Duration::minutes(-1), AttendanceStatus::Present),
    (Duration::zero(), AttendanceStatus::Present),
    (Duration::minutes(1), AttendanceStatus::Late),
    (Duration::minutes(15), AttendanceStatus::Late),
  ];

  for (offset, expected) in cases {
    let h = harness().await;
    h.clock.set(session_start() + offset);

    let record = h
      .engine
      .check_in(&h.call(&h.athlete), h.session.session_id, h.athlete.id)
      .await
      .unwrap()
      .data;
    assert_eq!(record.status, expected, "offset {offset}");
    assert_eq!(record.check_in_time, Some(session_start() + offset));
  }
}

#[tokio::test]
async fn outside_the_window_is_rejected_without_a_record() {
  for offset in [Duration::minutes(-31), Duration::minutes(16)] {
    let h = harness().await;
    h.clock.set(session_start() + offset);

    let result = h
      .engine
      .check_in(&h.call(&h.athlete), h.session.session_id, h.athlete.id)
      .await;
    assert_eq!(kind_of(result), ErrorKind::TimeWindow);
    assert!(h.store.list_attendance(h.session.session_id).await.unwrap().is_empty());
  }
}

#[tokio::test]
async fn second_check_in_is_refused() {
  let h = harness().await;
  h.clock.set(session_start() - Duration::minutes(5));
  let first = h
    .engine
    .check_in(&h.call(&h.athlete), h.session.session_id, h.athlete.id)
    .await
    .unwrap()
    .data;

  h.clock.advance(Duration::minutes(10));
  let second = h
    .engine
    .check_in(&h.call(&h.coach), h.session.session_id, h.athlete.id)
    .await;
  assert_eq!(kind_of(second), ErrorKind::Conflict);

  let records = h.store.list_attendance(h.session.session_id).await.unwrap();
  assert_eq!(records, vec![first]);
}

#[tokio::test]
async fn check_in_permissions() {
  let h = harness().await;
  h.clock.set(session_start());
  let session = h.session.session_id;

  let parent = h.engine.check_in(&h.call(&h.parent), session, h.athlete.id).await;
  assert_eq!(kind_of(parent), ErrorKind::Authorization);

  let for_teammate = h.engine.check_in(&h.call(&h.athlete), session, h.teammate.id).await;
  assert_eq!(kind_of(for_teammate), ErrorKind::Authorization);

  let rival = h.engine.check_in(&h.call(&h.rival_coach), session, h.athlete.id).await;
  assert_eq!(kind_of(rival), ErrorKind::Authorization);

  let coach = h.engine.check_in(&h.call(&h.coach), session, h.teammate.id).await;
  assert!(coach.is_ok());
}

#[tokio::test]
async fn unknown_session_is_hidden_from_non_admins() {
  let h = harness().await;
  let session = Uuid::new_v4();

  let coach = h.engine.check_in(&h.call(&h.coach), session, h.athlete.id).await;
  assert_eq!(kind_of(coach), ErrorKind::Authorization);

  let admin = h.engine.check_in(&h.call(&h.admin), session, h.athlete.id).await;
  assert_eq!(kind_of(admin), ErrorKind::NotFound);
}

#[tokio::test]
async fn attendance_listing_is_scoped() {
  let h = harness().await;
  h.clock.set(session_start());
  let session = h.session.session_id;
  for athlete in [&h.athlete, &h.teammate] {
    h.engine.check_in(&h.call(&h.coach), session, athlete.id).await.unwrap();
  }

  let coach = h.engine.list_attendance(&h.call(&h.coach), session).await.unwrap();
  assert_eq!(coach.data.len(), 2);

  let athlete = h.engine.list_attendance(&h.call(&h.athlete), session).await.unwrap();
  assert_eq!(athlete.data.len(), 1);
  assert_eq!(athlete.data[0].athlete_id, h.athlete.id);

  let parent = h.engine.list_attendance(&h.call(&h.parent), session).await.unwrap();
  assert_eq!(parent.data.len(), 1);
  assert_eq!(parent.data[0].athlete_id, h.athlete.id);

  let rival = h.engine.list_attendance(&h.call(&h.rival_coach), session).await;
  assert_eq!(kind_of(rival), ErrorKind::Authorization);

  let outsider = Actor::athlete(Uuid::new_v4(), Uuid::new_v4());
  let none = h.engine.list_attendance(&h.call(&outsider), session).await.unwrap();
  assert!(none.data.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_check_ins_record_once() {
  let h = harness().await;
  h.clock.set(session_start() + Duration::minutes(3));

  let mut tasks = Vec::new();
  for i in 0..16 {
    let engine = h.engine.clone();
    let actor = if i % 2 == 0 { h.athlete.clone() } else { h.coach.clone() };
    let call = h.call(&actor);
    let (session, athlete) = (h.session.session_id, h.athlete.id);
    tasks.push(tokio::spawn(async move { engine.check_in(&call, session, athlete).await }));
  }

  let mut wins = 0;
  for task in tasks {
    match task.await.unwrap() {
      Ok(reply) => {
        wins += 1;
        assert_eq!(reply.data.status, AttendanceStatus::Late);
      }
      Err(e) => assert!(matches!(e, Error::AlreadyCheckedIn), "unexpected {e}"),
    }
  }
  assert_eq!(wins, 1);
  assert_eq!(h.store.list_attendance(h.session.session_id).await.unwrap().len(), 1);
}
