//! Integration tests: the engine wired to `SqliteStore` on an in-memory
//! database, driven by a fixed clock.

mod applications;
mod check_in;
mod leave;

use std::sync::{
  atomic::{AtomicBool, Ordering},
  Arc, Mutex,
};

use chrono::{DateTime, Duration, TimeZone as _, Utc};
use clubhouse_core::{
  actor::{Actor, LinkStatus, ParentLink},
  application::{MembershipApplication, NewApplication},
  attendance::TrainingSession,
  clock::FixedClock,
  collab::{Notification, Notifier},
  engine::{Call, Engine, EngineConfig},
  ErrorKind,
};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

pub type TestEngine = Engine<SqliteStore, RecordingNotifier>;

/// Start of the seeded training session.
pub fn session_start() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2026, 3, 2, 18, 0, 0).unwrap()
}

pub fn new_key() -> String { Uuid::new_v4().to_string() }

pub fn application_for(club_id: Uuid) -> NewApplication {
  NewApplication {
    club_id,
    personal_info: json!({ "name": "Ada Park", "birth_year": 2011 }),
    documents: Vec::new(),
  }
}

pub fn kind_of<T: std::fmt::Debug>(result: clubhouse_core::Result<T>) -> ErrorKind {
  result.expect_err("operation should fail").kind()
}

// ─── Notifier ────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
#[error("notification channel unavailable")]
pub struct ChannelDown;

#[derive(Default)]
pub struct RecordingNotifier {
  sent:    Mutex<Vec<Notification>>,
  failing: AtomicBool,
}

impl RecordingNotifier {
  pub fn fail(&self) { self.failing.store(true, Ordering::SeqCst); }

  pub fn sent(&self) -> Vec<Notification> { self.sent.lock().unwrap().clone() }
}

impl Notifier for RecordingNotifier {
  type Error = ChannelDown;

  async fn notify(&self, notification: Notification) -> Result<(), ChannelDown> {
    if self.failing.load(Ordering::SeqCst) {
      return Err(ChannelDown);
    }
    self.sent.lock().unwrap().push(notification);
    Ok(())
  }
}

// ─── Harness ─────────────────────────────────────────────────────────────────

/// One club with a coach, two athletes, a parent linked to the first athlete
/// and a session; plus a rival club with its own coach.
pub struct Harness {
  pub store:       Arc<SqliteStore>,
  pub engine:      Arc<TestEngine>,
  pub clock:       Arc<FixedClock>,
  pub notifier:    Arc<RecordingNotifier>,
  pub club:        Uuid,
  pub admin:       Actor,
  pub coach:       Actor,
  pub rival_coach: Actor,
  pub athlete:     Actor,
  pub teammate:    Actor,
  pub parent:      Actor,
  pub session:     TrainingSession,
}

pub async fn harness() -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
  let clock = Arc::new(FixedClock::new(session_start() - Duration::days(1)));
  let notifier = Arc::new(RecordingNotifier::default());
  let engine = Arc::new(Engine::new(
    store.clone(),
    notifier.clone(),
    clock.clone(),
    EngineConfig::default(),
  ));

  let club = Uuid::new_v4();
  let rival_club = Uuid::new_v4();
  let athlete = Actor::athlete(Uuid::new_v4(), club);
  let parent = Actor::parent(Uuid::new_v4(), club);

  let session = TrainingSession {
    session_id: Uuid::new_v4(),
    club_id:    club,
    title:      "Tuesday sprints".into(),
    start_time: session_start(),
  };
  store.insert_session(&session).await.unwrap();
  store
    .insert_parent_link(&ParentLink {
      link_id:    Uuid::new_v4(),
      parent_id:  parent.id,
      athlete_id: athlete.id,
      status:     LinkStatus::Approved,
      active:     true,
      created_at: session_start() - Duration::days(30),
    })
    .await
    .unwrap();

  Harness {
    store,
    engine,
    clock,
    notifier,
    club,
    admin: Actor::admin(Uuid::new_v4()),
    coach: Actor::coach(Uuid::new_v4(), club),
    rival_coach: Actor::coach(Uuid::new_v4(), rival_club),
    athlete,
    teammate: Actor::athlete(Uuid::new_v4(), club),
    parent,
    session,
  }
}

impl Harness {
  /// A fresh call for `actor` with its own trace and idempotency key.
  pub fn call(&self, actor: &Actor) -> Call {
    Call::new(actor.clone(), self.engine.begin(actor, None)).with_key(new_key())
  }

  /// The athlete's application, freshly submitted.
  pub async fn submitted(&self) -> MembershipApplication {
    self
      .engine
      .submit_application(&self.call(&self.athlete), application_for(self.club))
      .await
      .expect("submit application")
      .data
  }

  /// Read a record as the admin, bypassing scope.
  pub async fn application(&self, id: Uuid) -> MembershipApplication {
    self
      .engine
      .get_application(&self.call(&self.admin), id)
      .await
      .expect("admin read")
      .data
  }
}
