//! The idempotency gatekeeper.
//!
//! A caller-supplied key plus an operation id identifies one logical write.
//! The operation id names the operation, the caller and the target, so a key
//! replayed by someone else or against another record is a different write.
//! The first successful result is cached; every later call with the same pair
//! gets the cached result back without running the operation again.
//!
//! The cache entry is not written by the gatekeeper. The operation receives a
//! [`Receipt`] and the store records the result in the same transaction as
//! the write it describes, so a committed write always has its cache entry.
//!
//! Executions for the same pair are serialised in-process, so concurrent
//! replays wait for the first to finish and then read its result. Across
//! processes the `(key, operation_id)` primary key lets one writer commit;
//! the losers find its record after their own write fails.

use std::{
  collections::HashMap,
  fmt::Write as _,
  future::Future,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::{clock::Clock, store::IdempotencyStore, Error, Result};

pub const MIN_KEY_LEN: usize = 16;
pub const MAX_KEY_LEN: usize = 255;
const UUID_LEN: usize = 36;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// A key that passed [`IdempotencyKey::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
  /// Accepts a canonical hyphenated UUID, or 16–255 characters of ASCII
  /// letters, digits, `-` and `_` containing at least one letter.
  pub fn parse(raw: &str) -> Result<Self> {
    if is_valid_key(raw) {
      Ok(Self(raw.to_owned()))
    } else {
      Err(Error::IdempotencyKey)
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

pub fn is_valid_key(raw: &str) -> bool {
  if raw.len() == UUID_LEN && Uuid::try_parse(raw).is_ok() {
    return true;
  }

  (MIN_KEY_LEN..=MAX_KEY_LEN).contains(&raw.len())
    && raw
      .bytes()
      .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    && raw.bytes().any(|b| b.is_ascii_alphabetic())
}

/// The operation id for `operation` run by `actor_id` against `target`,
/// e.g. `application.approve/<actor>/<application>`.
pub fn operation_id(operation: &str, actor_id: Uuid, target: &[Uuid]) -> String {
  let mut id = format!("{operation}/{actor_id}");
  for t in target {
    let _ = write!(id, "/{t}");
  }
  id
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A cached result. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
  pub key:          String,
  pub operation_id: String,
  pub result:       Value,
  pub created_at:   DateTime<Utc>,
}

/// The gatekeeper's claim on one `(key, operation_id)` pair, handed to the
/// operation it guards. The store turns it into an [`IdempotencyRecord`]
/// inside the transaction that commits the operation's write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
  pub key:          String,
  pub operation_id: String,
  pub issued_at:    DateTime<Utc>,
}

impl Receipt {
  pub fn record(&self, result: Value) -> IdempotencyRecord {
    IdempotencyRecord {
      key: self.key.clone(),
      operation_id: self.operation_id.clone(),
      result,
      created_at: self.issued_at,
    }
  }
}

// ─── Gatekeeper ──────────────────────────────────────────────────────────────

type SlotKey = (String, String);
type SlotMap = Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>;

pub struct Gatekeeper<S> {
  store:    Arc<S>,
  clock:    Arc<dyn Clock>,
  inflight: SlotMap,
}

impl<S: IdempotencyStore> Gatekeeper<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
    Self { store, clock, inflight: Mutex::new(HashMap::new()) }
  }

  /// Run `op` at most once for `(key, operation_id)`.
  ///
  /// `op` must persist the [`Receipt`] it is given together with its write.
  /// Invalid keys fail with [`Error::IdempotencyKey`] before `op` is
  /// considered. Failed executions are not cached, so a retry with the same
  /// key runs `op` again.
  pub async fn execute<T, F, Fut>(
    &self,
    key: &str,
    operation_id: &str,
    op: F,
  ) -> Result<T>
  where
    T: DeserializeOwned,
    F: FnOnce(Receipt) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let key = IdempotencyKey::parse(key)?;
    let slot = Slot::claim(&self.inflight, (key.0.clone(), operation_id.to_owned()));
    let _turn = slot.lock.lock().await;

    if let Some(record) = self.lookup(&key, operation_id).await? {
      tracing::debug!(operation_id, "replaying cached result");
      return Ok(serde_json::from_value(record.result)?);
    }

    let receipt = Receipt {
      key:          key.0.clone(),
      operation_id: operation_id.to_owned(),
      issued_at:    self.clock.now(),
    };

    match op(receipt).await {
      Ok(value) => Ok(value),
      Err(e) => match self.lookup(&key, operation_id).await? {
        // Another process committed this key while `op` ran.
        Some(winner) => {
          tracing::warn!(operation_id, error = %e, "key committed concurrently");
          Ok(serde_json::from_value(winner.result)?)
        }
        None => Err(e),
      },
    }
  }

  async fn lookup(
    &self,
    key: &IdempotencyKey,
    operation_id: &str,
  ) -> Result<Option<IdempotencyRecord>> {
    self
      .store
      .get_idempotency(key.0.clone(), operation_id.to_owned())
      .await
      .map_err(Error::storage)
  }
}

/// Per-pair lock, removed from the map when the last holder drops it.
struct Slot<'a> {
  map:  &'a SlotMap,
  key:  SlotKey,
  lock: Arc<AsyncMutex<()>>,
}

impl<'a> Slot<'a> {
  fn claim(map: &'a SlotMap, key: SlotKey) -> Self {
    let mut slots = map.lock().unwrap_or_else(|e| e.into_inner());
    let lock = slots.entry(key.clone()).or_default().clone();
    Self { map, key, lock }
  }
}

impl Drop for Slot<'_> {
  fn drop(&mut self) {
    let mut slots = self.map.lock().unwrap_or_else(|e| e.into_inner());
    // One reference is ours, one is the map's.
    if Arc::strong_count(&self.lock) <= 2 {
      slots.remove(&self.key);
    }
  }
}
