//! Correlation and causation identifiers.
//!
//! Every step of one logical request chain shares a [`CorrelationId`]; every
//! individual step gets its own [`CausationId`]. A child context records its
//! parent's causation id, so the causal tree can be rebuilt from logs alone.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::Actor;

/// Identifies one logical request chain.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }

  pub fn as_uuid(&self) -> &Uuid { &self.0 }
}

impl Default for CorrelationId {
  fn default() -> Self { Self::new() }
}

impl From<Uuid> for CorrelationId {
  fn from(uuid: Uuid) -> Self { Self(uuid) }
}

impl FromStr for CorrelationId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self(Uuid::try_parse(s.trim())?))
  }
}

impl fmt::Display for CorrelationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Identifies one step within a chain.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct CausationId(Uuid);

impl CausationId {
  pub fn new() -> Self { Self(Uuid::new_v4()) }

  pub fn as_uuid(&self) -> &Uuid { &self.0 }
}

impl Default for CausationId {
  fn default() -> Self { Self::new() }
}

impl fmt::Display for CausationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Trace identifiers for one step. Logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationContext {
  pub correlation_id: CorrelationId,
  pub causation_id:   CausationId,
  /// The causation id of the step that spawned this one.
  pub parent_id:      Option<CausationId>,
  pub actor_id:       Option<Uuid>,
  pub timestamp:      DateTime<Utc>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub meta:           BTreeMap<String, String>,
}

impl CorrelationContext {
  /// Start a chain. A correlation id is generated when the caller supplies
  /// none.
  pub fn new(
    correlation_id: Option<CorrelationId>,
    actor: Option<&Actor>,
    meta: BTreeMap<String, String>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      correlation_id: correlation_id.unwrap_or_default(),
      causation_id: CausationId::new(),
      parent_id: None,
      actor_id: actor.map(|a| a.id),
      timestamp: now,
      meta,
    }
  }

  /// Derive the context for a dependent step.
  pub fn child(&self, actor_override: Option<&Actor>, now: DateTime<Utc>) -> Self {
    Self {
      correlation_id: self.correlation_id,
      causation_id: CausationId::new(),
      parent_id: Some(self.causation_id),
      actor_id: actor_override.map(|a| a.id).or(self.actor_id),
      timestamp: now,
      meta: self.meta.clone(),
    }
  }

  pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.meta.insert(key.into(), value.into());
    self
  }

  /// A span carrying this context's identifiers.
  pub fn span(&self, operation: &'static str) -> tracing::Span {
    tracing::info_span!(
      "op",
      operation,
      correlation_id = %self.correlation_id,
      causation_id = %self.causation_id,
      parent_id = self.parent_id.map(tracing::field::display),
      actor_id = self.actor_id.map(tracing::field::display),
    )
  }
}
