//! The engine: the single entry point for every workflow operation.
//!
//! A mutating call runs this sequence:
//!
//! 1. derive a step [`CorrelationContext`] from the caller's context;
//! 2. hand the idempotency key to the [`Gatekeeper`], which returns a cached
//!    result if the key was already used by this caller for this operation
//!    on this target;
//! 3. otherwise validate input, load the target and run the access control
//!    evaluator;
//! 4. commit the transition as one conditional write, activity log entry,
//!    side effects and cached result included;
//! 5. notify.
//!
//! Reads skip steps 2, 4 and 5.

mod applications;
mod attendance;
mod leave;

use std::{future::Future, sync::Arc};

use chrono::Duration;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;
use tracing::Instrument as _;

use crate::{
  access::{self, Action, Resource},
  actor::{Actor, ParentLink, Role},
  attendance::CheckInWindow,
  clock::Clock,
  collab::{Notification, Notifier},
  correlation::{CausationId, CorrelationContext, CorrelationId},
  idempotency::{self, Gatekeeper, Receipt},
  store::{ClubStore, IdempotencyStore},
  Error, ErrorKind, Result,
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Policy knobs. Defaults match the documented check-in window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
  pub check_in:       CheckInWindow,
  /// How long before a session starts a leave request must be filed.
  pub leave_min_lead: Duration,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self { check_in: CheckInWindow::default(), leave_min_lead: Duration::zero() }
  }
}

// ─── Call / Reply ────────────────────────────────────────────────────────────

/// One inbound call: who is asking, under which trace, and with which
/// idempotency key. The key is required for every mutating operation.
#[derive(Debug, Clone)]
pub struct Call {
  pub actor:           Actor,
  pub context:         CorrelationContext,
  pub idempotency_key: Option<String>,
}

impl Call {
  pub fn new(actor: Actor, context: CorrelationContext) -> Self {
    Self { actor, context, idempotency_key: None }
  }

  pub fn with_key(mut self, key: impl Into<String>) -> Self {
    self.idempotency_key = Some(key.into());
    self
  }
}

/// An operation result plus the identifiers needed to continue the trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply<T> {
  pub data:           T,
  pub correlation_id: CorrelationId,
  pub causation_id:   CausationId,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

pub struct Engine<S, N> {
  store:      Arc<S>,
  notifier:   Arc<N>,
  clock:      Arc<dyn Clock>,
  gatekeeper: Gatekeeper<S>,
  config:     EngineConfig,
}

impl<S, N> Engine<S, N>
where
  S: ClubStore + IdempotencyStore,
  N: Notifier,
{
  pub fn new(
    store: Arc<S>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
  ) -> Self {
    let gatekeeper = Gatekeeper::new(store.clone(), clock.clone());
    Self { store, notifier, clock, gatekeeper, config }
  }

  pub fn config(&self) -> &EngineConfig { &self.config }

  pub fn clock(&self) -> &dyn Clock { self.clock.as_ref() }

  /// Start a trace for `actor`, continuing `correlation_id` if given.
  pub fn begin(&self, actor: &Actor, correlation_id: Option<CorrelationId>) -> CorrelationContext {
    CorrelationContext::new(correlation_id, Some(actor), Default::default(), self.clock.now())
  }

  // ── Plumbing ──────────────────────────────────────────────────────────

  /// Run a mutating operation on `target` behind the gatekeeper, inside a
  /// span carrying the step's trace ids.
  async fn mutate<T, F, Fut>(
    &self,
    call: &Call,
    operation: &'static str,
    target: &[Uuid],
    op: F,
  ) -> Result<Reply<T>>
  where
    T: DeserializeOwned,
    F: FnOnce(CorrelationContext, Receipt) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let step = call.context.child(None, self.clock.now());
    let span = step.span(operation);
    let (correlation_id, causation_id) = (step.correlation_id, step.causation_id);
    let operation_id = idempotency::operation_id(operation, call.actor.id, target);

    async move {
      let outcome = match call.idempotency_key.as_deref() {
        Some(key) => {
          self
            .gatekeeper
            .execute(key, &operation_id, move |receipt| op(step, receipt))
            .await
        }
        None => Err(Error::IdempotencyKey),
      };
      log_failure(&outcome);
      outcome.map(|data| Reply { data, correlation_id, causation_id })
    }
    .instrument(span)
    .await
  }

  /// Run a read-only operation inside a span.
  async fn read<T, F, Fut>(
    &self,
    call: &Call,
    operation: &'static str,
    op: F,
  ) -> Result<Reply<T>>
  where
    F: FnOnce(CorrelationContext) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let step = call.context.child(None, self.clock.now());
    let span = step.span(operation);
    let (correlation_id, causation_id) = (step.correlation_id, step.causation_id);

    async move {
      let outcome = op(step).await;
      log_failure(&outcome);
      outcome.map(|data| Reply { data, correlation_id, causation_id })
    }
    .instrument(span)
    .await
  }

  async fn parent_links(&self, actor: &Actor) -> Result<Vec<ParentLink>> {
    if actor.role != Role::Parent {
      return Ok(Vec::new());
    }
    self.store.parent_links(actor.id).await.map_err(Error::storage)
  }

  async fn authorize(&self, actor: &Actor, action: Action, resource: &Resource) -> Result<()> {
    let links = self.parent_links(actor).await?;
    let decision = access::authorize(actor, action, resource, &links);
    if let access::Decision::Deny(reason) = decision {
      tracing::info!(%action, %reason, "access denied");
    }
    decision.into_result()
  }

  /// Keep only the items `actor` may read.
  async fn visible<T>(
    &self,
    actor: &Actor,
    items: Vec<T>,
    resource: impl Fn(&T) -> Resource,
  ) -> Result<Vec<T>> {
    let links = self.parent_links(actor).await?;
    Ok(
      items
        .into_iter()
        .filter(|item| {
          access::authorize(actor, Action::Read, &resource(item), &links).is_allowed()
        })
        .collect(),
    )
  }

  /// Fire-and-forget delivery; failures never undo the committed transition.
  async fn notify(&self, notification: Notification) {
    let kind = notification.kind;
    if let Err(e) = self.notifier.notify(notification).await {
      tracing::warn!(%kind, error = %e, "notification failed");
    }
  }
}

/// The error for a target that does not exist. Admins may see every club, so
/// they learn the truth; everyone else gets the same answer as a denial.
fn missing(actor: &Actor, what: &'static str) -> Error {
  if actor.is_admin() { Error::NotFound(what) } else { Error::Unauthorized }
}

fn log_failure<T>(outcome: &Result<T>) {
  match outcome {
    Err(e) if e.kind() == ErrorKind::Internal => {
      tracing::error!(error = %e, "operation failed");
    }
    Err(e) => tracing::debug!(kind = %e.kind(), error = %e, "operation rejected"),
    Ok(_) => {}
  }
}
