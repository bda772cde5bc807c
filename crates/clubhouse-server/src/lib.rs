//! Wiring for the Clubhouse server binary: configuration, the engine over
//! the SQLite store, and the HTTP router.

use std::{convert::Infallible, path::PathBuf, sync::Arc};

use anyhow::ensure;
use axum::Router;
use chrono::Duration;
use clubhouse_core::{
  attendance::CheckInWindow,
  clock::SystemClock,
  collab::{Notification, Notifier},
  engine::{Engine, EngineConfig},
};
use clubhouse_store_sqlite::SqliteStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CLUBHOUSE_*` environment variables.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                   String,
  #[serde(default = "default_port")]
  pub port:                   u16,
  #[serde(default = "default_store_path")]
  pub store_path:             PathBuf,
  /// Minutes before a session start that check-in opens.
  #[serde(default = "default_early")]
  pub check_in_early_minutes: i64,
  /// Minutes after a session start that check-in stays open.
  #[serde(default = "default_late")]
  pub check_in_late_minutes:  i64,
  /// Minimum minutes between filing a leave request and the session start.
  #[serde(default)]
  pub leave_min_lead_minutes: i64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("clubhouse.db") }
fn default_early() -> i64 { 30 }
fn default_late() -> i64 { 15 }

impl ServerConfig {
  pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
    ensure!(self.check_in_early_minutes >= 0, "check_in_early_minutes must not be negative");
    ensure!(self.check_in_late_minutes >= 0, "check_in_late_minutes must not be negative");
    ensure!(self.leave_min_lead_minutes >= 0, "leave_min_lead_minutes must not be negative");

    Ok(EngineConfig {
      check_in:       CheckInWindow {
        opens_before: Duration::minutes(self.check_in_early_minutes),
        closes_after: Duration::minutes(self.check_in_late_minutes),
      },
      leave_min_lead: Duration::minutes(self.leave_min_lead_minutes),
    })
  }
}

// ─── Notifier ─────────────────────────────────────────────────────────────────

/// Writes each notification to the log. Delivery transports plug in here.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  type Error = Infallible;

  async fn notify(&self, n: Notification) -> Result<(), Infallible> {
    tracing::info!(
      kind = %n.kind,
      recipient = %n.recipient,
      entity_id = %n.entity_id,
      status = %n.status,
      correlation_id = %n.correlation_id,
      "notification"
    );
    Ok(())
  }
}

// ─── Engine + router ──────────────────────────────────────────────────────────

pub type ServerEngine = Engine<SqliteStore, TracingNotifier>;

/// The engine over `store`, notifying through the log.
pub fn build_engine(
  store: Arc<SqliteStore>,
  config: &ServerConfig,
) -> anyhow::Result<Arc<ServerEngine>> {
  Ok(Arc::new(Engine::new(
    store,
    Arc::new(TracingNotifier),
    Arc::new(SystemClock),
    config.engine_config()?,
  )))
}

/// The API router with request tracing.
pub fn router(engine: Arc<ServerEngine>) -> Router {
  clubhouse_api::api_router(engine).layer(TraceLayer::new_for_http())
}
