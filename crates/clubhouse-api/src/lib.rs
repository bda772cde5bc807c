//! JSON REST API for Clubhouse.
//!
//! Exposes an axum [`Router`] over an [`Engine`]. Authentication happens
//! upstream; the resolved actor arrives in the `x-actor-*` headers (see
//! [`context`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", clubhouse_api::api_router(engine.clone()))
//! ```

pub mod applications;
pub mod attendance;
pub mod context;
pub mod error;
pub mod extract;
pub mod leave;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use clubhouse_core::{
  collab::Notifier,
  engine::Engine,
  store::{ClubStore, IdempotencyStore},
};

pub use context::{Caller, Replied};
pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(engine: Arc<Engine<S, N>>) -> Router<()>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  Router::new()
    // Membership applications
    .route(
      "/applications",
      get(applications::list::<S, N>).post(applications::submit::<S, N>),
    )
    .route("/applications/{id}", get(applications::get_one::<S, N>))
    .route("/applications/{id}/approve", post(applications::approve::<S, N>))
    .route("/applications/{id}/reject", post(applications::reject::<S, N>))
    // Leave requests
    .route("/leave-requests", post(leave::submit::<S, N>))
    .route("/leave-requests/{id}", get(leave::get_one::<S, N>))
    .route("/leave-requests/{id}/approve", post(leave::approve::<S, N>))
    .route("/leave-requests/{id}/reject", post(leave::reject::<S, N>))
    // Attendance
    .route("/sessions/{id}/check-in", post(attendance::check_in::<S, N>))
    .route("/sessions/{id}/attendance", get(attendance::list::<S, N>))
    .with_state(engine)
}
