//! Handlers for `/sessions/{id}` attendance endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sessions/{id}/check-in` | Body: `{"athlete_id"?}`, defaults to the caller |
//! | `GET`  | `/sessions/{id}/attendance` | |

use std::sync::Arc;

use axum::extract::State;
use clubhouse_core::{
  attendance::AttendanceRecord,
  collab::Notifier,
  engine::Engine,
  store::{ClubStore, IdempotencyStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  context::{Caller, Replied},
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

#[derive(Debug, Default, Deserialize)]
pub struct CheckInBody {
  #[serde(default)]
  pub athlete_id: Option<Uuid>,
}

/// `POST /sessions/{id}/check-in`
pub async fn check_in<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(session_id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<CheckInBody>,
) -> Result<Replied<AttendanceRecord>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let athlete_id = body.athlete_id.unwrap_or(caller.actor.id);
  let call = caller.call(&engine);
  let reply = engine.check_in(&call, session_id, athlete_id).await?;
  Ok(Replied::created(reply))
}

/// `GET /sessions/{id}/attendance`
pub async fn list<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(session_id): ApiPath<Uuid>,
) -> Result<Replied<Vec<AttendanceRecord>>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.list_attendance(&call, session_id).await?;
  Ok(Replied::ok(reply))
}
