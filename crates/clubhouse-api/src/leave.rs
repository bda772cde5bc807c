//! Handlers for `/leave-requests` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/leave-requests` | Body: `{"session_id", "athlete_id", "reason"}` |
//! | `GET`  | `/leave-requests/{id}` | |
//! | `POST` | `/leave-requests/{id}/approve` | Body: `{"notes"?}` |
//! | `POST` | `/leave-requests/{id}/reject` | Body: `{"reason"}` |

use std::sync::Arc;

use axum::extract::State;
use clubhouse_core::{
  collab::Notifier,
  engine::Engine,
  leave::{LeaveRequest, NewLeaveRequest},
  store::{ClubStore, IdempotencyStore},
};
use uuid::Uuid;

use crate::{
  applications::{ApproveBody, RejectBody},
  context::{Caller, Replied},
  error::ApiError,
  extract::{ApiJson, ApiPath},
};

/// `POST /leave-requests`
pub async fn submit<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiJson(body): ApiJson<NewLeaveRequest>,
) -> Result<Replied<LeaveRequest>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.submit_leave_request(&call, body).await?;
  Ok(Replied::created(reply))
}

/// `GET /leave-requests/{id}`
pub async fn get_one<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Replied<LeaveRequest>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.get_leave_request(&call, id).await?;
  Ok(Replied::ok(reply))
}

/// `POST /leave-requests/{id}/approve`
pub async fn approve<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<ApproveBody>,
) -> Result<Replied<LeaveRequest>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.approve_leave_request(&call, id, body.notes).await?;
  Ok(Replied::ok(reply))
}

/// `POST /leave-requests/{id}/reject`
pub async fn reject<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<RejectBody>,
) -> Result<Replied<LeaveRequest>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.reject_leave_request(&call, id, body.reason).await?;
  Ok(Replied::ok(reply))
}
