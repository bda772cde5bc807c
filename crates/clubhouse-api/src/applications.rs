//! Handlers for `/applications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/applications` | Body: `{"club_id", "personal_info", "documents"?}` |
//! | `GET`  | `/applications` | Optional `?club_id=` |
//! | `GET`  | `/applications/{id}` | |
//! | `POST` | `/applications/{id}/approve` | Body: `{"notes"?}` |
//! | `POST` | `/applications/{id}/reject` | Body: `{"reason"}` |

use std::sync::Arc;

use axum::extract::State;
use clubhouse_core::{
  application::{MembershipApplication, NewApplication},
  collab::Notifier,
  engine::Engine,
  store::{ClubStore, IdempotencyStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  context::{Caller, Replied},
  error::ApiError,
  extract::{ApiJson, ApiPath, ApiQuery},
};

// ─── Submit ──────────────────────────────────────────────────────────────────

/// `POST /applications`
pub async fn submit<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiJson(body): ApiJson<NewApplication>,
) -> Result<Replied<MembershipApplication>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.submit_application(&call, body).await?;
  Ok(Replied::created(reply))
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub club_id: Option<Uuid>,
}

/// `GET /applications[?club_id=<uuid>]`
pub async fn list<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Replied<Vec<MembershipApplication>>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.list_applications(&call, params.club_id).await?;
  Ok(Replied::ok(reply))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /applications/{id}`
pub async fn get_one<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Replied<MembershipApplication>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.get_application(&call, id).await?;
  Ok(Replied::ok(reply))
}

// ─── Review ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ApproveBody {
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
  pub reason: String,
}

/// `POST /applications/{id}/approve`
pub async fn approve<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<ApproveBody>,
) -> Result<Replied<MembershipApplication>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.approve_application(&call, id, body.notes).await?;
  Ok(Replied::ok(reply))
}

/// `POST /applications/{id}/reject`
pub async fn reject<S, N>(
  State(engine): State<Arc<Engine<S, N>>>,
  caller: Caller,
  ApiPath(id): ApiPath<Uuid>,
  ApiJson(body): ApiJson<RejectBody>,
) -> Result<Replied<MembershipApplication>, ApiError>
where
  S: ClubStore + IdempotencyStore + 'static,
  N: Notifier + 'static,
{
  let call = caller.call(&engine);
  let reply = engine.reject_application(&call, id, body.reason).await?;
  Ok(Replied::ok(reply))
}
