//! Request context: who is calling, under which trace and key, and the
//! response wrapper that echoes the trace back.
//!
//! | Header | Required | Notes |
//! |--------|----------|-------|
//! | `x-actor-id` | yes | UUID, set by the upstream authentication layer |
//! | `x-actor-role` | yes | `admin\|coach\|athlete\|parent` |
//! | `x-actor-club` | unless admin | UUID |
//! | `idempotency-key` | on mutations | see [`clubhouse_core::idempotency`] |
//! | `x-correlation-id` | no | UUID; generated when absent |

use axum::{
  Json,
  extract::FromRequestParts,
  http::{HeaderMap, HeaderValue, StatusCode, request::Parts},
  response::{IntoResponse, Response},
};
use clubhouse_core::{
  actor::{Actor, Role},
  collab::Notifier,
  correlation::CorrelationId,
  engine::{Call, Engine, Reply},
  store::{ClubStore, IdempotencyStore},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_ID: &str = "x-actor-id";
pub const ACTOR_ROLE: &str = "x-actor-role";
pub const ACTOR_CLUB: &str = "x-actor-club";
pub const IDEMPOTENCY_KEY: &str = "idempotency-key";
pub const CORRELATION_ID: &str = "x-correlation-id";
pub const CAUSATION_ID: &str = "x-causation-id";

// ─── Caller ──────────────────────────────────────────────────────────────────

/// The identity and trace headers of one request.
#[derive(Debug, Clone)]
pub struct Caller {
  pub actor:           Actor,
  pub correlation_id:  Option<CorrelationId>,
  pub idempotency_key: Option<String>,
}

impl Caller {
  /// Start the engine call for this request.
  pub fn call<S, N>(self, engine: &Engine<S, N>) -> Call
  where
    S: ClubStore + IdempotencyStore,
    N: Notifier,
  {
    let context = engine.begin(&self.actor, self.correlation_id);
    Call { actor: self.actor, context, idempotency_key: self.idempotency_key }
  }

  fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
    let id = header(headers, ACTOR_ID)?
      .ok_or_else(|| ApiError::Unauthenticated(format!("missing {ACTOR_ID}")))?;
    let id = Uuid::try_parse(id).map_err(|_| ApiError::BadHeader(ACTOR_ID))?;

    let role = header(headers, ACTOR_ROLE)?
      .ok_or_else(|| ApiError::Unauthenticated(format!("missing {ACTOR_ROLE}")))?;
    let role: Role = role.parse().map_err(|_| ApiError::BadHeader(ACTOR_ROLE))?;

    let club_id = header(headers, ACTOR_CLUB)?
      .map(|v| Uuid::try_parse(v).map_err(|_| ApiError::BadHeader(ACTOR_CLUB)))
      .transpose()?;
    if club_id.is_none() && role != Role::Admin {
      return Err(ApiError::Unauthenticated(format!("missing {ACTOR_CLUB}")));
    }

    let correlation_id = header(headers, CORRELATION_ID)?
      .map(|v| v.parse().map_err(|_| ApiError::BadHeader(CORRELATION_ID)))
      .transpose()?;

    let idempotency_key = header(headers, IDEMPOTENCY_KEY)?.map(str::to_owned);

    Ok(Self { actor: Actor { id, role, club_id }, correlation_id, idempotency_key })
  }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<Option<&'a str>, ApiError> {
  headers
    .get(name)
    .map(|v| v.to_str().map_err(|_| ApiError::BadHeader(name)))
    .transpose()
}

impl<St> FromRequestParts<St> for Caller
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
    Caller::from_headers(&parts.headers).inspect_err(|e| {
      tracing::debug!(error = %e, "rejected request headers");
    })
  }
}

// ─── Replied ─────────────────────────────────────────────────────────────────

/// A successful engine reply, rendered as JSON with the trace headers set.
pub struct Replied<T> {
  status: StatusCode,
  reply:  Reply<T>,
}

impl<T> Replied<T> {
  pub fn ok(reply: Reply<T>) -> Self { Self { status: StatusCode::OK, reply } }

  pub fn created(reply: Reply<T>) -> Self { Self { status: StatusCode::CREATED, reply } }
}

impl<T: Serialize> IntoResponse for Replied<T> {
  fn into_response(self) -> Response {
    let correlation = self.reply.correlation_id.to_string();
    let causation = self.reply.causation_id.to_string();
    let mut res = (self.status, Json(self.reply)).into_response();
    let headers = res.headers_mut();
    if let Ok(v) = HeaderValue::from_str(&correlation) {
      headers.insert(CORRELATION_ID, v);
    }
    if let Ok(v) = HeaderValue::from_str(&causation) {
      headers.insert(CAUSATION_ID, v);
    }
    res
  }
}
