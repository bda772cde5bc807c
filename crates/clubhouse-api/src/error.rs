//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error renders as `{"error": {"kind": "...", "message": "..."}}`.
//! Internal failures carry a generic message; the detail stays in the logs.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use clubhouse_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Engine(#[from] clubhouse_core::Error),

  /// The upstream authentication layer did not identify the caller.
  #[error("unauthenticated: {0}")]
  Unauthenticated(String),

  #[error("invalid {0} header")]
  BadHeader(&'static str),

  /// The body, path or query string did not deserialize.
  #[error("{message}")]
  Malformed { status: StatusCode, message: String },
}

impl ApiError {
  /// The stable kind string reported to callers.
  pub fn kind(&self) -> String {
    match self {
      ApiError::Engine(e) => e.kind().to_string(),
      ApiError::Unauthenticated(_) => "authentication".to_owned(),
      ApiError::BadHeader(_) | ApiError::Malformed { .. } => ErrorKind::Validation.to_string(),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Engine(e) => match e.kind() {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::State => StatusCode::CONFLICT,
        ErrorKind::TimeWindow => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::IdempotencyKey => StatusCode::BAD_REQUEST,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      },
      ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
      ApiError::BadHeader(_) => StatusCode::BAD_REQUEST,
      ApiError::Malformed { status, .. } => *status,
    }
  }

  fn message(&self) -> String {
    match self {
      ApiError::Engine(e) => e.public_message(),
      other => other.to_string(),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let body = json!({ "error": { "kind": self.kind(), "message": self.message() } });
    (status, Json(body)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use clubhouse_core::Error;

  use super::*;

  #[test]
  fn state_and_conflict_are_409() {
    let state = ApiError::from(Error::InvalidState("already approved".into()));
    assert_eq!(state.status(), StatusCode::CONFLICT);
    assert_eq!(state.kind(), "state");

    let dup = ApiError::from(Error::AlreadyCheckedIn);
    assert_eq!(dup.status(), StatusCode::CONFLICT);
    assert_eq!(dup.kind(), "conflict");
  }

  #[test]
  fn malformed_requests_are_validation_errors() {
    let err = ApiError::Malformed {
      status:  StatusCode::UNPROCESSABLE_ENTITY,
      message: "missing field `reason`".into(),
    };
    assert_eq!(err.kind(), "validation");
    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(err.message(), "missing field `reason`");
  }

  #[test]
  fn internal_detail_is_not_exposed() {
    let err = ApiError::from(Error::storage(std::io::Error::other("sqlite busy")));
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.message(), "internal error");
  }
}
