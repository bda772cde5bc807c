//! Error types for `clubhouse-core`.
//!
//! Every variant maps to one stable [`ErrorKind`]. Transports report the kind
//! and [`Error::public_message`], never the storage detail.

use serde::Serialize;
use strum::{AsRefStr, Display};
use thiserror::Error;

use crate::attendance::WindowViolation;

/// Caller-facing classification of an [`Error`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  Authorization,
  NotFound,
  Conflict,
  State,
  TimeWindow,
  IdempotencyKey,
  Internal,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation failed: {0}")]
  Validation(String),

  /// Scope denial. Carries no detail so it cannot reveal whether the target
  /// exists.
  #[error("not permitted")]
  Unauthorized,

  #[error("{0} not found")]
  NotFound(&'static str),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("athlete is already checked in for this session")]
  AlreadyCheckedIn,

  #[error("invalid state: {0}")]
  InvalidState(String),

  #[error("check-in rejected: {0}")]
  TimeWindow(WindowViolation),

  #[error("invalid idempotency key")]
  IdempotencyKey,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::Unauthorized => ErrorKind::Authorization,
      Self::NotFound(_) => ErrorKind::NotFound,
      Self::Conflict(_) | Self::AlreadyCheckedIn => ErrorKind::Conflict,
      Self::InvalidState(_) => ErrorKind::State,
      Self::TimeWindow(_) => ErrorKind::TimeWindow,
      Self::IdempotencyKey => ErrorKind::IdempotencyKey,
      Self::Serialization(_) | Self::Storage(_) => ErrorKind::Internal,
    }
  }

  /// The message returned to callers. Infrastructure failures collapse to a
  /// single generic string.
  pub fn public_message(&self) -> String {
    match self.kind() {
      ErrorKind::Internal => "internal error".to_owned(),
      _ => self.to_string(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn internal_errors_hide_detail() {
    let err = Error::storage(std::io::Error::other("disk on fire at /var/db"));
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.public_message(), "internal error");
  }

  #[test]
  fn duplicate_check_in_is_a_conflict() {
    assert_eq!(Error::AlreadyCheckedIn.kind(), ErrorKind::Conflict);
    assert_eq!(ErrorKind::IdempotencyKey.as_ref(), "idempotency_key");
  }
}
