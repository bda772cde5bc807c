//! Stateless input checks run before any engine logic.

use serde_json::Value;

use crate::{Error, Result};

pub const MAX_TEXT_LEN: usize = 2000;
pub const MAX_DOCUMENTS: usize = 20;

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
  Pass,
  Fail(String),
}

impl Check {
  pub fn passed(&self) -> bool { matches!(self, Self::Pass) }

  /// Keep the first failure.
  pub fn and(self, next: Check) -> Check {
    match self {
      Self::Pass => next,
      fail => fail,
    }
  }

  pub fn into_result(self) -> Result<()> {
    match self {
      Self::Pass => Ok(()),
      Self::Fail(message) => Err(Error::Validation(message)),
    }
  }
}

pub fn required(field: &str, value: &str) -> Check {
  if value.trim().is_empty() {
    Check::Fail(format!("{field} is required"))
  } else {
    Check::Pass
  }
}

pub fn max_len(field: &str, value: &str, max: usize) -> Check {
  if value.chars().count() > max {
    Check::Fail(format!("{field} must be at most {max} characters"))
  } else {
    Check::Pass
  }
}

pub fn max_items(field: &str, count: usize, max: usize) -> Check {
  if count > max {
    Check::Fail(format!("{field} must contain at most {max} items"))
  } else {
    Check::Pass
  }
}

pub fn object(field: &str, value: &Value) -> Check {
  if value.is_object() {
    Check::Pass
  } else {
    Check::Fail(format!("{field} must be an object"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn first_failure_wins() {
    let check = required("reason", "ok")
      .and(max_len("reason", "too long", 3))
      .and(required("notes", ""));
    assert_eq!(check, Check::Fail("reason must be at most 3 characters".into()));
  }

  #[test]
  fn whitespace_is_not_a_value() {
    assert!(!required("reason", " \t\n").passed());
    assert!(matches!(
      required("reason", "").into_result(),
      Err(Error::Validation(_))
    ));
  }

  #[test]
  fn object_check() {
    assert!(object("personal_info", &serde_json::json!({"a": 1})).passed());
    assert!(!object("personal_info", &serde_json::json!([1])).passed());
  }
}
