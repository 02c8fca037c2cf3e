/* src/protocol/rust/src/error.rs */

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error raised by a boundary implementation and carried across the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFnError {
  #[serde(default)]
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stack: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<u16>,
}

impl ServerFnError {
  pub fn new(message: impl Into<String>) -> Self {
    Self { message: message.into(), stack: None, status: None }
  }

  pub fn with_status(mut self, status: u16) -> Self {
    self.status = Some(status);
    self
  }

  pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
    self.stack = Some(stack.into());
    self
  }

  /// Status the error envelope is sent with; 500 unless the error carries
  /// a valid one.
  pub fn status_code(&self) -> u16 {
    match self.status {
      Some(status) if (100..=599).contains(&status) => status,
      _ => 500,
    }
  }
}

impl fmt::Display for ServerFnError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

impl std::error::Error for ServerFnError {}

impl From<serde_json::Error> for ServerFnError {
  fn from(err: serde_json::Error) -> Self {
    Self::new(err.to_string()).with_status(400)
  }
}

/// Wire shape of an `error` envelope body.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ErrorEnvelope {
  pub error: ServerFnError,
}

/// Failures while framing or reading protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
  #[error("invalid value for header `{name}`")]
  InvalidHeader { name: String },
  #[error("invalid HTTP method `{0}`")]
  InvalidMethod(String),
  #[error("malformed JSON: {0}")]
  Json(#[from] serde_json::Error),
  #[error("failed to read body: {0}")]
  Body(String),
  #[error(transparent)]
  Http(#[from] http::Error),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_defaults_to_internal_error() {
    assert_eq!(ServerFnError::new("boom").status_code(), 500);
    assert_eq!(ServerFnError::new("nope").with_status(403).status_code(), 403);
    assert_eq!(ServerFnError::new("bad").with_status(42).status_code(), 500);
  }

  #[test]
  fn envelope_omits_absent_fields() {
    let body = serde_json::to_value(ErrorEnvelope { error: ServerFnError::new("boom") }).unwrap();
    assert_eq!(body, serde_json::json!({ "error": { "message": "boom" } }));
  }
}
