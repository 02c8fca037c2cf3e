/* src/server/core/rust/src/errors.rs */

use std::fmt;

use sever_protocol::ServerFnError;

/// Dispatch failure raised by the runtime itself, before or around an
/// implementation call.
#[derive(Debug)]
pub struct SeverError {
  code: String,
  message: String,
  status: u16,
}

fn default_status(code: &str) -> u16 {
  match code {
    "VALIDATION_ERROR" => 400,
    "NOT_FOUND" => 404,
    _ => 500,
  }
}

impl SeverError {
  fn with_code(code: &str, message: impl Into<String>) -> Self {
    Self { code: code.to_string(), message: message.into(), status: default_status(code) }
  }

  pub fn validation(msg: impl Into<String>) -> Self {
    Self::with_code("VALIDATION_ERROR", msg)
  }

  pub fn not_found(msg: impl Into<String>) -> Self {
    Self::with_code("NOT_FOUND", msg)
  }
}

impl fmt::Display for SeverError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.code, self.message)
  }
}

impl std::error::Error for SeverError {}

impl From<SeverError> for ServerFnError {
  fn from(err: SeverError) -> Self {
    ServerFnError::new(err.message).with_status(err.status)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_status_known_codes() {
    assert_eq!(default_status("VALIDATION_ERROR"), 400);
    assert_eq!(default_status("NOT_FOUND"), 404);
    assert_eq!(default_status("INTERNAL_ERROR"), 500);
    assert_eq!(default_status("CUSTOM_ERROR"), 500);
  }

  #[test]
  fn convenience_constructors() {
    let invalid = SeverError::validation("x");
    assert_eq!((invalid.code.as_str(), invalid.status), ("VALIDATION_ERROR", 400));
    let missing = SeverError::not_found("x");
    assert_eq!((missing.code.as_str(), missing.status), ("NOT_FOUND", 404));
  }

  #[test]
  fn converts_into_wire_error() {
    let err: ServerFnError = SeverError::not_found("Handler Not Found for /_m/a/0/fn").into();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.message, "Handler Not Found for /_m/a/0/fn");
  }

  #[test]
  fn display_format() {
    assert_eq!(SeverError::not_found("missing").to_string(), "NOT_FOUND: missing");
  }
}
