/* src/client/rust/src/error.rs */

use sever_protocol::{BoxError, ProtocolError, ServerFnError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
  /// The implementation failed and the server sent back its error.
  #[error("server function failed: {0}")]
  Remote(ServerFnError),
  #[error("transport failed: {0}")]
  Transport(#[source] BoxError),
  #[error("could not read response: {0}")]
  Decode(String),
  #[error("call cancelled")]
  Cancelled,
  #[error(transparent)]
  Protocol(#[from] ProtocolError),
}

impl ClientError {
  pub fn remote(&self) -> Option<&ServerFnError> {
    match self {
      Self::Remote(err) => Some(err),
      _ => None,
    }
  }

  /// HTTP status carried by a remote error.
  pub fn status(&self) -> Option<u16> {
    self.remote().map(ServerFnError::status_code)
  }
}

impl From<serde_json::Error> for ClientError {
  fn from(err: serde_json::Error) -> Self {
    Self::Decode(err.to_string())
  }
}
