/* src/protocol/rust/src/body.rs */

use std::fmt;
use std::pin::Pin;

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use futures_util::StreamExt;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// Transport-neutral message body. Adapters convert to and from their
/// framework's body type at the edge.
#[derive(Default)]
pub enum Body {
  #[default]
  Empty,
  Full(Bytes),
  Stream(BodyStream),
}

impl Body {
  pub fn empty() -> Self {
    Self::Empty
  }

  pub fn from_stream<S>(stream: S) -> Self
  where
    S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
  {
    Self::Stream(Box::pin(stream))
  }

  pub fn is_stream(&self) -> bool {
    matches!(self, Self::Stream(_))
  }

  /// Buffers the whole body.
  pub async fn collect(self) -> Result<Bytes, BoxError> {
    match self {
      Self::Empty => Ok(Bytes::new()),
      Self::Full(bytes) => Ok(bytes),
      Self::Stream(mut stream) => {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
          buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
      }
    }
  }

  pub fn into_stream(self) -> BodyStream {
    match self {
      Self::Empty => Box::pin(futures_util::stream::empty()),
      Self::Full(bytes) => Box::pin(futures_util::stream::once(async move { Ok(bytes) })),
      Self::Stream(stream) => stream,
    }
  }
}

impl fmt::Debug for Body {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Empty => f.write_str("Body::Empty"),
      Self::Full(bytes) => write!(f, "Body::Full({} bytes)", bytes.len()),
      Self::Stream(_) => f.write_str("Body::Stream"),
    }
  }
}

impl From<Bytes> for Body {
  fn from(bytes: Bytes) -> Self {
    Self::Full(bytes)
  }
}

impl From<Vec<u8>> for Body {
  fn from(bytes: Vec<u8>) -> Self {
    Self::Full(Bytes::from(bytes))
  }
}

impl From<String> for Body {
  fn from(text: String) -> Self {
    Self::Full(Bytes::from(text))
  }
}

impl From<&'static str> for Body {
  fn from(text: &'static str) -> Self {
    Self::Full(Bytes::from_static(text.as_bytes()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn stream_body_collects_in_order() {
    let chunks = vec![Ok(Bytes::from("a")), Ok(Bytes::from("bc"))];
    let body = Body::from_stream(futures_util::stream::iter(chunks));
    assert!(body.is_stream());
    assert_eq!(body.collect().await.unwrap(), Bytes::from("abc"));
  }

  #[tokio::test]
  async fn full_body_round_trips_through_stream() {
    let body = Body::Stream(Body::from("hi").into_stream());
    assert_eq!(body.collect().await.unwrap(), Bytes::from("hi"));
  }
}
