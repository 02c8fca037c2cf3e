/* src/protocol/rust/src/headers.rs */

use http::HeaderMap;

pub const ORIGIN: &str = "x-sever-origin";
pub const CONTENT_KIND: &str = "x-sever-content-type";
pub const RESPONSE_TYPE: &str = "x-sever-response-type";
pub const LOCATION: &str = "x-sever-location";

pub const JSON_MIME: &str = "application/json";
pub const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Reads a header as UTF-8, ignoring values that are not.
pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers.get(name).and_then(|v| v.to_str().ok())
}

/// Which side issued a boundary request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
  Client,
  Server,
}

impl Origin {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Client => "client",
      Self::Server => "server",
    }
  }

  pub fn parse(value: &str) -> Option<Self> {
    match value.trim() {
      v if v.eq_ignore_ascii_case("client") => Some(Self::Client),
      v if v.eq_ignore_ascii_case("server") => Some(Self::Server),
      _ => None,
    }
  }

  pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
    header_str(headers, ORIGIN).and_then(Self::parse)
  }
}

/// Logical content of a response body, layered over `content-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
  Json,
  Error,
  Response,
  Text,
}

impl EnvelopeKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Json => "json",
      Self::Error => "error",
      Self::Response => "response",
      Self::Text => "text",
    }
  }

  /// Substring match, so plain `content-type` values classify too:
  /// `application/json; charset=utf-8` is `Json`, `text/plain` is `Text`.
  pub fn sniff(value: &str) -> Option<Self> {
    let value = value.to_ascii_lowercase();
    if value.contains("json") {
      Some(Self::Json)
    } else if value.contains("text") {
      Some(Self::Text)
    } else if value.contains("error") {
      Some(Self::Error)
    } else if value.contains("response") {
      Some(Self::Response)
    } else {
      None
    }
  }
}

/// Whether the implementation returned or threw the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResponseType {
  #[default]
  Return,
  Throw,
}

impl ResponseType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Return => "return",
      Self::Throw => "throw",
    }
  }

  pub fn from_headers(headers: &HeaderMap) -> Self {
    match header_str(headers, RESPONSE_TYPE) {
      Some(v) if v.eq_ignore_ascii_case("throw") => Self::Throw,
      _ => Self::Return,
    }
  }
}
