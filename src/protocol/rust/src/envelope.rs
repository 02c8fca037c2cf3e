/* src/protocol/rust/src/envelope.rs */

use http::header::{CONTENT_TYPE, LOCATION as LOCATION_HEADER};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::body::Body;
use crate::error::{ErrorEnvelope, ProtocolError, ServerFnError};
use crate::headers::{
  CONTENT_KIND, EnvelopeKind, JSON_MIME, LOCATION, ORIGIN, Origin, RESPONSE_TYPE, ResponseType,
  header_str,
};

/// Prepended to stacks that reach the wire.
pub const UNHANDLED_ERROR_NOTE: &str = "This error happened inside a server function and you didn't handle it. So the client will receive an Internal Server Error. You can catch the error and return a ServerFnError that makes sense for your UI. In production, the user will have no idea what the error is:";

/// Statuses treated as redirects when tunnelled back to a client.
pub const REDIRECT_STATUSES: [u16; 6] = [204, 301, 302, 303, 307, 308];

pub fn is_redirect_status(status: StatusCode) -> bool {
  REDIRECT_STATUSES.contains(&status.as_u16())
}

/// What an implementation produced.
#[derive(Debug)]
pub enum Outcome {
  /// A raw transport response.
  Response(Response<Body>),
  Error(ServerFnError),
  Value(Value),
  /// Nothing to return.
  Empty,
}

impl From<Value> for Outcome {
  fn from(value: Value) -> Self {
    Self::Value(value)
  }
}

impl From<Response<Body>> for Outcome {
  fn from(response: Response<Body>) -> Self {
    Self::Response(response)
  }
}

impl From<ServerFnError> for Outcome {
  fn from(err: ServerFnError) -> Self {
    Self::Error(err)
  }
}

impl From<()> for Outcome {
  fn from((): ()) -> Self {
    Self::Empty
  }
}

/// Encoding knobs decided by the server, not by the outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
  /// Origin tag of the inbound request.
  pub origin: Option<Origin>,
  pub response_type: ResponseType,
  pub expose_stack: bool,
}

fn annotate(headers: &mut HeaderMap, kind: EnvelopeKind, response_type: ResponseType) {
  headers.insert(ORIGIN, HeaderValue::from_static(Origin::Server.as_str()));
  headers.insert(RESPONSE_TYPE, HeaderValue::from_static(response_type.as_str()));
  headers.insert(CONTENT_KIND, HeaderValue::from_static(kind.as_str()));
}

fn json_response(status: StatusCode, body: String, response_type: ResponseType) -> Response<Body> {
  let mut response = Response::new(Body::from(body));
  *response.status_mut() = status;
  response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
  annotate(response.headers_mut(), EnvelopeKind::Json, response_type);
  response
}

/// Turns an outcome into the response sent over the wire.
pub fn encode_outcome(outcome: Outcome, opts: EncodeOptions) -> Response<Body> {
  match outcome {
    Outcome::Response(response) => encode_raw(response, opts),
    Outcome::Error(err) => encode_error(&err, opts),
    Outcome::Value(value) => {
      let body = serde_json::to_string(&value).unwrap_or_else(|_| "null".to_string());
      json_response(StatusCode::OK, body, opts.response_type)
    }
    Outcome::Empty => json_response(StatusCode::OK, "null".to_string(), opts.response_type),
  }
}

fn encode_raw(response: Response<Body>, opts: EncodeOptions) -> Response<Body> {
  if response.status() == StatusCode::SWITCHING_PROTOCOLS {
    return response;
  }

  let location = response.headers().get(LOCATION_HEADER).cloned();
  if let (true, Some(Origin::Client), Some(location)) =
    (is_redirect_status(response.status()), opts.origin, location)
  {
    // Browsers follow redirects before the fetcher can see them; tunnel the
    // target through a 204 instead.
    let (parts, _) = response.into_parts();
    let mut tunnelled = Response::new(Body::Empty);
    *tunnelled.status_mut() = StatusCode::NO_CONTENT;
    *tunnelled.headers_mut() = parts.headers;
    tunnelled.headers_mut().insert(LOCATION, location);
    annotate(tunnelled.headers_mut(), EnvelopeKind::Response, opts.response_type);
    return tunnelled;
  }

  let (mut parts, body) = response.into_parts();
  annotate(&mut parts.headers, EnvelopeKind::Response, opts.response_type);
  Response::from_parts(parts, body)
}

fn encode_error(err: &ServerFnError, opts: EncodeOptions) -> Response<Body> {
  let stack = if opts.expose_stack {
    let trace = err.stack.as_deref().unwrap_or(&err.message);
    Some(format!("{UNHANDLED_ERROR_NOTE}\n\n{trace}"))
  } else {
    None
  };
  let status = err.status_code();
  let envelope = ErrorEnvelope {
    error: ServerFnError { message: err.message.clone(), stack, status: Some(status) },
  };
  let body = serde_json::to_string(&envelope).unwrap_or_else(|_| "{\"error\":{}}".to_string());

  let mut response = Response::new(Body::from(body));
  *response.status_mut() = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
  response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(JSON_MIME));
  annotate(response.headers_mut(), EnvelopeKind::Error, opts.response_type);
  response
}

/// Redirect response; `status` defaults to 302 and an empty location to `/`.
pub fn redirect(location: &str, status: Option<StatusCode>) -> Result<Response<Body>, ProtocolError> {
  let location = if location.is_empty() { "/" } else { location };
  if location.starts_with('.') {
    warn!(location, "relative redirect target; browsers resolve it against the current page");
  }
  let value = HeaderValue::from_str(location)
    .map_err(|_| ProtocolError::InvalidHeader { name: LOCATION_HEADER.to_string() })?;
  let mut response = Response::new(Body::Empty);
  *response.status_mut() = status.unwrap_or(StatusCode::FOUND);
  response.headers_mut().insert(LOCATION_HEADER, value);
  Ok(response)
}

/// JSON response tagged with the `json` envelope kind.
pub fn json(value: &Value, status: Option<StatusCode>) -> Response<Body> {
  let body = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
  let mut response = Response::new(Body::from(body));
  *response.status_mut() = status.unwrap_or(StatusCode::OK);
  response
    .headers_mut()
    .insert(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"));
  response.headers_mut().insert(CONTENT_KIND, HeaderValue::from_static(EnvelopeKind::Json.as_str()));
  response
}

/// A decoded response, seen from the caller.
#[derive(Debug)]
pub enum Reply {
  Json(Value),
  Text(String),
  Error(ServerFnError),
  Response(Response<Body>),
}

#[derive(Debug)]
pub struct Decoded {
  pub response_type: ResponseType,
  pub reply: Reply,
}

async fn read_body(body: Body) -> Result<bytes::Bytes, ProtocolError> {
  body.collect().await.map_err(|e| ProtocolError::Body(e.to_string()))
}

fn tunnelled_location(response: &Response<Body>) -> Option<String> {
  if response.status() != StatusCode::NO_CONTENT {
    return None;
  }
  header_str(response.headers(), LOCATION)
    .or_else(|| header_str(response.headers(), LOCATION_HEADER.as_str()))
    .map(str::to_string)
}

/// Reads a boundary response according to its envelope kind, falling back to
/// `content-type` and then to a best-effort JSON parse for endpoints that
/// do not speak the envelope.
pub async fn decode_response(response: Response<Body>) -> Result<Decoded, ProtocolError> {
  let response_type = ResponseType::from_headers(response.headers());
  let kind = header_str(response.headers(), CONTENT_KIND)
    .or_else(|| header_str(response.headers(), CONTENT_TYPE.as_str()))
    .and_then(EnvelopeKind::sniff);

  let reply = match kind {
    Some(EnvelopeKind::Json) => {
      let bytes = read_body(response.into_body()).await?;
      Reply::Json(serde_json::from_slice(&bytes)?)
    }
    Some(EnvelopeKind::Text) => {
      let bytes = read_body(response.into_body()).await?;
      Reply::Text(String::from_utf8_lossy(&bytes).into_owned())
    }
    Some(EnvelopeKind::Error) => {
      let bytes = read_body(response.into_body()).await?;
      let envelope: ErrorEnvelope = serde_json::from_slice(&bytes)?;
      Reply::Error(envelope.error)
    }
    Some(EnvelopeKind::Response) => match tunnelled_location(&response) {
      Some(location) => Reply::Response(redirect(&location, None)?),
      None => Reply::Response(response),
    },
    None => decode_unlabelled(response).await?,
  };
  Ok(Decoded { response_type, reply })
}

async fn decode_unlabelled(response: Response<Body>) -> Result<Reply, ProtocolError> {
  if response.status() == StatusCode::OK {
    let (parts, body) = response.into_parts();
    let bytes = read_body(body).await?;
    if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
      return Ok(Reply::Json(value));
    }
    return Ok(Reply::Response(Response::from_parts(parts, Body::Full(bytes))));
  }
  if let Some(location) = tunnelled_location(&response) {
    return Ok(Reply::Response(redirect(&location, None)?));
  }
  Ok(Reply::Response(response))
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn client_origin() -> EncodeOptions {
    EncodeOptions { origin: Some(Origin::Client), ..Default::default() }
  }

  #[tokio::test]
  async fn redirect_round_trips_through_a_tunnel() {
    let encoded = encode_outcome(redirect("/x", None).unwrap().into(), client_origin());
    assert_eq!(encoded.status(), StatusCode::NO_CONTENT);
    assert_eq!(header_str(encoded.headers(), LOCATION), Some("/x"));
    assert_eq!(header_str(encoded.headers(), CONTENT_KIND), Some("response"));

    let decoded = decode_response(encoded).await.unwrap();
    let Reply::Response(response) = decoded.reply else { panic!("expected a response") };
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(header_str(response.headers(), "location"), Some("/x"));
  }

  #[test]
  fn server_origin_redirects_pass_through() {
    let opts = EncodeOptions { origin: Some(Origin::Server), ..Default::default() };
    let encoded = encode_outcome(redirect("/x", Some(StatusCode::SEE_OTHER)).unwrap().into(), opts);
    assert_eq!(encoded.status(), StatusCode::SEE_OTHER);
    assert_eq!(header_str(encoded.headers(), CONTENT_KIND), Some("response"));
  }

  #[test]
  fn upgrade_responses_are_untouched() {
    let mut upgrade = Response::new(Body::Empty);
    *upgrade.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    let encoded = encode_outcome(upgrade.into(), client_origin());
    assert_eq!(encoded.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert!(encoded.headers().get(CONTENT_KIND).is_none());
  }

  #[tokio::test]
  async fn thrown_error_becomes_error_envelope() {
    let opts = EncodeOptions { response_type: ResponseType::Throw, expose_stack: true, ..client_origin() };
    let encoded = encode_outcome(ServerFnError::new("boom").into(), opts);
    assert_eq!(encoded.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(header_str(encoded.headers(), CONTENT_KIND), Some("error"));

    let decoded = decode_response(encoded).await.unwrap();
    assert_eq!(decoded.response_type, ResponseType::Throw);
    let Reply::Error(err) = decoded.reply else { panic!("expected an error") };
    assert!(err.message.contains("boom"));
    assert_eq!(err.status, Some(500));
    assert!(err.stack.unwrap().starts_with(UNHANDLED_ERROR_NOTE));
  }

  #[tokio::test]
  async fn stacks_can_be_withheld() {
    let encoded = encode_outcome(ServerFnError::new("boom").with_stack("at f").into(), client_origin());
    let body = encoded.into_body().collect().await.unwrap();
    let value: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value, json!({ "error": { "message": "boom", "status": 500 } }));
  }

  #[tokio::test]
  async fn values_and_empty_outcomes_are_json() {
    let decoded = decode_response(encode_outcome(json!({ "ok": 1 }).into(), client_origin())).await.unwrap();
    assert!(matches!(decoded.reply, Reply::Json(v) if v == json!({ "ok": 1 })));

    let empty = encode_outcome(Outcome::Empty, client_origin());
    assert_eq!(empty.status(), StatusCode::OK);
    assert_eq!(empty.into_body().collect().await.unwrap(), "null");
  }

  #[tokio::test]
  async fn unlabelled_responses_fall_back_to_json_then_raw() {
    let plain = Response::new(Body::from("[1,2]"));
    assert!(matches!(decode_response(plain).await.unwrap().reply, Reply::Json(_)));

    let mut html = Response::new(Body::from("<p>hi</p>"));
    html.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"));
    let Reply::Response(raw) = decode_response(html).await.unwrap().reply else {
      panic!("expected raw passthrough")
    };
    assert_eq!(raw.into_body().collect().await.unwrap(), "<p>hi</p>");
  }

  #[test]
  fn redirect_defaults() {
    let response = redirect("", None).unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(header_str(response.headers(), "location"), Some("/"));
    assert!(is_redirect_status(StatusCode::PERMANENT_REDIRECT));
    assert!(!is_redirect_status(StatusCode::OK));
  }

  #[test]
  fn json_helper_tags_envelope_kind() {
    let response = json(&json!([1]), Some(StatusCode::CREATED));
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(header_str(response.headers(), CONTENT_KIND), Some("json"));
  }
}
