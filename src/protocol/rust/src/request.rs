/* src/protocol/rust/src/request.rs */

use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method, Request};

use crate::body::Body;
use crate::error::ProtocolError;
use crate::headers::{JSON_MIME, ORIGIN, Origin};
use crate::payload::{Payload, RequestOptions, multipart_boundary};
use crate::serializer::Serializers;

/// Query parameter carrying the JSON payload of a `GET` call.
pub const PAYLOAD_QUERY: &str = "payload";

/// Frames one boundary call as an HTTP request.
///
/// JSON payloads run through `serializers` and travel as the body, or as the
/// `payload` query parameter for `GET`. Forms travel as multipart bodies.
/// `options` headers are applied last, so they can override the defaults.
pub fn build_request(
  url: &str,
  payload: &Payload,
  serializers: &Serializers,
  options: &RequestOptions,
  origin: Origin,
) -> Result<Request<Body>, ProtocolError> {
  let method = options.http_method()?;
  let (uri, content_type, body) = match payload {
    Payload::Json(value) => {
      let text = serde_json::to_string(&serializers.encode(value))?;
      if method == Method::GET {
        let sep = if url.contains('?') { '&' } else { '?' };
        (format!("{url}{sep}{PAYLOAD_QUERY}={}", urlencoding::encode(&text)), None, Body::Empty)
      } else {
        (url.to_string(), Some(JSON_MIME.to_string()), Body::from(text))
      }
    }
    Payload::Form(form) => {
      let boundary = multipart_boundary();
      let body = Body::Full(form.encode(&boundary));
      (url.to_string(), Some(format!("multipart/form-data; boundary={boundary}")), body)
    }
  };

  let mut request = Request::builder().method(method).uri(uri).body(body)?;
  let headers = request.headers_mut();
  headers.insert(ORIGIN, HeaderValue::from_static(origin.as_str()));
  if let Some(content_type) = content_type {
    let value = HeaderValue::from_str(&content_type)
      .map_err(|_| ProtocolError::InvalidHeader { name: CONTENT_TYPE.to_string() })?;
    headers.insert(CONTENT_TYPE, value);
  }
  for (name, value) in options.header_map()? {
    if let Some(name) = name {
      headers.insert(name, value);
    }
  }
  Ok(request)
}

/// Extracts and decodes the `payload` query parameter.
pub fn payload_from_query(query: &str) -> Option<String> {
  query.split('&').find_map(|pair| {
    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
    if key != PAYLOAD_QUERY {
      return None;
    }
    urlencoding::decode(&value.replace('+', " ")).ok().map(|v| v.into_owned())
  })
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::headers::header_str;

  #[tokio::test]
  async fn post_carries_json_body() {
    let req = build_request(
      "/_m/app/0/fn",
      &Payload::args(vec![json!({ "id": 7 })]),
      &Serializers::new(),
      &RequestOptions::new(),
      Origin::Client,
    )
    .unwrap();
    assert_eq!(req.method(), Method::POST);
    assert_eq!(header_str(req.headers(), ORIGIN), Some("client"));
    assert_eq!(header_str(req.headers(), "content-type"), Some(JSON_MIME));
    let body = req.into_body().collect().await.unwrap();
    assert_eq!(body, "[{\"id\":7}]");
  }

  #[test]
  fn get_moves_payload_into_query() {
    let req = build_request(
      "http://localhost/_m/app/0/fn",
      &Payload::args(vec![json!("a b&c")]),
      &Serializers::new(),
      &RequestOptions::get(),
      Origin::Server,
    )
    .unwrap();
    assert_eq!(req.method(), Method::GET);
    assert!(req.headers().get(CONTENT_TYPE).is_none());
    let query = req.uri().query().unwrap();
    assert_eq!(payload_from_query(query).as_deref(), Some("[\"a b&c\"]"));
  }

  #[test]
  fn option_headers_override_defaults() {
    let options = RequestOptions::new().header("content-type", "application/vnd.custom+json");
    let req =
      build_request("/x", &Payload::none(), &Serializers::new(), &options, Origin::Client).unwrap();
    assert_eq!(header_str(req.headers(), "content-type"), Some("application/vnd.custom+json"));
  }

  #[test]
  fn form_payload_is_multipart() {
    let mut form = crate::payload::FormData::new();
    form.append("name", "x");
    let req =
      build_request("/x", &Payload::Form(form), &Serializers::new(), &RequestOptions::new(), Origin::Client)
        .unwrap();
    let content_type = header_str(req.headers(), "content-type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
  }
}
