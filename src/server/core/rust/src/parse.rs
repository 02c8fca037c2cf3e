/* src/server/core/rust/src/parse.rs */

use http::Request;
use http::header::CONTENT_TYPE;
use serde_json::Value;
use sever_protocol::headers::{JSON_MIME, header_str};
use sever_protocol::{
  Body, DeserializeCtx, Deserializers, FormData, Payload, payload_from_query,
};

use crate::errors::SeverError;
use crate::handler::FetchEvent;

/// An inbound boundary request, split into what the implementation needs.
#[derive(Debug)]
pub struct ParsedRequest {
  pub route: String,
  pub payload: Payload,
  pub event: FetchEvent,
}

fn mime_essence(content_type: &str) -> String {
  content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}

/// Decodes the payload of a boundary request: JSON bodies through the
/// deserializer chain, forms as [`FormData`], and `GET` calls from the
/// `payload` query parameter.
pub async fn parse_request(
  request: Request<Body>,
  deserializers: &Deserializers,
) -> Result<ParsedRequest, SeverError> {
  let route = request.uri().path().to_string();
  let event = FetchEvent::from_request(&request, &route);
  let content_type = header_str(request.headers(), CONTENT_TYPE.as_str()).map(str::to_string);
  let ctx = DeserializeCtx { path: &route, headers: &event.headers };

  let payload = match content_type.as_deref() {
    Some(ct) if mime_essence(ct) == JSON_MIME => {
      let bytes = request
        .into_body()
        .collect()
        .await
        .map_err(|e| SeverError::validation(format!("Error reading request body: {e}")))?;
      let text = String::from_utf8_lossy(&bytes);
      decode_json(&text, deserializers, &ctx)?
    }
    Some(ct) if ct.contains("form") => Payload::Form(parse_form(ct, request.into_body()).await?),
    _ => match request.uri().query().and_then(payload_from_query) {
      Some(text) => decode_json(&text, deserializers, &ctx)?,
      None => Payload::none(),
    },
  };

  Ok(ParsedRequest { route, payload, event })
}

fn decode_json(
  text: &str,
  deserializers: &Deserializers,
  ctx: &DeserializeCtx<'_>,
) -> Result<Payload, SeverError> {
  let value: Value = serde_json::from_str(text)
    .map_err(|_| SeverError::validation(format!("Error parsing request body: {text}")))?;
  Ok(Payload::Json(deserializers.decode(value, ctx)))
}

async fn parse_form(content_type: &str, body: Body) -> Result<FormData, SeverError> {
  if mime_essence(content_type) == "multipart/form-data" {
    return parse_multipart(content_type, body).await;
  }
  let bytes = body
    .collect()
    .await
    .map_err(|e| SeverError::validation(format!("Error reading request body: {e}")))?;
  let mut form = FormData::new();
  for pair in String::from_utf8_lossy(&bytes).split('&').filter(|p| !p.is_empty()) {
    let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
    let decode = |s: &str| {
      urlencoding::decode(&s.replace('+', " "))
        .map(|v| v.into_owned())
        .map_err(|e| SeverError::validation(format!("Malformed form field: {e}")))
    };
    form.append(decode(name)?, decode(value)?);
  }
  Ok(form)
}

async fn parse_multipart(content_type: &str, body: Body) -> Result<FormData, SeverError> {
  let boundary =
    multer::parse_boundary(content_type).map_err(|e| SeverError::validation(e.to_string()))?;
  let mut multipart = multer::Multipart::new(body.into_stream(), boundary);
  let mut form = FormData::new();
  let invalid = |e: multer::Error| SeverError::validation(format!("Malformed multipart body: {e}"));

  while let Some(field) = multipart.next_field().await.map_err(invalid)? {
    let name = field.name().unwrap_or_default().to_string();
    let filename = field.file_name().map(str::to_string);
    let mime = field.content_type().map(ToString::to_string);
    let data = field.bytes().await.map_err(invalid)?;
    match filename {
      Some(filename) => form.append_file(name, filename, mime, data),
      None => form.append(name, String::from_utf8_lossy(&data).into_owned()),
    }
  }
  Ok(form)
}
