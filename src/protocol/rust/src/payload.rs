/* src/protocol/rust/src/payload.rs */

use std::collections::BTreeMap;

use bytes::{BufMut, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

/// Sentinel header value that removes a header while merging options.
pub const UNSET_HEADER: &str = "undefined";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
  Text(String),
  File { filename: String, content_type: Option<String>, data: Bytes },
}

/// Ordered multipart form fields. Repeated names are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
  entries: Vec<(String, FormValue)>,
}

impl FormData {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.entries.push((name.into(), FormValue::Text(value.into())));
  }

  pub fn append_file(
    &mut self,
    name: impl Into<String>,
    filename: impl Into<String>,
    content_type: Option<String>,
    data: impl Into<Bytes>,
  ) {
    let value = FormValue::File { filename: filename.into(), content_type, data: data.into() };
    self.entries.push((name.into(), value));
  }

  pub fn get(&self, name: &str) -> Option<&FormValue> {
    self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
  }

  pub fn get_text(&self, name: &str) -> Option<&str> {
    match self.get(name) {
      Some(FormValue::Text(text)) => Some(text),
      _ => None,
    }
  }

  pub fn entries(&self) -> &[(String, FormValue)] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Encodes the fields as a `multipart/form-data` body.
  pub fn encode(&self, boundary: &str) -> Bytes {
    let mut buf = BytesMut::new();
    for (name, value) in &self.entries {
      buf.put_slice(format!("--{boundary}\r\n").as_bytes());
      match value {
        FormValue::Text(text) => {
          buf.put_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", escape_quoted(name)).as_bytes(),
          );
          buf.put_slice(text.as_bytes());
        }
        FormValue::File { filename, content_type, data } => {
          buf.put_slice(
            format!(
              "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
              escape_quoted(name),
              escape_quoted(filename)
            )
            .as_bytes(),
          );
          let mime = content_type.as_deref().unwrap_or("application/octet-stream");
          buf.put_slice(format!("Content-Type: {mime}\r\n\r\n").as_bytes());
          buf.put_slice(data);
        }
      }
      buf.put_slice(b"\r\n");
    }
    buf.put_slice(format!("--{boundary}--\r\n").as_bytes());
    buf.freeze()
  }
}

fn escape_quoted(value: &str) -> String {
  value.replace('\\', "\\\\").replace('"', "\\\"").replace(['\r', '\n'], " ")
}

/// Fresh multipart boundary: 12 random bytes, hex encoded.
pub fn multipart_boundary() -> String {
  let bytes: [u8; 12] = rand::random();
  format!("----sever{}", hex::encode(bytes))
}

/// What a boundary call carries: JSON arguments or a form passed through
/// untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
  Json(Value),
  Form(FormData),
}

impl Payload {
  /// Positional arguments, sent as a JSON array.
  pub fn args(args: Vec<Value>) -> Self {
    Self::Json(Value::Array(args))
  }

  pub fn none() -> Self {
    Self::args(Vec::new())
  }

  /// Arguments as a list: an array spreads, any other JSON value is a
  /// single argument, a form contributes none.
  pub fn arguments(&self) -> Vec<Value> {
    match self {
      Self::Json(Value::Array(items)) => items.clone(),
      Self::Json(value) => vec![value.clone()],
      Self::Form(_) => Vec::new(),
    }
  }

  /// Deserializes the argument at `index`; a missing argument reads as `null`.
  pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, serde_json::Error> {
    let value = self.arguments().into_iter().nth(index).unwrap_or(Value::Null);
    serde_json::from_value(value)
  }

  pub fn form(&self) -> Option<&FormData> {
    match self {
      Self::Form(form) => Some(form),
      Self::Json(_) => None,
    }
  }
}

impl Default for Payload {
  fn default() -> Self {
    Self::none()
  }
}

impl From<FormData> for Payload {
  fn from(form: FormData) -> Self {
    Self::Form(form)
  }
}

/// Per-call request settings. Layers merge left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub method: Option<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub headers: BTreeMap<String, String>,
}

impl RequestOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get() -> Self {
    Self::new().method("GET")
  }

  pub fn method(mut self, method: impl Into<String>) -> Self {
    self.method = Some(method.into());
    self
  }

  pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.headers.insert(name.into().to_ascii_lowercase(), value.into());
    self
  }

  /// Later layers override earlier ones. A header whose value is
  /// [`UNSET_HEADER`] removes that header from the result.
  pub fn merge<'a>(layers: impl IntoIterator<Item = &'a RequestOptions>) -> Self {
    let mut merged = Self::new();
    for layer in layers {
      if layer.method.is_some() {
        merged.method.clone_from(&layer.method);
      }
      for (name, value) in &layer.headers {
        let name = name.to_ascii_lowercase();
        if value == UNSET_HEADER {
          merged.headers.remove(&name);
        } else {
          merged.headers.insert(name, value.clone());
        }
      }
    }
    merged
  }

  /// Effective method, `POST` unless set.
  pub fn http_method(&self) -> Result<Method, ProtocolError> {
    match &self.method {
      None => Ok(Method::POST),
      Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
        .map_err(|_| ProtocolError::InvalidMethod(m.clone())),
    }
  }

  pub fn header_map(&self) -> Result<HeaderMap, ProtocolError> {
    let mut map = HeaderMap::new();
    for (name, value) in &self.headers {
      let invalid = || ProtocolError::InvalidHeader { name: name.clone() };
      let header = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
      let value = HeaderValue::from_str(value).map_err(|_| invalid())?;
      map.insert(header, value);
    }
    Ok(map)
  }
}
