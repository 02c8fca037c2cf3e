/* src/client/rust/src/fetcher.rs */

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderValue, LOCATION};
use http::{Request, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sever_protocol::headers::ORIGIN;
use sever_protocol::{
  Body, Origin, Payload, Reply, RequestOptions, ResponseType, Serializer, Serializers,
  ServerFnError, build_request, decode_response,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ClientError;
use crate::transport::Transport;

/// Client-side stand-in for one boundary implementation.
#[derive(Clone)]
pub struct Fetcher {
  route: String,
  defaults: RequestOptions,
  serializers: Serializers,
  transport: Arc<dyn Transport>,
}

impl fmt::Debug for Fetcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Fetcher")
      .field("route", &self.route)
      .field("defaults", &self.defaults)
      .field("serializers", &self.serializers.len())
      .finish_non_exhaustive()
  }
}

/// Binds `route` to a transport. `defaults` apply to every call and can be
/// overridden per call.
pub fn create_fetcher(
  route: impl Into<String>,
  defaults: Option<RequestOptions>,
  transport: Arc<dyn Transport>,
) -> Fetcher {
  Fetcher {
    route: route.into(),
    defaults: defaults.unwrap_or_default(),
    serializers: Serializers::new(),
    transport,
  }
}

impl Fetcher {
  /// The route this fetcher calls, relative to the transport's base URL.
  pub fn url(&self) -> &str {
    &self.route
  }

  pub fn defaults(&self) -> &RequestOptions {
    &self.defaults
  }

  pub fn serializer(mut self, serializer: Serializer) -> Self {
    self.serializers.push(serializer);
    self
  }

  pub fn serializers(mut self, serializers: Serializers) -> Self {
    self.serializers = serializers;
    self
  }

  /// A copy of this fetcher whose defaults are merged with `options`.
  pub fn with_request(&self, options: &RequestOptions) -> Self {
    let mut next = self.clone();
    next.defaults = RequestOptions::merge([&self.defaults, options]);
    next
  }

  /// Invokes the remote implementation. Error envelopes and thrown outcomes
  /// come back as `Err`; raw responses, including reconstructed redirects,
  /// come back as [`Reply::Response`].
  pub async fn call(
    &self,
    payload: Payload,
    options: Option<&RequestOptions>,
  ) -> Result<Reply, ClientError> {
    let merged = RequestOptions::merge(std::iter::once(&self.defaults).chain(options));
    let request = build_request(&self.route, &payload, &self.serializers, &merged, Origin::Client)?;
    debug!(route = %self.route, method = %request.method(), "calling server function");
    self.fetch(request).await
  }

  /// Like [`Fetcher::call`], aborting the in-flight request when `cancel`
  /// fires.
  pub async fn call_with_cancel(
    &self,
    payload: Payload,
    options: Option<&RequestOptions>,
    cancel: &CancellationToken,
  ) -> Result<Reply, ClientError> {
    tokio::select! {
      biased;
      () = cancel.cancelled() => {
        debug!(route = %self.route, "server function call cancelled");
        Err(ClientError::Cancelled)
      }
      reply = self.call(payload, options) => reply,
    }
  }

  /// Positional JSON arguments in, typed JSON result out.
  pub async fn call_json<T: DeserializeOwned>(&self, args: Vec<Value>) -> Result<T, ClientError> {
    match self.call(Payload::args(args), None).await? {
      Reply::Json(value) => Ok(serde_json::from_value(value)?),
      Reply::Text(text) => Ok(serde_json::from_value(Value::String(text))?),
      Reply::Error(err) => Err(ClientError::Remote(err)),
      Reply::Response(response) => Err(ClientError::Decode(describe_raw(&response))),
    }
  }

  /// Sends an already framed request and decodes the reply. Requests without
  /// an origin tag are tagged as client calls.
  pub async fn fetch(&self, mut request: Request<Body>) -> Result<Reply, ClientError> {
    if !request.headers().contains_key(ORIGIN) {
      request.headers_mut().insert(ORIGIN, HeaderValue::from_static(Origin::Client.as_str()));
    }
    let response = self.transport.send(request).await.map_err(ClientError::Transport)?;
    let decoded = decode_response(response).await?;
    match (decoded.response_type, decoded.reply) {
      (_, Reply::Error(err)) => Err(ClientError::Remote(err)),
      (ResponseType::Throw, Reply::Json(value)) => Err(ClientError::Remote(thrown(value))),
      (ResponseType::Throw, Reply::Text(text)) => Err(ClientError::Remote(ServerFnError::new(text))),
      (_, reply) => Ok(reply),
    }
  }
}

fn thrown(value: Value) -> ServerFnError {
  match value {
    Value::String(message) => ServerFnError::new(message),
    other => serde_json::from_value(other.clone())
      .unwrap_or_else(|_| ServerFnError::new(other.to_string())),
  }
}

fn describe_raw(response: &Response<Body>) -> String {
  match response.headers().get(LOCATION).and_then(|v| v.to_str().ok()) {
    Some(location) => format!("expected JSON, got a {} redirect to {location}", response.status()),
    None => format!("expected JSON, got a {} response", response.status()),
  }
}
