/* src/client/rust/src/transport.rs */

use std::future::Future;
use std::pin::Pin;

use futures_util::TryStreamExt;
use http::{Request, Response};
use sever_protocol::{Body, BoxError};
use tracing::debug;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Sends a framed boundary request and returns the raw response. Dropping the
/// returned future aborts the request.
pub trait Transport: Send + Sync {
  fn send(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, BoxError>>;
}

/// Transport over HTTP; relative request URIs are resolved against `base_url`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: String,
}

impl HttpTransport {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self::with_client(reqwest::Client::new(), base_url)
  }

  pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
    Self { client, base_url: base_url.into().trim_end_matches('/').to_string() }
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  fn resolve(&self, request: &Request<Body>) -> String {
    let uri = request.uri();
    if uri.scheme().is_some() {
      return uri.to_string();
    }
    let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
    format!("{}{path}", self.base_url)
  }
}

impl Transport for HttpTransport {
  fn send(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, BoxError>> {
    let url = self.resolve(&request);
    Box::pin(async move {
      let (parts, body) = request.into_parts();
      debug!(method = %parts.method, url = %url, "sending boundary request");
      let body = reqwest::Body::from(body.collect().await?);
      let upstream =
        self.client.request(parts.method, &url).headers(parts.headers).body(body).send().await?;

      let mut response = Response::builder().status(upstream.status()).version(upstream.version());
      if let Some(headers) = response.headers_mut() {
        headers.extend(upstream.headers().clone());
      }
      let stream = upstream.bytes_stream().map_err(BoxError::from);
      Ok::<_, BoxError>(response.body(Body::from_stream(stream))?)
    })
  }
}
