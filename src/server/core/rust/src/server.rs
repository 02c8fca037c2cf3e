/* src/server/core/rust/src/server.rs */

use std::sync::Arc;

use http::{Request, Response};
use sever_protocol::{Body, Deserializer, Deserializers};

use crate::dispatch::handle_event;
use crate::handler::Handler;
use crate::registry::HandlerRegistry;

#[derive(Clone)]
pub struct ServerOptions {
  /// Include stack traces in error envelopes. Defaults to on in debug builds.
  pub expose_error_stacks: bool,
  pub deserializers: Deserializers,
}

impl Default for ServerOptions {
  fn default() -> Self {
    Self { expose_error_stacks: cfg!(debug_assertions), deserializers: Deserializers::new() }
  }
}

impl std::fmt::Debug for ServerOptions {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ServerOptions")
      .field("expose_error_stacks", &self.expose_error_stacks)
      .field("deserializers", &self.deserializers.len())
      .finish()
  }
}

/// Framework-agnostic parts extracted from `SeverServer`.
/// Adapter crates consume this to mount the boundary endpoint.
#[derive(Clone, Debug)]
pub struct SeverParts {
  pub registry: Arc<HandlerRegistry>,
  pub options: Arc<ServerOptions>,
}

impl SeverParts {
  /// Dispatches one request; `None` when the path is outside the route prefix.
  pub async fn handle(&self, request: Request<Body>) -> Option<Response<Body>> {
    handle_event(&self.registry, request, &self.options).await
  }
}

#[derive(Debug, Default)]
pub struct SeverServer {
  registry: HandlerRegistry,
  options: ServerOptions,
}

impl SeverServer {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn handler(mut self, handler: Handler) -> Self {
    self.registry.add(handler);
    self
  }

  pub fn deserializer(mut self, deserializer: Deserializer) -> Self {
    self.options.deserializers.push(deserializer);
    self
  }

  pub fn expose_error_stacks(mut self, expose: bool) -> Self {
    self.options.expose_error_stacks = expose;
    self
  }

  pub fn options(mut self, options: ServerOptions) -> Self {
    self.options = options;
    self
  }

  pub fn into_parts(self) -> SeverParts {
    SeverParts { registry: Arc::new(self.registry), options: Arc::new(self.options) }
  }
}
