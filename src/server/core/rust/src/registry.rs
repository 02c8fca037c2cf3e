/* src/server/core/rust/src/registry.rs */

use std::collections::HashMap;

use tracing::{debug, info};

use crate::handler::Handler;

/// Route -> handler map. Populated at startup, then shared read-only.
#[derive(Clone, Debug, Default)]
pub struct HandlerRegistry {
  handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Registers `handler` under `route`; a later registration for the same
  /// route replaces the earlier one.
  pub fn register(&mut self, route: impl Into<String>, handler: Handler) {
    let route = route.into();
    info!(route = %route, "registering handler");
    if self.handlers.insert(route.clone(), handler).is_some() {
      debug!(route = %route, "replaced existing handler");
    }
  }

  /// Registers a handler under its own route.
  pub fn add(&mut self, handler: Handler) {
    let route = handler.route().to_string();
    self.register(route, handler);
  }

  pub fn get(&self, route: &str) -> Option<&Handler> {
    self.handlers.get(route)
  }

  pub fn has(&self, route: &str) -> bool {
    self.handlers.contains_key(route)
  }

  /// Registered routes, sorted.
  pub fn routes(&self) -> Vec<&str> {
    let mut routes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
    routes.sort_unstable();
    routes
  }

  pub fn len(&self) -> usize {
    self.handlers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.handlers.is_empty()
  }
}
