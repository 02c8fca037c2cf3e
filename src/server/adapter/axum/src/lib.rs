/* src/server/adapter/axum/src/lib.rs */

mod body;
mod handler;

use axum::Router;
use axum::routing::any;
use sever_server::sever_protocol::ROUTE_PREFIX;
use sever_server::{SeverParts, SeverServer};
use tracing::info;

/// Re-export sever-server core for convenience
pub use sever_server;

/// Mounts the boundary endpoint (`/_m/*`) on a router. Merge the result into
/// the host application's router.
pub fn build_router(parts: SeverParts) -> Router {
  info!(handlers = parts.registry.len(), prefix = ROUTE_PREFIX, "mounting boundary routes");
  Router::new()
    .route(&format!("{ROUTE_PREFIX}/{{*path}}"), any(handler::handle_boundary))
    .with_state(parts)
}

/// Extension trait that converts a `SeverServer` into an Axum router.
pub trait IntoAxumRouter {
  fn into_axum_router(self) -> Router;
  fn serve(
    self,
    addr: &str,
  ) -> impl std::future::Future<Output = Result<(), Box<dyn std::error::Error>>> + Send;
}

impl IntoAxumRouter for SeverServer {
  fn into_axum_router(self) -> Router {
    build_router(self.into_parts())
  }

  async fn serve(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let router = self.into_axum_router();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("sever backend running on http://localhost:{}", local_addr.port());
    axum::serve(listener, router).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests;
