/* demo/backend/rust/src/main.rs */

mod handlers;

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use sever_server::{CancellationToken, SeverServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use handlers::{get_user_handler, ticks_handler};

/// The parts of the build's `routes.json` the server cares about.
#[derive(Deserialize)]
struct BuiltRoutes {
  expose_error_stacks: bool,
  routes: Vec<BuiltRoute>,
}

#[derive(Deserialize)]
struct BuiltRoute {
  kind: String,
  route: String,
}

fn load_built_routes(dir: &str) -> Option<BuiltRoutes> {
  let path = Path::new(dir).join("routes.json");
  let content = std::fs::read_to_string(&path).ok()?;
  match serde_json::from_str(&content) {
    Ok(routes) => Some(routes),
    Err(e) => {
      warn!(path = %path.display(), error = %e, "ignoring unreadable routes manifest");
      None
    }
  }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sever=info"));
  tracing_subscriber::fmt().with_env_filter(filter).init();

  let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
  let addr = format!("0.0.0.0:{port}");
  let shutdown = CancellationToken::new();

  let mut server = SeverServer::new()
    .handler(get_user_handler())
    .handler(ticks_handler(shutdown.clone(), Duration::from_secs(1)));

  // Build output is optional; without it the server runs with defaults.
  let build_dir = env::var("SEVER_OUTPUT_DIR").unwrap_or_else(|_| ".sever/output".to_string());
  let built = load_built_routes(&build_dir);
  if let Some(built) = &built {
    server = server.expose_error_stacks(built.expose_error_stacks);
  }

  let parts = server.into_parts();
  if let Some(built) = &built {
    for route in built.routes.iter().filter(|r| r.kind == "fetch") {
      if !parts.registry.has(&route.route) {
        warn!(route = %route.route, "built route has no registered handler");
      }
    }
  }

  let router = sever_server_axum::build_router(parts);
  let listener = tokio::net::TcpListener::bind(&addr).await?;
  info!("sever demo running on http://localhost:{port}");

  let signal = shutdown.clone();
  axum::serve(listener, router)
    .with_graceful_shutdown(async move {
      let _ = tokio::signal::ctrl_c().await;
      signal.cancel();
    })
    .await?;
  Ok(())
}
