/* demo/backend/rust/src/handlers/ticks.rs */

use std::time::Duration;

use axum::http::Response;
use sever_server::{
  Body, CancellationToken, Cleanup, FetchEvent, Handler, Payload, ServerFnError,
  create_handler, event_stream,
};
use tracing::debug;

/// Route of `export const ticks = fetch$(...)` in `app/clock.js`.
pub const ROUTE: &str = "/_m/app/clock/0/ticks";

const DEFAULT_COUNT: u32 = 5;

/// Streams `count` tick events, one per `interval`. Every stream closes when
/// `shutdown` fires.
pub fn ticks_handler(shutdown: CancellationToken, interval: Duration) -> Handler {
  create_handler(
    move |payload: Payload, _: FetchEvent| {
      let cancel = shutdown.child_token();
      async move {
        let count = payload.arg::<Option<u32>>(0)?.unwrap_or(DEFAULT_COUNT);
        let response: Response<Body> = event_stream(cancel, move |sender| {
          let task = tokio::spawn(async move {
            for n in 1..=count {
              tokio::time::sleep(interval).await;
              if !sender.send("tick", &n.to_string()) {
                return;
              }
            }
          });
          let cleanup: Cleanup = Box::new(move || {
            debug!("tick stream closed");
            task.abort();
          });
          cleanup
        });
        Ok::<_, ServerFnError>(response)
      }
    },
    ROUTE,
    None,
  )
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use sever_server::Reply;

  use super::*;

  async fn collect(shutdown: CancellationToken, count: u32) -> String {
    let handler = ticks_handler(shutdown, Duration::from_millis(1));
    let reply = handler.call(Payload::args(vec![json!(count)]), None).await.unwrap();
    let Reply::Response(response) = reply else { panic!("expected a stream") };
    let bytes = response.into_body().collect().await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
  }

  #[tokio::test]
  async fn streams_the_requested_ticks() {
    let body = collect(CancellationToken::new(), 2).await;
    assert_eq!(body, "event: tick\ndata: 1\n\nevent: tick\ndata: 2\n\n");
  }

  #[tokio::test]
  async fn shutdown_closes_streams() {
    let shutdown = CancellationToken::new();
    shutdown.cancel();
    assert_eq!(collect(shutdown, 3).await, "");
  }
}
