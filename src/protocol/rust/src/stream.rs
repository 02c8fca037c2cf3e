/* src/protocol/rust/src/stream.rs */

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Response};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::body::{Body, BoxError};
use crate::headers::EVENT_STREAM_MIME;

/// Handle for pushing server-sent events into an [`event_stream`] body.
#[derive(Clone)]
pub struct EventSender {
  tx: mpsc::UnboundedSender<Bytes>,
}

impl EventSender {
  /// Queues one `event:`/`data:` frame. Returns `false` once the stream has
  /// closed.
  pub fn send(&self, event: &str, data: &str) -> bool {
    let frame = format!("event: {event}\ndata: {data}\n\n");
    self.tx.send(Bytes::from(frame)).is_ok()
  }

  pub fn is_closed(&self) -> bool {
    self.tx.is_closed()
  }
}

pub type Cleanup = Box<dyn FnOnce() + Send>;

/// Runs the cleanup exactly once, whichever way the stream ends.
struct CloseGuard(Option<Cleanup>);

impl CloseGuard {
  fn close(&mut self) {
    if let Some(cleanup) = self.0.take() {
      cleanup();
    }
  }
}

impl Drop for CloseGuard {
  fn drop(&mut self) {
    self.close();
  }
}

struct State {
  rx: mpsc::UnboundedReceiver<Bytes>,
  cancel: CancellationToken,
  guard: CloseGuard,
}

/// Builds a `text/event-stream` response.
///
/// `init` receives the sender and returns the cleanup to run on close. The
/// body ends when `cancel` fires, when every sender is dropped, or when the
/// body itself is dropped.
pub fn event_stream<F>(cancel: CancellationToken, init: F) -> Response<Body>
where
  F: FnOnce(EventSender) -> Cleanup,
{
  let (tx, rx) = mpsc::unbounded_channel();
  let cleanup = init(EventSender { tx });
  let state = State { rx, cancel, guard: CloseGuard(Some(cleanup)) };

  let frames = futures_util::stream::unfold(state, |mut state| async move {
    let next = tokio::select! {
      biased;
      () = state.cancel.cancelled() => None,
      frame = state.rx.recv() => frame,
    };
    match next {
      Some(frame) => Some((Ok::<_, BoxError>(frame), state)),
      None => {
        state.rx.close();
        state.guard.close();
        None
      }
    }
  });

  let mut response = Response::new(Body::from_stream(frames));
  response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(EVENT_STREAM_MIME));
  response
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;
  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;

  fn counting_cleanup(count: &Arc<AtomicUsize>) -> Cleanup {
    let count = count.clone();
    Box::new(move || {
      count.fetch_add(1, Ordering::SeqCst);
    })
  }

  #[tokio::test]
  async fn frames_flow_until_senders_drop() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let response = event_stream(CancellationToken::new(), |send| {
      send.send("tick", "1");
      send.send("tick", "2");
      counting_cleanup(&cleanups)
    });
    assert_eq!(response.headers()[CONTENT_TYPE], EVENT_STREAM_MIME);
    let body = response.into_body().collect().await.unwrap();
    assert_eq!(body, "event: tick\ndata: 1\n\nevent: tick\ndata: 2\n\n");
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn cancellation_closes_once() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let cancel = CancellationToken::new();
    let mut kept = None;
    let response = event_stream(cancel.clone(), |send| {
      kept = Some(send);
      counting_cleanup(&cleanups)
    });
    cancel.cancel();
    let body = response.into_body().collect().await.unwrap();
    assert!(body.is_empty());
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
    let sender = kept.unwrap();
    assert!(!sender.send("late", "x"));
  }

  #[tokio::test]
  async fn dropping_the_body_runs_cleanup() {
    let cleanups = Arc::new(AtomicUsize::new(0));
    let response = event_stream(CancellationToken::new(), |send| {
      std::mem::forget(send.clone());
      counting_cleanup(&cleanups)
    });
    drop(response);
    assert_eq!(cleanups.load(Ordering::SeqCst), 1);
  }
}
