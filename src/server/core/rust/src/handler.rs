/* src/server/core/rust/src/handler.rs */

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use futures_util::FutureExt;
use http::{HeaderMap, Method, Request, Response, Uri};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use sever_protocol::headers::header_str;
use sever_protocol::{
  Body, Origin, Outcome, Payload, Reply, RequestOptions, ResponseType, Serializers, ServerFnError,
  build_request, decode_response,
};
use tracing::debug;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

pub type HandlerResult = Result<Outcome, ServerFnError>;

pub type ImplementationFn = Arc<dyn Fn(Payload, FetchEvent) -> BoxFuture<HandlerResult> + Send + Sync>;

const CLOSURE_HINT: &str = " You probably are using a variable defined in a closure in your server function. Make sure you pass any variables needed to the server function as arguments. These arguments must be serializable.";

fn undefined_re() -> Option<&'static Regex> {
  static RE: OnceLock<Option<Regex>> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"[A-Za-z]+ is not defined").ok()).as_ref()
}

/// Appends closure-capture guidance to "x is not defined" failures.
pub fn with_closure_hint(mut err: ServerFnError) -> ServerFnError {
  if undefined_re().is_some_and(|re| re.is_match(&err.message)) && !err.message.contains(CLOSURE_HINT) {
    err.message = format!("{}\n{CLOSURE_HINT}", err.message);
  }
  err
}

fn panic_error(payload: Box<dyn Any + Send>) -> ServerFnError {
  let detail = payload
    .downcast_ref::<&str>()
    .map(|s| (*s).to_string())
    .or_else(|| payload.downcast_ref::<String>().cloned())
    .unwrap_or_else(|| "unknown panic".to_string());
  ServerFnError::new(format!("server function panicked: {detail}")).with_status(500)
}

/// The invocation context an implementation sees.
#[derive(Debug, Clone)]
pub struct FetchEvent {
  pub route: String,
  pub method: Method,
  pub uri: Uri,
  pub headers: HeaderMap,
}

impl FetchEvent {
  pub fn from_request<B>(request: &Request<B>, route: &str) -> Self {
    Self {
      route: route.to_string(),
      method: request.method().clone(),
      uri: request.uri().clone(),
      headers: request.headers().clone(),
    }
  }

  pub fn origin(&self) -> Option<Origin> {
    Origin::from_headers(&self.headers)
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    header_str(&self.headers, name)
  }
}

/// A registered implementation bound to its route.
#[derive(Clone)]
pub struct Handler {
  route: String,
  implementation: ImplementationFn,
  defaults: RequestOptions,
}

/// Wraps an implementation so it can be registered under `route`.
pub fn create_handler<F, Fut, O>(implementation: F, route: impl Into<String>, defaults: Option<RequestOptions>) -> Handler
where
  F: Fn(Payload, FetchEvent) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<O, ServerFnError>> + Send + 'static,
  O: Into<Outcome>,
{
  let implementation: ImplementationFn = Arc::new(move |payload, event| {
    let fut = implementation(payload, event);
    Box::pin(async move { fut.await.map(Into::into) })
  });
  Handler { route: route.into(), implementation, defaults: defaults.unwrap_or_default() }
}

impl Handler {
  pub fn route(&self) -> &str {
    &self.route
  }

  pub fn defaults(&self) -> &RequestOptions {
    &self.defaults
  }

  /// Runs the implementation. Panics become 500 errors.
  pub async fn invoke(&self, payload: Payload, event: FetchEvent) -> HandlerResult {
    let started = std::panic::catch_unwind(AssertUnwindSafe(|| (self.implementation)(payload, event)));
    let result = match started {
      Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await.unwrap_or_else(|p| Err(panic_error(p))),
      Err(p) => Err(panic_error(p)),
    };
    result.map_err(with_closure_hint)
  }

  /// Calls the implementation in-process. The implementation still observes a
  /// request, tagged with the `server` origin and built from the merged
  /// options, and the outcome is read back the way a remote caller reads it.
  pub async fn call(&self, payload: Payload, options: Option<&RequestOptions>) -> Result<Reply, ServerFnError> {
    let merged = RequestOptions::merge(std::iter::once(&self.defaults).chain(options));
    let request = build_request(&self.route, &payload, &Serializers::new(), &merged, Origin::Server)
      .map_err(|e| ServerFnError::new(e.to_string()).with_status(400))?;
    let event = FetchEvent::from_request(&request, &self.route);
    debug!(route = %self.route, "executing server function in-process");
    match self.invoke(payload, event).await? {
      Outcome::Value(value) => Ok(Reply::Json(value)),
      Outcome::Empty => Ok(Reply::Json(Value::Null)),
      Outcome::Response(response) => decode_in_process(response).await,
      Outcome::Error(err) => Err(err),
    }
  }

  /// In-process call with positional JSON arguments and a typed result.
  pub async fn call_json<T: DeserializeOwned>(&self, args: Vec<Value>) -> Result<T, ServerFnError> {
    match self.call(Payload::args(args), None).await? {
      Reply::Json(value) => Ok(serde_json::from_value(value)?),
      Reply::Text(text) => Ok(serde_json::from_value(Value::String(text))?),
      Reply::Error(err) => Err(err),
      Reply::Response(response) => {
        Err(ServerFnError::new(format!("expected JSON, got a {} response", response.status())))
      }
    }
  }
}

/// Reads a raw response back the same way the client fetcher does, so
/// `json(..)` and tunnelled redirects look alike over the wire and in-process.
async fn decode_in_process(response: Response<Body>) -> Result<Reply, ServerFnError> {
  let decoded =
    decode_response(response).await.map_err(|e| ServerFnError::new(e.to_string()).with_status(500))?;
  match (decoded.response_type, decoded.reply) {
    (_, Reply::Error(err)) => Err(err),
    (ResponseType::Throw, Reply::Json(Value::String(message)) | Reply::Text(message)) => {
      Err(ServerFnError::new(message))
    }
    (ResponseType::Throw, Reply::Json(value)) => {
      Err(serde_json::from_value(value.clone()).unwrap_or_else(|_| ServerFnError::new(value.to_string())))
    }
    (_, reply) => Ok(reply),
  }
}

impl std::fmt::Debug for Handler {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Handler").field("route", &self.route).field("defaults", &self.defaults).finish()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use sever_protocol::Body;
  use sever_protocol::headers::ORIGIN;

  use super::*;

  fn empty_request_event(route: &str) -> FetchEvent {
    FetchEvent::from_request(&Request::new(Body::Empty), route)
  }

  fn echo() -> Handler {
    create_handler(
      |payload: Payload, event: FetchEvent| async move {
        Ok::<_, ServerFnError>(json!({
          "args": payload.arguments(),
          "origin": event.header(ORIGIN),
          "method": event.method.as_str(),
          "trace": event.header("x-trace"),
        }))
      },
      "/_m/echo/0/fn",
      Some(RequestOptions::new().header("x-trace", "default")),
    )
  }

  #[tokio::test]
  async fn in_process_call_sees_a_server_request() {
    let value: Value = echo().call_json(vec![json!(1), json!("two")]).await.unwrap();
    assert_eq!(
      value,
      json!({ "args": [1, "two"], "origin": "server", "method": "POST", "trace": "default" })
    );
  }

  #[tokio::test]
  async fn call_options_override_defaults() {
    let options = RequestOptions::new().header("x-trace", "call");
    let Reply::Json(value) = echo().call(Payload::none(), Some(&options)).await.unwrap() else {
      panic!("expected json")
    };
    assert_eq!(value["trace"], "call");
  }

  #[tokio::test]
  async fn in_process_call_decodes_json_responses() {
    let handler = create_handler(
      |_: Payload, _: FetchEvent| async move {
        Ok::<_, ServerFnError>(sever_protocol::json(&json!({ "id": 1 }), None))
      },
      "/_m/user/0/fn",
      None,
    );
    let Reply::Json(value) = handler.call(Payload::none(), None).await.unwrap() else {
      panic!("expected json")
    };
    assert_eq!(value, json!({ "id": 1 }));
    let typed: Value = handler.call_json(vec![]).await.unwrap();
    assert_eq!(typed["id"], 1);
  }

  #[tokio::test]
  async fn in_process_call_keeps_redirects() {
    let handler = create_handler(
      |_: Payload, _: FetchEvent| async move {
        sever_protocol::redirect("/login", None).map_err(|e| ServerFnError::new(e.to_string()))
      },
      "/_m/auth/0/fn",
      None,
    );
    let Reply::Response(response) = handler.call(Payload::none(), None).await.unwrap() else {
      panic!("expected a response")
    };
    assert_eq!(response.status(), 302);
    assert_eq!(response.headers()["location"], "/login");
  }

  #[tokio::test]
  async fn panics_become_errors() {
    let handler = create_handler(
      |_: Payload, _: FetchEvent| async move {
        if true {
          panic!("kaboom");
        }
        Ok::<_, ServerFnError>(())
      },
      "/_m/p/0/fn",
      None,
    );
    let err = handler.invoke(Payload::none(), empty_request_event("/_m/p/0/fn")).await.unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(err.message.contains("kaboom"));
  }

  #[test]
  fn closure_hint_is_appended_once() {
    let err = with_closure_hint(ServerFnError::new("db is not defined"));
    assert!(err.message.starts_with("db is not defined\n"));
    assert!(err.message.contains("closure"));
    assert_eq!(with_closure_hint(err.clone()), err);
    assert_eq!(with_closure_hint(ServerFnError::new("boom")).message, "boom");
  }
}
