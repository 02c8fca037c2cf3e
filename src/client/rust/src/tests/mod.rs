/* src/client/rust/src/tests/mod.rs */

use std::sync::Arc;
use std::time::Duration;

use http::{Request, Response, StatusCode};
use serde_json::{Value, json};
use sever_protocol::headers::ORIGIN;
use sever_protocol::{Body, BoxError, Deserializer, redirect};
use sever_server::{FetchEvent, SeverParts, SeverServer, create_handler};

use super::*;

/// Serves requests straight from a frozen registry.
struct InProcess(SeverParts);

impl Transport for InProcess {
  fn send(&self, request: Request<Body>) -> BoxFuture<'_, Result<Response<Body>, BoxError>> {
    Box::pin(async move {
      self.0.handle(request).await.ok_or_else(|| BoxError::from("route outside the boundary prefix"))
    })
  }
}

fn transport() -> Arc<dyn Transport> {
  let server = SeverServer::new()
    .handler(create_handler(
      |payload: Payload, event: FetchEvent| async move {
        let name: String = payload.arg(0)?;
        Ok::<_, ServerFnError>(json!({
          "greeting": format!("hi {name}"),
          "origin": event.header(ORIGIN),
          "method": event.method.as_str(),
        }))
      },
      "/_m/app/hello/0/greet",
      None,
    ))
    .handler(create_handler(
      |_: Payload, _: FetchEvent| async move {
        Err::<(), _>(ServerFnError::new("db is not defined"))
      },
      "/_m/app/hello/1/broken",
      None,
    ))
    .handler(create_handler(
      |_: Payload, _: FetchEvent| async move {
        redirect("/login", None).map_err(|e| ServerFnError::new(e.to_string()))
      },
      "/_m/app/hello/2/guard",
      None,
    ))
    .handler(create_handler(
      |_: Payload, _: FetchEvent| async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok::<_, ServerFnError>(())
      },
      "/_m/app/hello/3/slow",
      None,
    ))
    .handler(create_handler(
      |payload: Payload, _: FetchEvent| async move {
        Ok::<_, ServerFnError>(json!(payload.arguments()))
      },
      "/_m/app/hello/4/echo",
      None,
    ))
    .deserializer(Deserializer::new(|v| v.get("$set").is_some(), |v, _| v["$set"].clone()))
    .expose_error_stacks(false);
  Arc::new(InProcess(server.into_parts()))
}

#[tokio::test]
async fn call_json_reaches_the_implementation_as_a_client() {
  let fetcher = create_fetcher("/_m/app/hello/0/greet", None, transport());
  let value: Value = fetcher.call_json(vec![json!("Ada")]).await.unwrap();
  assert_eq!(value, json!({ "greeting": "hi Ada", "origin": "client", "method": "POST" }));
}

#[tokio::test]
async fn get_defaults_travel_in_the_query() {
  let fetcher =
    create_fetcher("/_m/app/hello/0/greet", Some(RequestOptions::get()), transport());
  let value: Value = fetcher.call_json(vec![json!("Bo")]).await.unwrap();
  assert_eq!(value["method"], "GET");
  assert_eq!(value["greeting"], "hi Bo");
}

#[tokio::test]
async fn remote_errors_keep_message_and_status() {
  let fetcher = create_fetcher("/_m/app/hello/1/broken", None, transport());
  let err = fetcher.call(Payload::none(), None).await.unwrap_err();
  assert_eq!(err.status(), Some(500));
  let remote = err.remote().unwrap();
  assert!(remote.message.starts_with("db is not defined\n"));
  assert!(remote.message.contains("closure"));
}

#[tokio::test]
async fn missing_handlers_are_404() {
  let fetcher = create_fetcher("/_m/app/hello/9/missing", None, transport());
  let err = fetcher.call(Payload::none(), None).await.unwrap_err();
  assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn tunnelled_redirects_are_rebuilt() {
  let fetcher = create_fetcher("/_m/app/hello/2/guard", None, transport());
  let Reply::Response(response) = fetcher.call(Payload::none(), None).await.unwrap() else {
    panic!("expected a redirect response")
  };
  assert_eq!(response.status(), StatusCode::FOUND);
  assert_eq!(response.headers()["location"], "/login");

  let err = fetcher.call_json::<Value>(vec![]).await.unwrap_err();
  assert!(matches!(err, ClientError::Decode(msg) if msg.contains("/login")));
}

#[tokio::test]
async fn cancellation_aborts_the_call() {
  let fetcher = create_fetcher("/_m/app/hello/3/slow", None, transport());
  let cancel = CancellationToken::new();
  let trigger = cancel.clone();
  tokio::spawn(async move {
    tokio::time::sleep(Duration::from_millis(20)).await;
    trigger.cancel();
  });
  let err = fetcher.call_with_cancel(Payload::none(), None, &cancel).await.unwrap_err();
  assert!(matches!(err, ClientError::Cancelled));
}

#[tokio::test]
async fn serializers_and_deserializers_pair_up() {
  let fetcher = create_fetcher("/_m/app/hello/4/echo", None, transport()).serializer(
    Serializer::new(|v| v.as_array().is_some_and(|a| a.len() == 2 && a[0] == "set"), |v| {
      json!({ "$set": v[1].clone() })
    }),
  );
  let value: Value = fetcher.call_json(vec![json!(["set", [1, 2]])]).await.unwrap();
  assert_eq!(value, json!([[1, 2]]));
}

#[test]
fn with_request_merges_defaults() {
  let fetcher = create_fetcher(
    "/_m/app/hello/0/greet",
    Some(RequestOptions::new().header("x-a", "1").header("x-b", "2")),
    transport(),
  );
  let next = fetcher.with_request(&RequestOptions::get().header("x-b", "undefined"));
  assert_eq!(next.url(), "/_m/app/hello/0/greet");
  assert_eq!(next.defaults().method.as_deref(), Some("GET"));
  assert_eq!(next.defaults().headers.get("x-a").map(String::as_str), Some("1"));
  assert_eq!(fetcher.defaults().method, None);
}
