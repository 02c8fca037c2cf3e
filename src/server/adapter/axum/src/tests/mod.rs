/* src/server/adapter/axum/src/tests/mod.rs */

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use sever_server::sever_protocol::headers::{CONTENT_KIND, LOCATION, ORIGIN, RESPONSE_TYPE};
use sever_server::{FetchEvent, Payload, ServerFnError, create_handler, redirect};
use tower::ServiceExt;

use super::*;

fn app() -> Router {
  SeverServer::new()
    .handler(create_handler(
      |payload: Payload, _: FetchEvent| async move {
        let a: i64 = payload.arg(0)?;
        let b: i64 = payload.arg(1)?;
        Ok::<_, ServerFnError>(json!(a + b))
      },
      "/_m/math/0/add",
      None,
    ))
    .handler(create_handler(
      |_: Payload, _: FetchEvent| async move { Err::<(), _>(ServerFnError::new("boom")) },
      "/_m/math/1/fail",
      None,
    ))
    .handler(create_handler(
      |_: Payload, _: FetchEvent| async move {
        redirect("/login", None).map_err(|e| ServerFnError::new(e.to_string()))
      },
      "/_m/auth/0/guard",
      None,
    ))
    .expose_error_stacks(false)
    .into_axum_router()
}

fn client_post(uri: &str, body: &str) -> Request<Body> {
  Request::builder()
    .method("POST")
    .uri(uri)
    .header("content-type", "application/json")
    .header(ORIGIN, "client")
    .body(Body::from(body.to_string()))
    .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
  let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  serde_json::from_slice(&bytes).unwrap()
}

#[test]
fn into_axum_router_builds_without_panic() {
  let _router = SeverServer::new().into_axum_router();
}

#[tokio::test]
async fn json_call_round_trips() {
  let response = app().oneshot(client_post("/_m/math/0/add", "[2,3]")).await.unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  assert_eq!(response.headers()[CONTENT_KIND], "json");
  assert_eq!(json_body(response).await, json!(5));
}

#[tokio::test]
async fn unknown_route_is_404() {
  let response = app().oneshot(client_post("/_m/math/9/nope", "[]")).await.unwrap();
  assert_eq!(response.status(), StatusCode::NOT_FOUND);
  let body = json_body(response).await;
  assert_eq!(body["error"]["status"], 404);
}

#[tokio::test]
async fn thrown_errors_are_500() {
  let response = app().oneshot(client_post("/_m/math/1/fail", "[]")).await.unwrap();
  assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(response.headers()[RESPONSE_TYPE], "throw");
  assert_eq!(json_body(response).await["error"]["message"], "boom");
}

#[tokio::test]
async fn redirects_tunnel_through_204() {
  let response = app().oneshot(client_post("/_m/auth/0/guard", "[]")).await.unwrap();
  assert_eq!(response.status(), StatusCode::NO_CONTENT);
  assert_eq!(response.headers()[LOCATION], "/login");
}

#[tokio::test]
async fn other_paths_are_not_mounted() {
  let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
  let response = app().oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
