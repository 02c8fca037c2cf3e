/* src/server/core/rust/src/dispatch.rs */

use http::{Request, Response};
use sever_protocol::{
  Body, EncodeOptions, Origin, Outcome, ResponseType, ServerFnError, encode_outcome,
  is_boundary_path,
};
use tracing::{debug, error, warn};

use crate::errors::SeverError;
use crate::parse::parse_request;
use crate::registry::HandlerRegistry;
use crate::server::ServerOptions;

/// Serves one boundary request. Returns `None` for paths outside the route
/// prefix so the host can fall through to its own routes.
pub async fn handle_event(
  registry: &HandlerRegistry,
  request: Request<Body>,
  options: &ServerOptions,
) -> Option<Response<Body>> {
  let path = request.uri().path().to_string();
  if !is_boundary_path(&path) {
    return None;
  }

  let mut encode = EncodeOptions {
    origin: Origin::from_headers(request.headers()),
    response_type: ResponseType::Return,
    expose_stack: options.expose_error_stacks,
  };

  let Some(handler) = registry.get(&path) else {
    warn!(route = %path, "no handler registered");
    let err = SeverError::not_found(format!("Handler Not Found for {path}"));
    encode.response_type = ResponseType::Throw;
    return Some(encode_outcome(Outcome::Error(err.into()), encode));
  };

  let parsed = match parse_request(request, &options.deserializers).await {
    Ok(parsed) => parsed,
    Err(err) => {
      debug!(route = %path, error = %err, "rejected request payload");
      encode.response_type = ResponseType::Throw;
      return Some(encode_outcome(Outcome::Error(err.into()), encode));
    }
  };

  let outcome = match handler.invoke(parsed.payload, parsed.event).await {
    Ok(outcome) => outcome,
    Err(err) => {
      log_failure(&path, &err);
      encode.response_type = ResponseType::Throw;
      Outcome::Error(err)
    }
  };
  Some(encode_outcome(outcome, encode))
}

fn log_failure(route: &str, err: &ServerFnError) {
  let status = err.status_code();
  if status >= 500 {
    error!(route, status, error = %err, "server function failed");
  } else {
    debug!(route, status, error = %err, "server function rejected call");
  }
}

#[cfg(test)]
mod tests {
  use http::StatusCode;
  use http::header::LOCATION;
  use serde_json::{Value, json};
  use sever_protocol::headers::{CONTENT_KIND, LOCATION as TUNNEL_LOCATION, RESPONSE_TYPE};
  use sever_protocol::{
    Deserializer, FormData, Payload, RequestOptions, Serializers, build_request, redirect,
  };

  use super::*;
  use crate::handler::{FetchEvent, create_handler};

  fn registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.add(create_handler(
      |payload: Payload, _: FetchEvent| async move {
        let name: String = payload.arg(0)?;
        Ok::<_, ServerFnError>(json!(format!("hi {name}")))
      },
      "/_m/app/hello/0/hello",
      None,
    ));
    registry.add(create_handler(
      |_: Payload, _: FetchEvent| async move { Err::<(), _>(ServerFnError::new("boom")) },
      "/_m/app/hello/1/fail",
      None,
    ));
    registry.add(create_handler(
      |_: Payload, _: FetchEvent| async move {
        redirect("/login", None).map_err(|e| ServerFnError::new(e.to_string()))
      },
      "/_m/app/hello/2/guard",
      None,
    ));
    registry.add(create_handler(
      |payload: Payload, _: FetchEvent| async move {
        let title = payload.form().and_then(|f| f.get_text("title")).unwrap_or("").to_string();
        Ok::<_, ServerFnError>(json!(title))
      },
      "/_m/app/hello/3/upload",
      None,
    ));
    registry.add(create_handler(
      |payload: Payload, _: FetchEvent| async move {
        Ok::<_, ServerFnError>(json!(payload.arguments()))
      },
      "/_m/app/hello/4/echo",
      None,
    ));
    registry
  }

  fn options() -> ServerOptions {
    ServerOptions { expose_error_stacks: false, ..Default::default() }
  }

  fn call(route: &str, args: Vec<Value>, opts: &RequestOptions) -> Request<Body> {
    build_request(route, &Payload::args(args), &Serializers::new(), opts, Origin::Client).unwrap()
  }

  async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  #[tokio::test]
  async fn paths_outside_prefix_fall_through() {
    let request = Request::builder().uri("/api/users").body(Body::Empty).unwrap();
    assert!(handle_event(&registry(), request, &options()).await.is_none());
  }

  #[tokio::test]
  async fn unknown_route_is_404_envelope() {
    let request = call("/_m/app/missing/0/fn", vec![], &RequestOptions::new());
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.headers()[CONTENT_KIND], "error");
    assert_eq!(response.headers()[RESPONSE_TYPE], "throw");
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Handler Not Found for /_m/app/missing/0/fn");
    assert_eq!(body["error"]["status"], 404);
  }

  #[tokio::test]
  async fn value_is_json_with_return_type() {
    let request = call("/_m/app/hello/0/hello", vec![json!("Ada")], &RequestOptions::new());
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_KIND], "json");
    assert_eq!(response.headers()[RESPONSE_TYPE], "return");
    assert_eq!(body_json(response).await, json!("hi Ada"));
  }

  #[tokio::test]
  async fn get_calls_read_the_query() {
    let request = call("/_m/app/hello/0/hello", vec![json!("Bo")], &RequestOptions::get());
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(body_json(response).await, json!("hi Bo"));
  }

  #[tokio::test]
  async fn failures_are_thrown_error_envelopes() {
    let request = call("/_m/app/hello/1/fail", vec![], &RequestOptions::new());
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()[CONTENT_KIND], "error");
    assert_eq!(response.headers()[RESPONSE_TYPE], "throw");
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "boom");
    assert!(body["error"].get("stack").is_none());
  }

  #[tokio::test]
  async fn stacks_are_exposed_when_enabled() {
    let request = call("/_m/app/hello/1/fail", vec![], &RequestOptions::new());
    let opts = ServerOptions { expose_error_stacks: true, ..Default::default() };
    let body = body_json(handle_event(&registry(), request, &opts).await.unwrap()).await;
    let stack = body["error"]["stack"].as_str().unwrap();
    assert!(stack.ends_with("boom"));
  }

  #[tokio::test]
  async fn bad_argument_type_is_400() {
    let request = call("/_m/app/hello/0/hello", vec![json!(7)], &RequestOptions::new());
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
  }

  #[tokio::test]
  async fn client_redirects_are_tunnelled() {
    let request = call("/_m/app/hello/2/guard", vec![], &RequestOptions::new());
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[TUNNEL_LOCATION], "/login");
    assert_eq!(response.headers()[CONTENT_KIND], "response");
  }

  #[tokio::test]
  async fn server_origin_redirects_pass_through() {
    let request = build_request(
      "/_m/app/hello/2/guard",
      &Payload::none(),
      &Serializers::new(),
      &RequestOptions::new(),
      Origin::Server,
    )
    .unwrap();
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "/login");
  }

  #[tokio::test]
  async fn forms_reach_the_implementation() {
    let mut form = FormData::new();
    form.append("title", "notes");
    let request = build_request(
      "/_m/app/hello/3/upload",
      &Payload::Form(form),
      &Serializers::new(),
      &RequestOptions::new(),
      Origin::Client,
    )
    .unwrap();
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(body_json(response).await, json!("notes"));
  }

  #[tokio::test]
  async fn deserializers_rewrite_arguments() {
    let mut opts = options();
    opts.deserializers.push(Deserializer::new(
      |v| v.get("$date").is_some(),
      |v, _| v["$date"].clone(),
    ));
    let request =
      call("/_m/app/hello/4/echo", vec![json!({ "$date": "2024-01-01" })], &RequestOptions::new());
    let response = handle_event(&registry(), request, &opts).await.unwrap();
    assert_eq!(body_json(response).await, json!(["2024-01-01"]));
  }

  #[tokio::test]
  async fn malformed_body_is_400() {
    let request = Request::builder()
      .uri("/_m/app/hello/0/hello")
      .header("content-type", "application/json")
      .body(Body::from("[oops"))
      .unwrap();
    let response = handle_event(&registry(), request, &options()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()[RESPONSE_TYPE], "throw");
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Error parsing request body: [oops");
  }
}
