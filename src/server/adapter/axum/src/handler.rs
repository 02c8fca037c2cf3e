/* src/server/adapter/axum/src/handler.rs */

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sever_server::SeverParts;

use crate::body::{from_axum, into_axum};

pub(crate) async fn handle_boundary(State(parts): State<SeverParts>, request: Request) -> Response {
  let request = request.map(from_axum);
  match parts.handle(request).await {
    Some(response) => response.map(into_axum),
    None => StatusCode::NOT_FOUND.into_response(),
  }
}
