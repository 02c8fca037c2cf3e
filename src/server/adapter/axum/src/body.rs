/* src/server/adapter/axum/src/body.rs */

use futures_util::TryStreamExt;
use sever_server::Body;
use sever_server::sever_protocol::BoxError;

pub(crate) fn from_axum(body: axum::body::Body) -> Body {
  Body::from_stream(body.into_data_stream().map_err(BoxError::from))
}

pub(crate) fn into_axum(body: Body) -> axum::body::Body {
  match body {
    Body::Empty => axum::body::Body::empty(),
    Body::Full(bytes) => axum::body::Body::from(bytes),
    Body::Stream(stream) => axum::body::Body::from_stream(stream),
  }
}
