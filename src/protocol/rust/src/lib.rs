/* src/protocol/rust/src/lib.rs */

pub mod body;
pub mod envelope;
pub mod error;
pub mod headers;
pub mod payload;
pub mod request;
pub mod serializer;
pub mod stream;

// Re-exports for ergonomic use
pub use body::{Body, BodyStream, BoxError};
pub use envelope::{
  Decoded, EncodeOptions, Outcome, Reply, decode_response, encode_outcome, is_redirect_status, json,
  redirect,
};
pub use error::{ProtocolError, ServerFnError};
pub use headers::{EnvelopeKind, Origin, ResponseType};
pub use payload::{FormData, FormValue, Payload, RequestOptions};
pub use request::{build_request, payload_from_query};
pub use serializer::{DeserializeCtx, Deserializer, Deserializers, Serializer, Serializers};
pub use stream::{Cleanup, EventSender, event_stream};
pub use tokio_util::sync::CancellationToken;

/// Every boundary route lives under this prefix.
pub const ROUTE_PREFIX: &str = "/_m";

pub fn is_boundary_path(path: &str) -> bool {
  path.strip_prefix(ROUTE_PREFIX).is_some_and(|rest| rest.starts_with('/'))
}
