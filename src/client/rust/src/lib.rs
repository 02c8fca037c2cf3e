/* src/client/rust/src/lib.rs */

mod error;
mod fetcher;
mod transport;

// Re-exports for ergonomic use
pub use error::ClientError;
pub use fetcher::{Fetcher, create_fetcher};
pub use sever_protocol::{
  CancellationToken, FormData, Payload, Reply, RequestOptions, Serializer, ServerFnError,
};
pub use transport::{BoxFuture, HttpTransport, Transport};

#[cfg(test)]
mod tests;
