/* src/server/core/rust/src/lib.rs */

pub mod dispatch;
pub mod errors;
pub mod handler;
pub mod parse;
pub mod registry;
pub mod server;

/// Re-export the wire protocol for adapters and hosts
pub use sever_protocol;

// Re-exports for ergonomic use
pub use dispatch::handle_event;
pub use errors::SeverError;
pub use handler::{BoxFuture, FetchEvent, Handler, HandlerResult, create_handler, with_closure_hint};
pub use parse::{ParsedRequest, parse_request};
pub use registry::HandlerRegistry;
pub use server::{ServerOptions, SeverParts, SeverServer};
pub use sever_protocol::{
  Body, CancellationToken, Cleanup, Deserializer, EventSender, FormData, Outcome, Payload, Reply,
  RequestOptions, ServerFnError, event_stream, json, redirect,
};
