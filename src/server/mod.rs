//! # Server Module
//!
//! The request/response abstraction the mux runs against. The host HTTP
//! server (hyper, a test harness, ...) converts its own types
//! into a [`Request`] and provides a [`ResponseWriter`]; nothing here accepts
//! sockets or terminates TLS.
//!
//! - [`Request`] wraps `http::Request<Vec<u8>>` and carries the per-request
//!   scope: named arguments, a recovered panic payload and a threaded
//!   [`crate::pipeline::ResponseState`].
//! - [`ResponseWriter`] exposes status, headers and raw writes, plus optional
//!   flush / push / hijack capabilities that degrade to `Unsupported`.
//! - [`ResponseRecorder`] is the in-memory writer used to bridge back into
//!   `http::Response` and in tests.

pub mod request;
pub mod response;

pub use request::{ArgVec, NamedArgs, Recovered, Request, MAX_INLINE_ARGS};
pub use response::{
    http_error, sent_event, status_text, Connection, ResponseRecorder, ResponseWriter,
    TEXT_PLAIN_UTF8,
};
