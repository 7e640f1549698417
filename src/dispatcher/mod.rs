//! # Dispatcher Module
//!
//! Handlers are what the mux dispatches to once a matcher accepts a request.
//!
//! ## Overview
//!
//! - [`Handler`] is the single-method trait every handler implements. It is
//!   object safe; the mux stores handlers as [`SharedHandler`]
//!   (`Arc<dyn Handler>`) so one handler can back several entries.
//! - [`handler_fn`] adapts a closure.
//! - [`HandlerRegistry`] maps names to handlers, used when a mux is built
//!   from a route table file.
//! - A few pass-through handlers cover common chores: [`redirect`],
//!   [`set_cookie`], [`max_bytes`] and [`chain`].
//!
//! ## Example
//!
//! ```rust
//! use http::StatusCode;
//! use kitmux::dispatcher::{chain, handler_fn, max_bytes, redirect, set_cookie};
//!
//! let upload = max_bytes(1024, handler_fn(|w, _r| {
//!     w.write_header(StatusCode::CREATED);
//! }));
//! let login = chain(Vec::new())
//!     .then(set_cookie("session=1; Path=/"))
//!     .then(redirect(StatusCode::SEE_OTHER, "/home"));
//! # let _ = (upload, login);
//! ```
//!
//! ## Error Handling
//!
//! Handlers do not return errors. They write an error response themselves
//! (usually through [`crate::server::http_error`]) or panic, in which case
//! the mux recovers and answers 500 or hands the payload to its panic handler.

mod core;
mod passthrough;

pub use core::{handler_fn, Handler, HandlerFn, HandlerRegistry, SharedHandler};
pub use passthrough::{
    chain, max_bytes, redirect, set_cookie, Chain, MaxBytes, Redirect, SetCookie,
};
