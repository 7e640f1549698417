//! # kitmux
//!
//! **kitmux** is a priority-ordered, composable HTTP request multiplexer with
//! RFC 2616 content negotiation and a minify/compress response pipeline.
//!
//! ## Overview
//!
//! A [`router::Mux`] holds `(handler, matcher)` entries. Matchers are small
//! predicates over a request (method set, path template) combined with `and`
//! / `or`; each one settles a numeric priority when it is registered, and the
//! mux tries entries from the highest priority down. Path templates extract
//! named arguments into the request's scope for the handler to read.
//!
//! Responses can be produced through the [`pipeline`]: the body is minified
//! by content type, then encoded with the best content coding the client
//! accepts, as chosen by [`negotiation::negotiate_content_encoding`].
//!
//! ## Architecture
//!
//! - **[`router`]** - Matchers, the pattern compiler and the mux
//! - **[`negotiation`]** - `Accept-Encoding` parsing and selection
//! - **[`server`]** - Request scope, the response writer trait and an in-memory recorder
//! - **[`dispatcher`]** - The handler trait and small pass-through handlers
//! - **[`compress`]** - gzip / deflate / brotli codecs, minifiers and content sniffing
//! - **[`pipeline`]** - Response state and the minify + compress handler
//! - **[`static_files`]** - Serving a directory through the pipeline
//! - **[`config`]** - Declarative route tables (YAML, TOML, JSON)
//! - **[`runtime_config`]** - Environment-driven defaults
//! - **[`logging`]** - `tracing-subscriber` setup for binaries
//! - **[`cli`]** - The `kitmux` inspection binary
//!
//! ### Dispatch Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Mux as router::Mux
//!     participant Matcher as MuxMatcher
//!     participant Handler
//!     participant Pipeline as pipeline::response_with
//!
//!     Client->>Mux: serve(writer, request)
//!     loop entries by descending priority
//!         Mux->>Matcher: matches(request)
//!         Matcher-->>Mux: bool (+ named args)
//!     end
//!     alt no entry matched
//!         Mux-->>Client: not-found handler or 404
//!     end
//!     Mux->>Handler: serve(writer, request)
//!     alt Handler Panics
//!         Mux-->>Client: panic handler or 500
//!     end
//!     Handler->>Pipeline: ResponseState
//!     Pipeline->>Pipeline: minify, negotiate, encode
//!     Pipeline-->>Client: status, headers, body
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use kitmux::dispatcher::handler_fn;
//! use kitmux::router::Mux;
//!
//! let mux = Mux::new()
//!     .handle("GET", "/pets/:id", handler_fn(|w, r| {
//!         let id = r.named_args().get("id").unwrap_or_default().to_string();
//!         let _ = w.write(id.as_bytes());
//!     }))
//!     .handle("GET", "/pets", handler_fn(|w, _r| {
//!         let _ = w.write(b"all pets");
//!     }));
//!
//! let req = http::Request::builder()
//!     .method(Method::GET)
//!     .uri("/pets/42")
//!     .body(Vec::new())
//!     .unwrap();
//! let resp = mux.respond(req);
//! assert_eq!(resp.body(), b"42");
//! ```
//!
//! ## Route Tables
//!
//! Routes can also be declared in a file and bound to named handlers, see
//! [`config::RouteTable`]. The `kitmux` binary lists a table in dispatch
//! order and simulates requests against it:
//!
//! ```bash
//! kitmux routes --config routes.yaml
//! kitmux match --config routes.yaml GET /pets/42 --accept-encoding br
//! ```
//!
//! ## Concurrency
//!
//! Registration takes `&mut Mux`; dispatch takes `&Mux` and only reads the
//! entry list, so a fully built mux can be shared across threads behind an
//! `Arc`. Per-request state lives in the [`server::Request`] value.

pub mod cli;
pub mod compress;
pub mod config;
pub mod dispatcher;
pub mod echo;
pub mod logging;
pub mod negotiation;
pub mod pipeline;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod static_files;

pub use dispatcher::{handler_fn, Handler, HandlerRegistry, SharedHandler};
pub use negotiation::negotiate_content_encoding;
pub use router::{Mux, MuxMatcher};
pub use server::{Request, ResponseRecorder, ResponseWriter};
