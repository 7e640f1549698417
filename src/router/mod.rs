//! # Router Module
//!
//! The router selects a handler for each request by evaluating composable
//! matchers in priority order.
//!
//! ## Overview
//!
//! - [`MuxMatcher`] is a closed set of predicates: `mock` (fixed result, for
//!   tests), `methods`, `pattern`, and the `and` / `or` combinators.
//! - The pattern compiler turns a delimited path template such as
//!   `/users/:id`, `/users/:id:` or `/users/{{id}}` into an anchored regex and
//!   a specificity score. Extracted values become the request's named
//!   arguments.
//! - [`Mux`] holds `(handler, matcher)` entries sorted by descending priority
//!   and dispatches to the first match, with not-found and panic fallbacks.
//!
//! ## Architecture
//!
//! Matching is two-phase:
//!
//! 1. **Registration**: [`MuxMatcher::test`] validates each matcher and
//!    settles its priority. Invalid matchers are skipped with a warning and
//!    duplicates (structurally equal matchers) are ignored.
//!
//! 2. **Dispatch**: entries are tried in order; `matches` may write named
//!    arguments into the request scope. Arguments from entries that did not
//!    match are rolled back before the next entry is tried.
//!
//! ## Priorities
//!
//! | Matcher | Default priority |
//! |---------|------------------|
//! | `methods` | `10 - min(n, 9)`, `0` with `*` |
//! | exact `pattern` | `len(pattern) * 10` |
//! | `pattern` with arguments | `literal bytes * 10 + arguments * 2` |
//! | `and` | sum of children |
//! | `or` | mean of children |
//!
//! ## Example
//!
//! ```rust
//! use kitmux::dispatcher::handler_fn;
//! use kitmux::router::{Mux, MuxMatcher};
//!
//! let mux = Mux::new()
//!     .handle("GET", "/pets/:id", handler_fn(|_w, _r| {}))
//!     .with(
//!         handler_fn(|_w, _r| {}),
//!         MuxMatcher::or(0.0, vec![
//!             MuxMatcher::pattern("/health"),
//!             MuxMatcher::pattern("/healthz"),
//!         ]),
//!     );
//! assert_eq!(mux.len(), 2);
//! ```

mod core;
mod matcher;
mod pattern;

pub use core::{Mux, MuxEntry};
pub use matcher::{
    AndMatcher, MethodsMatcher, MockMatcher, MuxMatcher, OrMatcher, PatternMatcher,
    METHOD_WILDCARD, STANDARD_METHODS,
};
pub use pattern::{
    CompiledPattern, DEFAULT_END, DEFAULT_START, MULTIPLIER_EXACT_PATTERN, MULTIPLIER_NAMED_ARGS,
};
