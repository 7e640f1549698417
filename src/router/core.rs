//! Router core: the priority-ordered entry list and the dispatch loop.

use super::matcher::MuxMatcher;
use crate::config::RouteTable;
use crate::dispatcher::{Handler, HandlerRegistry, SharedHandler};
use crate::server::{http_error, status_text, Recovered, Request, ResponseRecorder, ResponseWriter};
use http::StatusCode;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One registered `(handler, matcher)` pair.
#[derive(Clone)]
pub struct MuxEntry {
    handler: SharedHandler,
    matcher: MuxMatcher,
}

impl MuxEntry {
    #[must_use]
    pub fn handler(&self) -> &SharedHandler {
        &self.handler
    }

    #[must_use]
    pub fn matcher(&self) -> &MuxMatcher {
        &self.matcher
    }
}

impl fmt::Debug for MuxEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MuxEntry")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

/// Request multiplexer.
///
/// Entries are kept sorted by descending matcher priority; equal priorities
/// keep registration order. Dispatch runs the handler of the first entry
/// whose matcher accepts the request. Register everything before serving:
/// dispatch only reads the entry list and is safe to call from many threads.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use kitmux::dispatcher::handler_fn;
/// use kitmux::router::Mux;
///
/// let mux = Mux::new().handle("GET", "/users/:id", handler_fn(|w, r| {
///     let id = r.named_args().get("id").unwrap_or_default().to_string();
///     let _ = w.write(id.as_bytes());
/// }));
///
/// let req = http::Request::builder()
///     .method(Method::GET)
///     .uri("/users/42")
///     .body(Vec::new())
///     .unwrap();
/// let resp = mux.respond(req);
/// assert_eq!(resp.body(), b"42");
/// ```
#[derive(Clone, Default)]
pub struct Mux {
    entries: Vec<MuxEntry>,
    panic_handler: Option<SharedHandler>,
    not_found_handler: Option<SharedHandler>,
}

impl Mux {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mux from a route table, resolving handler names in `registry`.
    #[must_use]
    pub fn from_table(table: &RouteTable, registry: &HandlerRegistry) -> Self {
        table.build(registry)
    }

    /// Register `handler` under `matcher`, builder style. See [`Mux::register`].
    #[must_use]
    pub fn with<H: Handler + 'static>(self, handler: H, matcher: MuxMatcher) -> Self {
        self.with_shared(Arc::new(handler), matcher)
    }

    #[must_use]
    pub fn with_shared(mut self, handler: SharedHandler, matcher: MuxMatcher) -> Self {
        self.register(handler, matcher);
        self
    }

    /// Shorthand for `with(handler, and(0, [methods([method]), pattern(pattern)]))`.
    #[must_use]
    pub fn handle<H: Handler + 'static>(self, method: &str, pattern: &str, handler: H) -> Self {
        let matcher = MuxMatcher::and(
            0.0,
            vec![
                MuxMatcher::methods([method]),
                MuxMatcher::pattern(pattern),
            ],
        );
        self.with(handler, matcher)
    }

    /// Handler invoked when a handler or matcher panics. The panic payload is
    /// available through [`Request::recovered`].
    #[must_use]
    pub fn panic_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.panic_handler = Some(Arc::new(handler));
        self
    }

    #[must_use]
    pub fn not_found_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.not_found_handler = Some(Arc::new(handler));
        self
    }

    pub fn set_panic_handler(&mut self, handler: Option<SharedHandler>) {
        self.panic_handler = handler;
    }

    pub fn set_not_found_handler(&mut self, handler: Option<SharedHandler>) {
        self.not_found_handler = handler;
    }

    /// Validate `matcher` and add the entry.
    ///
    /// Returns false, leaving the mux untouched, when the matcher fails its
    /// test or an equal matcher is already registered.
    pub fn register(&mut self, handler: SharedHandler, mut matcher: MuxMatcher) -> bool {
        if !matcher.test() {
            warn!(matcher = %matcher, "Matcher failed validation; entry not registered");
            return false;
        }
        if self.entries.iter().any(|e| e.matcher == matcher) {
            debug!(matcher = %matcher, "Duplicate matcher; entry not registered");
            return false;
        }

        let priority = matcher.priority();
        info!(
            matcher = %matcher,
            priority = priority,
            entries = self.entries.len() + 1,
            "Route registered"
        );
        self.entries.push(MuxEntry { handler, matcher });
        // Vec::sort_by is stable: equal priorities keep registration order
        self.entries
            .sort_by(|a, b| b.matcher.priority().total_cmp(&a.matcher.priority()));
        true
    }

    /// Entries in evaluation order.
    #[must_use]
    pub fn entries(&self) -> &[MuxEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn has_panic_handler(&self) -> bool {
        self.panic_handler.is_some()
    }

    #[must_use]
    pub fn has_not_found_handler(&self) -> bool {
        self.not_found_handler.is_some()
    }

    /// First entry whose matcher accepts `r`.
    ///
    /// Named arguments written by matchers that end up rejecting the request
    /// are rolled back, so `r` only carries the arguments of the winning entry.
    pub fn find(&self, r: &mut Request) -> Option<&MuxEntry> {
        for entry in &self.entries {
            let mark = r.named_args().len();
            if entry.matcher.matches(r) {
                return Some(entry);
            }
            r.named_args_mut().truncate(mark);
        }
        None
    }

    /// Serve an `http::Request` and collect the result as an `http::Response`.
    #[must_use]
    pub fn respond(&self, req: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        let mut r = Request::from(req);
        let mut w = ResponseRecorder::new();
        self.serve(&mut w, &mut r);
        w.into_response()
    }

    fn dispatch(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        if let Some(entry) = self.find(r) {
            debug!(
                method = %r.method(),
                path = %r.path(),
                matcher = %entry.matcher,
                named_args = r.named_args().len(),
                "Route matched"
            );
            entry.handler.serve(w, r);
            return;
        }

        warn!(method = %r.method(), path = %r.path(), "No route matched");
        match &self.not_found_handler {
            Some(handler) => handler.serve(w, r),
            None => http_error(w, status_text(StatusCode::NOT_FOUND), StatusCode::NOT_FOUND),
        }
    }
}

impl Handler for Mux {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(w, r)));
        let Err(payload) = outcome else {
            return;
        };

        let recovered = Recovered::new(payload);
        error!(
            method = %r.method(),
            path = %r.path(),
            panic = ?recovered,
            "Handler panicked; recovered"
        );
        match &self.panic_handler {
            Some(handler) => {
                r.set_recovered(recovered);
                handler.serve(w, r);
            }
            None => http_error(
                w,
                status_text(StatusCode::INTERNAL_SERVER_ERROR),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        }
    }
}

impl fmt::Display for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Mux:{Entries:[")?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", entry.matcher)?;
        }
        write!(
            f,
            "], NotFoundHandler:{}, PanicHandler:{}}}",
            self.not_found_handler.is_some(),
            self.panic_handler.is_some()
        )
    }
}

impl fmt::Debug for Mux {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mux")
            .field("entries", &self.entries)
            .field("panic_handler", &self.panic_handler.is_some())
            .field("not_found_handler", &self.not_found_handler.is_some())
            .finish()
    }
}
