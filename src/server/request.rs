use crate::pipeline::ResponseState;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Extensions, Method, Uri};
use smallvec::SmallVec;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Maximum number of named arguments stored before heap allocation.
/// Most route templates carry ≤4 arguments (e.g. `/users/:id/posts/:post`).
pub const MAX_INLINE_ARGS: usize = 8;

/// Stack-allocated argument storage for the dispatch path.
///
/// Keys are `Arc<str>` because they come from compiled patterns that live for
/// the lifetime of the mux; cloning one is a reference count bump.
pub type ArgVec = SmallVec<[(Arc<str>, String); MAX_INLINE_ARGS]>;

/// Multi-valued, string-keyed arguments extracted by pattern matchers.
///
/// Values accumulate: when several patterns match during one dispatch (for
/// example two children of an `or` matcher) every value is kept, in the order
/// it was extracted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedArgs {
    values: ArgVec,
}

impl NamedArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `key` without touching earlier values.
    pub fn add(&mut self, key: Arc<str>, value: String) {
        self.values.push((key, value));
    }

    /// First value stored under `key`.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value stored under `key`, oldest first.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.values
            .iter()
            .filter(move |(k, _)| k.as_ref() == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.iter().any(|(k, _)| k.as_ref() == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Number of stored values (not distinct keys).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drop every value added after the first `len` values.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
    }

    /// Convert to a `HashMap` of key → values.
    /// Note: This allocates - use get() on the dispatch path
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (k, v) in &self.values {
            map.entry(k.to_string()).or_default().push(v.clone());
        }
        map
    }
}

/// Value recovered from a panicking handler or matcher.
///
/// Handed verbatim to the mux's panic handler through [`Request::recovered`].
pub struct Recovered {
    payload: Box<dyn Any + Send>,
}

impl Recovered {
    pub(crate) fn new(payload: Box<dyn Any + Send>) -> Self {
        Self { payload }
    }

    /// Downcast the payload, e.g. `recovered.downcast_ref::<i32>()` after `panic_any(99)`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    /// The panic message when the payload is a string (the `panic!("...")` case).
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        if let Some(s) = self.payload.downcast_ref::<&'static str>() {
            return Some(s);
        }
        self.payload.downcast_ref::<String>().map(String::as_str)
    }

    #[must_use]
    pub fn into_inner(self) -> Box<dyn Any + Send> {
        self.payload
    }
}

impl fmt::Debug for Recovered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message() {
            Some(msg) => f.debug_tuple("Recovered").field(&msg).finish(),
            None => f.debug_tuple("Recovered").field(&"<opaque>").finish(),
        }
    }
}

/// Per-request mutable record threaded through matcher → mux → handler.
///
/// Owned by exactly one in-flight request and dropped with it.
#[derive(Debug, Default)]
struct RequestScope {
    named_args: NamedArgs,
    recovered: Option<Recovered>,
    state: Option<ResponseState>,
}

/// An incoming HTTP request as seen by matchers and handlers.
///
/// Wraps an `http::Request<Vec<u8>>` supplied by the host server and adds the
/// request-scoped storage the mux writes into (named arguments, recovered
/// panic payload, threaded response state).
#[derive(Debug)]
pub struct Request {
    inner: http::Request<Vec<u8>>,
    scope: RequestScope,
}

impl Request {
    /// Build a request with an empty body.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is not a valid URI.
    pub fn new(method: Method, target: &str) -> Result<Self, http::Error> {
        let inner = http::Request::builder()
            .method(method)
            .uri(target)
            .body(Vec::new())?;
        Ok(Self::from(inner))
    }

    /// Append a header, builder style.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.inner.headers_mut().append(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        *self.inner.body_mut() = body;
        self
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    #[must_use]
    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// Request path without the query string.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        self.inner.body()
    }

    pub fn body_mut(&mut self) -> &mut Vec<u8> {
        self.inner.body_mut()
    }

    /// Free-form typed storage for application middleware.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        self.inner.extensions()
    }

    pub fn extensions_mut(&mut self) -> &mut Extensions {
        self.inner.extensions_mut()
    }

    /// Arguments extracted by every pattern matcher that matched this request.
    #[must_use]
    pub fn named_args(&self) -> &NamedArgs {
        &self.scope.named_args
    }

    pub fn named_args_mut(&mut self) -> &mut NamedArgs {
        &mut self.scope.named_args
    }

    /// Path and argument storage borrowed together, for pattern matching.
    pub(crate) fn path_and_args_mut(&mut self) -> (&str, &mut NamedArgs) {
        (self.inner.uri().path(), &mut self.scope.named_args)
    }

    /// Panic payload recovered by the mux, set right before its panic handler runs.
    #[must_use]
    pub fn recovered(&self) -> Option<&Recovered> {
        self.scope.recovered.as_ref()
    }

    pub(crate) fn set_recovered(&mut self, recovered: Recovered) {
        self.scope.recovered = Some(recovered);
    }

    /// Thread a response state to handlers that run later for this request.
    pub fn set_state(&mut self, state: ResponseState) {
        self.scope.state = Some(state);
    }

    /// Response state set by an earlier handler, if any.
    #[must_use]
    pub fn state(&self) -> Option<&ResponseState> {
        self.scope.state.as_ref()
    }

    pub fn take_state(&mut self) -> Option<ResponseState> {
        self.scope.state.take()
    }

    /// Give back the underlying request; request-scoped storage is dropped.
    #[must_use]
    pub fn into_inner(self) -> http::Request<Vec<u8>> {
        self.inner
    }
}

impl From<http::Request<Vec<u8>>> for Request {
    fn from(inner: http::Request<Vec<u8>>) -> Self {
        Self {
            inner,
            scope: RequestScope::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_args_accumulate() {
        let mut args = NamedArgs::new();
        args.add(Arc::from("id"), "1".to_string());
        args.add(Arc::from("name"), "x".to_string());
        args.add(Arc::from("id"), "2".to_string());

        assert_eq!(args.get("id"), Some("1"));
        assert_eq!(args.get_all("id").collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(args.len(), 3);
        assert_eq!(args.to_map().get("id"), Some(&vec!["1".to_string(), "2".to_string()]));
        assert!(args.get("missing").is_none());
    }

    #[test]
    fn test_truncate_rolls_back() {
        let mut args = NamedArgs::new();
        args.add(Arc::from("a"), "x".to_string());
        let mark = args.len();
        args.add(Arc::from("b"), "y".to_string());
        args.truncate(mark);
        assert!(args.contains_key("a"));
        assert!(!args.contains_key("b"));
    }

    #[test]
    fn test_path_excludes_query() {
        let req = Request::new(Method::GET, "http://example.com/x/yyy?z=1").unwrap();
        assert_eq!(req.path(), "/x/yyy");
    }

    #[test]
    fn test_recovered_message() {
        let rec = Recovered::new(Box::new("boom"));
        assert_eq!(rec.message(), Some("boom"));
        let rec = Recovered::new(Box::new(99_i32));
        assert_eq!(rec.downcast_ref::<i32>(), Some(&99));
        assert!(rec.message().is_none());
    }
}
