use crate::server::{Request, ResponseWriter};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Something that can answer a request.
///
/// Handlers are shared across threads once registration is finished, so they
/// must be `Send + Sync`; per-request data lives on the [`Request`].
pub trait Handler: Send + Sync {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request);
}

/// Type-erased, shareable handler as stored by the mux.
pub type SharedHandler = Arc<dyn Handler>;

/// Handlers addressable by name, used when building a mux from configuration.
pub type HandlerRegistry = HashMap<String, SharedHandler>;

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        (**self).serve(w, r);
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        (**self).serve(w, r);
    }
}

/// Handler backed by a closure; see [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

/// Turn a closure into a [`Handler`].
///
/// ```rust
/// use kitmux::dispatcher::handler_fn;
/// use kitmux::server::ResponseWriter;
///
/// let hello = handler_fn(|w, _r| {
///     let _ = w.write(b"hello");
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&mut dyn ResponseWriter, &mut Request) + Send + Sync,
{
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        (self.f)(w, r);
    }
}
