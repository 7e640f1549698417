//! Small handlers that wrap common response chores.

use super::core::{Handler, SharedHandler};
use crate::server::{http_error, status_text, Request, ResponseWriter};
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION, SET_COOKIE};
use http::{Method, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

/// Redirect to a fixed location; see [`redirect`].
#[derive(Debug, Clone)]
pub struct Redirect {
    status: StatusCode,
    location: Option<HeaderValue>,
    raw: String,
}

/// Reply with `status` and a `Location` header.
///
/// GET and HEAD requests also get a small HTML body pointing at the target.
/// An invalid location turns every response into a plain-text 500.
#[must_use]
pub fn redirect(status: StatusCode, location: &str) -> Redirect {
    let header = HeaderValue::from_str(location).ok();
    if header.is_none() {
        warn!(location = %location, "Redirect location is not a valid header value");
    }
    Redirect {
        status,
        location: header,
        raw: location.to_string(),
    }
}

impl Handler for Redirect {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        let Some(location) = self.location.clone() else {
            http_error(
                w,
                status_text(StatusCode::INTERNAL_SERVER_ERROR),
                StatusCode::INTERNAL_SERVER_ERROR,
            );
            return;
        };
        w.headers_mut().insert(LOCATION, location);

        let is_read = r.method() == Method::GET || r.method() == Method::HEAD;
        if is_read && !w.headers().contains_key(CONTENT_TYPE) {
            w.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            );
        }
        w.write_header(self.status);

        if r.method() == Method::GET {
            let body = format!(
                "<a href=\"{}\">{}</a>.\n\n",
                escape_html(&self.raw),
                status_text(self.status)
            );
            if let Err(err) = w.write(body.as_bytes()) {
                debug!(error = %err, "Failed to write redirect body");
            }
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Append a `Set-Cookie` header; see [`set_cookie`].
#[derive(Debug, Clone)]
pub struct SetCookie {
    cookie: Option<HeaderValue>,
}

/// Append `cookie` (a full `Set-Cookie` value) to the response headers.
///
/// Writes no status or body, so it is meant to run inside a [`chain`].
/// An invalid cookie string makes the handler a no-op.
#[must_use]
pub fn set_cookie(cookie: &str) -> SetCookie {
    let header = HeaderValue::from_str(cookie).ok();
    if header.is_none() {
        warn!("Cookie is not a valid header value; set_cookie is a no-op");
    }
    SetCookie { cookie: header }
}

impl Handler for SetCookie {
    fn serve(&self, w: &mut dyn ResponseWriter, _r: &mut Request) {
        if let Some(cookie) = &self.cookie {
            w.headers_mut().append(SET_COOKIE, cookie.clone());
        }
    }
}

/// Reject oversized request bodies before `next` runs; see [`max_bytes`].
pub struct MaxBytes {
    limit: usize,
    next: SharedHandler,
}

/// Answer `413 Payload Too Large` when the request body exceeds `limit` bytes,
/// otherwise hand the request to `next`.
#[must_use]
pub fn max_bytes<H: Handler + 'static>(limit: usize, next: H) -> MaxBytes {
    MaxBytes {
        limit,
        next: Arc::new(next),
    }
}

impl Handler for MaxBytes {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        if r.body().len() > self.limit {
            debug!(
                limit = self.limit,
                body_len = r.body().len(),
                "Request body exceeds limit"
            );
            http_error(
                w,
                status_text(StatusCode::PAYLOAD_TOO_LARGE),
                StatusCode::PAYLOAD_TOO_LARGE,
            );
            return;
        }
        self.next.serve(w, r);
    }
}

/// Run several handlers in order against the same request; see [`chain`].
#[derive(Clone, Default)]
pub struct Chain {
    handlers: Vec<SharedHandler>,
}

/// Build a [`Chain`]. Handlers share the writer, so only one of them should
/// write the status line and body.
#[must_use]
pub fn chain(handlers: Vec<SharedHandler>) -> Chain {
    Chain { handlers }
}

impl Chain {
    #[must_use]
    pub fn then<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }
}

impl Handler for Chain {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        for handler in &self.handlers {
            handler.serve(w, r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::handler_fn;
    use crate::server::ResponseRecorder;

    #[test]
    fn test_redirect_get_writes_body() {
        let mut w = ResponseRecorder::new();
        let mut r = Request::new(Method::GET, "/old").unwrap();
        redirect(StatusCode::MOVED_PERMANENTLY, "/new?a=1&b=2").serve(&mut w, &mut r);

        assert_eq!(w.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(w.header("location"), Some("/new?a=1&b=2"));
        assert_eq!(w.header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(
            w.body_str(),
            "<a href=\"/new?a=1&amp;b=2\">Moved Permanently</a>.\n\n"
        );
    }

    #[test]
    fn test_redirect_post_has_no_body() {
        let mut w = ResponseRecorder::new();
        let mut r = Request::new(Method::POST, "/old").unwrap();
        redirect(StatusCode::SEE_OTHER, "/new").serve(&mut w, &mut r);
        assert_eq!(w.status(), StatusCode::SEE_OTHER);
        assert!(w.header("content-type").is_none());
        assert!(w.body().is_empty());
    }

    #[test]
    fn test_invalid_redirect_is_500() {
        let mut w = ResponseRecorder::new();
        let mut r = Request::new(Method::GET, "/").unwrap();
        redirect(StatusCode::FOUND, "/bad\nlocation").serve(&mut w, &mut r);
        assert_eq!(w.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_chain_set_cookie_then_body() {
        let mut w = ResponseRecorder::new();
        let mut r = Request::new(Method::GET, "/").unwrap();
        chain(Vec::new())
            .then(set_cookie("session=abc; Path=/"))
            .then(set_cookie("theme=dark"))
            .then(handler_fn(|w, _r| {
                w.write(b"ok").unwrap();
            }))
            .serve(&mut w, &mut r);

        let cookies: Vec<_> = w
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        assert_eq!(cookies, vec!["session=abc; Path=/", "theme=dark"]);
        assert_eq!(w.body(), b"ok");
    }

    #[test]
    fn test_max_bytes() {
        let ok = handler_fn(|w, _r| {
            w.write(b"accepted").unwrap();
        });
        let guard = max_bytes(4, ok);

        let mut w = ResponseRecorder::new();
        let mut r = Request::new(Method::POST, "/upload")
            .unwrap()
            .with_body(b"12345".to_vec());
        guard.serve(&mut w, &mut r);
        assert_eq!(w.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let mut w = ResponseRecorder::new();
        let mut r = Request::new(Method::POST, "/upload")
            .unwrap()
            .with_body(b"1234".to_vec());
        guard.serve(&mut w, &mut r);
        assert_eq!(w.body(), b"accepted");
    }
}
