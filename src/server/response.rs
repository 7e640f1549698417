use http::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS};
use http::StatusCode;
use std::borrow::Cow;
use std::io::{self, Read, Write};
use tracing::debug;

/// `Content-Type` used for every plain-text error the mux synthesizes.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// Raw bidirectional connection handed out by [`ResponseWriter::hijack`].
pub trait Connection: Read + Write + Send {}

impl<T: Read + Write + Send> Connection for T {}

/// Response side of the request/response abstraction supplied by the host.
///
/// Only status, headers and raw writes are required. Flushing, server push
/// and hijacking are optional capabilities: the default implementations
/// report [`io::ErrorKind::Unsupported`].
pub trait ResponseWriter {
    fn headers(&self) -> &HeaderMap;

    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Set the status line. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);

    /// Write body bytes; an implicit `200 OK` is sent if no status was set.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    fn can_flush(&self) -> bool {
        false
    }

    fn flush(&mut self) -> io::Result<()> {
        Err(unsupported("flush"))
    }

    fn push(&mut self, _target: &str) -> io::Result<()> {
        Err(unsupported("server push"))
    }

    fn hijack(&mut self) -> io::Result<Box<dyn Connection>> {
        Err(unsupported("hijack"))
    }
}

fn unsupported(capability: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("response writer does not support {capability}"),
    )
}

/// Write one server-sent event chunk and flush it.
///
/// # Errors
///
/// Fails without writing anything when the writer cannot flush.
pub fn sent_event(w: &mut dyn ResponseWriter, payload: &[u8]) -> io::Result<usize> {
    if !w.can_flush() {
        return Err(unsupported("flush"));
    }
    let n = w.write(payload)?;
    w.flush()?;
    Ok(n)
}

/// Reply with a plain-text error: `message` followed by a newline.
///
/// Sets `Content-Type: text/plain; charset=utf-8` and
/// `X-Content-Type-Options: nosniff`, and drops any `Content-Length`.
pub fn http_error(w: &mut dyn ResponseWriter, message: &str, status: StatusCode) {
    let headers = w.headers_mut();
    headers.remove(CONTENT_LENGTH);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    w.write_header(status);

    let mut body = String::with_capacity(message.len() + 1);
    body.push_str(message);
    body.push('\n');
    if let Err(err) = w.write(body.as_bytes()) {
        debug!(status = status.as_u16(), error = %err, "Failed to write error body");
    }
}

/// Canonical reason phrase, empty for unassigned codes.
#[must_use]
pub fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

/// In-memory [`ResponseWriter`] that records what a handler produced.
///
/// Used by [`crate::router::Mux::respond`] to bridge into `http::Response`,
/// and by tests. Supports flushing; push and hijack are unsupported.
#[derive(Debug, Default)]
pub struct ResponseRecorder {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    flushes: usize,
}

impl ResponseRecorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded status, `200 OK` when the handler never set one.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// First value of header `name` as a string.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn body_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    #[must_use]
    pub fn flushed(&self) -> bool {
        self.flushes > 0
    }

    #[must_use]
    pub fn into_response(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseWriter for ResponseRecorder {
    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn can_flush(&self) -> bool {
        true
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
