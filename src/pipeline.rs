//! # Response Pipeline
//!
//! Turns a [`ResponseState`] (status, headers, body and compression
//! directives) into a written response: minify first, then encode with the
//! content coding negotiated from the request's `Accept-Encoding`.
//!
//! ## Steps
//!
//! 1. A status code without a reason phrase becomes `500` with the body
//!    `Internal Server Error\n`.
//! 2. Statuses `>= 400` force `Content-Type: text/plain; charset=utf-8` and
//!    `X-Content-Type-Options: nosniff` into the state's headers.
//! 3. With the [`Directive::Minify`] directive the body goes through the
//!    minifier keyed by its content type, which is sniffed and set on the
//!    writer when neither the state nor the writer has one. A minify failure
//!    leaves the body as it was.
//! 4. The transport directives (`br`, `gzip`, `deflate`, in the given order)
//!    are offered to [`negotiate_content_encoding`]. A supported result
//!    encodes the body and sets `Content-Encoding`; anything else, including
//!    an encoder failure, sends the body as is.
//! 5. State headers replace writer headers of the same name, then the status
//!    line and body are written.
//!
//! ## Example
//!
//! ```rust
//! use http::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE};
//! use http::Method;
//! use kitmux::dispatcher::Handler;
//! use kitmux::pipeline::{response_with, Directive, ResponseState};
//! use kitmux::server::{Request, ResponseRecorder};
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
//! let state = ResponseState::new(200, headers, b"{ \"ok\" : true }".to_vec())
//!     .with_compression(vec![Directive::Minify, Directive::Gzip]);
//!
//! let mut r = Request::new(Method::GET, "/status")
//!     .unwrap()
//!     .with_header(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
//! let mut w = ResponseRecorder::new();
//! response_with(state).serve(&mut w, &mut r);
//! assert_eq!(w.header("content-encoding"), Some("gzip"));
//! ```

use crate::compress::{detect_content_type, CompressError, Compressor};
use crate::dispatcher::Handler;
use crate::negotiation::negotiate_content_encoding;
use crate::server::{http_error, status_text, Request, ResponseWriter, TEXT_PLAIN_UTF8};
use http::header::{
    HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE, X_CONTENT_TYPE_OPTIONS,
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

/// One step of the compression directive list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    Minify,
    #[serde(rename = "br")]
    Brotli,
    Gzip,
    Deflate,
}

impl Directive {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Directive::Minify => "minify",
            Directive::Brotli => "br",
            Directive::Gzip => "gzip",
            Directive::Deflate => "deflate",
        }
    }

    /// True for content codings; `minify` is not one.
    #[must_use]
    pub fn is_transport(self) -> bool {
        !matches!(self, Directive::Minify)
    }

    /// Parse a comma separated list such as `minify, br, gzip`.
    ///
    /// # Errors
    ///
    /// Fails on the first unknown token.
    pub fn parse_list(list: &str) -> Result<Vec<Directive>, UnknownDirective> {
        list.split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(Directive::from_str)
            .collect()
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token that is not a [`Directive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDirective(pub String);

impl fmt::Display for UnknownDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown compression directive '{}' (expected minify, br, gzip or deflate)",
            self.0
        )
    }
}

impl std::error::Error for UnknownDirective {}

impl FromStr for Directive {
    type Err = UnknownDirective;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minify" => Ok(Directive::Minify),
            "br" => Ok(Directive::Brotli),
            "gzip" => Ok(Directive::Gzip),
            "deflate" => Ok(Directive::Deflate),
            _ => Err(UnknownDirective(s.to_string())),
        }
    }
}

/// A response to be produced: status, headers, body and directives.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseState {
    status: u16,
    headers: HeaderMap,
    body: Vec<u8>,
    compression: Vec<Directive>,
}

impl ResponseState {
    /// `status` is a raw code so that unassigned values can be represented;
    /// the pipeline turns them into `500`.
    #[must_use]
    pub fn new(status: u16, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
            compression: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Vec<Directive>) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn compression(&self) -> &[Directive] {
        &self.compression
    }
}

/// Handler writing a fixed [`ResponseState`]; see [`response_with`].
#[derive(Debug, Clone)]
pub struct ResponseWith {
    state: ResponseState,
    compressor: Arc<Compressor>,
}

/// Serve `state` through the pipeline using the shared compressor.
#[must_use]
pub fn response_with(state: ResponseState) -> ResponseWith {
    ResponseWith {
        state,
        compressor: Compressor::shared(),
    }
}

impl ResponseWith {
    #[must_use]
    pub fn with_compressor(mut self, compressor: Arc<Compressor>) -> Self {
        self.compressor = compressor;
        self
    }
}

impl Handler for ResponseWith {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        write_state(&self.compressor, &self.state, w, r);
    }
}

/// Handler serving the state an earlier handler stored with
/// [`Request::set_state`]; see [`response_from_state`].
#[derive(Debug, Clone)]
pub struct ResponseFromState {
    compressor: Arc<Compressor>,
}

/// Serve the request's threaded [`ResponseState`], or a plain-text 500 when
/// none was set. Typical use is as a not-found or panic handler.
#[must_use]
pub fn response_from_state() -> ResponseFromState {
    ResponseFromState {
        compressor: Compressor::shared(),
    }
}

impl ResponseFromState {
    #[must_use]
    pub fn with_compressor(mut self, compressor: Arc<Compressor>) -> Self {
        self.compressor = compressor;
        self
    }
}

impl Handler for ResponseFromState {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        match r.take_state() {
            Some(state) => write_state(&self.compressor, &state, w, r),
            None => {
                warn!(path = %r.path(), "No response state set on request");
                http_error(
                    w,
                    status_text(StatusCode::INTERNAL_SERVER_ERROR),
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
            }
        }
    }
}

fn write_state(
    compressor: &Compressor,
    state: &ResponseState,
    w: &mut dyn ResponseWriter,
    r: &Request,
) {
    let (status, mut body) = match StatusCode::from_u16(state.status) {
        Ok(status) if status.canonical_reason().is_some() => {
            (status, Cow::Borrowed(state.body.as_slice()))
        }
        _ => {
            warn!(status = state.status, "Unknown status code; sending 500");
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            let body = format!("{}\n", status_text(status)).into_bytes();
            (status, Cow::Owned(body))
        }
    };

    let mut headers = state.headers.clone();
    if status.as_u16() >= 400 {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF8));
        headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    }

    if state.compression.contains(&Directive::Minify) {
        let media_type = content_type(&headers, w.headers()).unwrap_or_else(|| {
            let detected = detect_content_type(&body);
            w.headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(detected));
            detected.to_string()
        });
        match compressor.minify(&media_type, &body) {
            Ok(minified) => body = Cow::Owned(minified),
            Err(err @ CompressError::UnsupportedMediaType { .. }) => {
                debug!(media_type = %media_type, error = %err, "Minify skipped");
            }
            Err(err) => warn!(media_type = %media_type, error = %err, "Minify failed; body kept"),
        }
    }

    let offers: Vec<&str> = state
        .compression
        .iter()
        .filter(|d| d.is_transport())
        .map(|d| d.as_str())
        .collect();
    let encoding = negotiate_content_encoding(r.headers(), &offers);
    if let Some(codec) = compressor.codec(encoding) {
        let token = codec.encoding();
        match compressor.encode(token, &body) {
            Ok(encoded) => {
                debug!(
                    encoding = %token,
                    original_len = body.len(),
                    encoded_len = encoded.len(),
                    "Response body encoded"
                );
                body = Cow::Owned(encoded);
                w.headers_mut()
                    .insert(CONTENT_ENCODING, HeaderValue::from_static(token));
            }
            Err(err) => {
                warn!(encoding = %token, error = %err, "Compression failed; sending uncompressed");
            }
        }
    }

    for name in headers.keys() {
        let out = w.headers_mut();
        out.remove(name);
        for value in headers.get_all(name) {
            out.append(name.clone(), value.clone());
        }
    }
    w.write_header(status);
    if let Err(err) = w.write(&body) {
        debug!(status = status.as_u16(), error = %err, "Failed to write response body");
    }
}

fn content_type(state: &HeaderMap, writer: &HeaderMap) -> Option<String> {
    state
        .get(CONTENT_TYPE)
        .or_else(|| writer.get(CONTENT_TYPE))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_parse() {
        assert_eq!(
            Directive::parse_list("minify, br,gzip , DEFLATE").unwrap(),
            vec![
                Directive::Minify,
                Directive::Brotli,
                Directive::Gzip,
                Directive::Deflate
            ]
        );
        let err = Directive::parse_list("minify,zstd").unwrap_err();
        assert_eq!(err, UnknownDirective("zstd".to_string()));
    }

    #[test]
    fn test_directive_serde() {
        let json = serde_json::to_string(&vec![Directive::Minify, Directive::Brotli]).unwrap();
        assert_eq!(json, r#"["minify","br"]"#);
    }

    #[test]
    fn test_content_type_prefers_state() {
        let mut state = HeaderMap::new();
        let mut writer = HeaderMap::new();
        writer.insert(CONTENT_TYPE, HeaderValue::from_static("text/css"));
        assert_eq!(content_type(&state, &writer).as_deref(), Some("text/css"));
        state.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
        assert_eq!(content_type(&state, &writer).as_deref(), Some("text/html"));
    }
}
