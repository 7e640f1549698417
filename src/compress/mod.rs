//! # Compress Module
//!
//! Stream transformers and minifiers used by the response pipeline.
//!
//! - [`Codec`] encodes/decodes one content coding; [`Gzip`], [`Deflate`] and
//!   [`Brotli`] are built in (`flate2` and `brotli`).
//! - [`Minifier`] shrinks documents by media type; [`DefaultMinifier`] uses
//!   `minify-html` for HTML and `minifier` for CSS, JavaScript and JSON.
//! - [`Compressor`] bundles codecs by name plus a minifier behind one
//!   byte-oriented API. [`Compressor::shared`] is a process-wide instance with
//!   best-compression settings.
//! - [`detect_content_type`] guesses a media type for untyped bodies.
//!
//! Every entry point returns [`CompressError`]; deciding whether a failure
//! is fatal is up to the caller.

mod codec;
mod error;
mod minify;
mod sniff;

pub use codec::{Brotli, Codec, Deflate, Gzip};
pub use error::CompressError;
pub use minify::{essence, DefaultMinifier, Minifier};
pub use sniff::{detect_content_type, OCTET_STREAM, TEXT_PLAIN};

use crate::config::CompressionConfig;
use once_cell::sync::Lazy;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

static SHARED: Lazy<Arc<Compressor>> = Lazy::new(|| Arc::new(Compressor::default()));

/// Codecs addressable by content coding, plus a minifier.
#[derive(Clone)]
pub struct Compressor {
    codecs: Vec<Arc<dyn Codec>>,
    minifier: Arc<dyn Minifier>,
}

impl Compressor {
    /// Compressor with no codecs and the default minifier.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            codecs: Vec::new(),
            minifier: Arc::new(DefaultMinifier),
        }
    }

    /// `br`, `gzip` and `deflate` with the given settings.
    #[must_use]
    pub fn with_config(config: &CompressionConfig) -> Self {
        let mut compressor = Self::empty();
        compressor.register(Arc::new(Brotli::new(
            config.brotli_quality,
            config.brotli_window,
        )));
        compressor.register(Arc::new(Gzip::new(config.gzip_level)));
        compressor.register(Arc::new(Deflate::new(config.deflate_level)));
        compressor
    }

    /// Process-wide compressor with default settings.
    #[must_use]
    pub fn shared() -> Arc<Compressor> {
        Arc::clone(&SHARED)
    }

    /// Add `codec`, replacing any codec with the same encoding.
    pub fn register(&mut self, codec: Arc<dyn Codec>) {
        self.codecs
            .retain(|c| !c.encoding().eq_ignore_ascii_case(codec.encoding()));
        self.codecs.push(codec);
    }

    #[must_use]
    pub fn with_minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.minifier = minifier;
        self
    }

    #[must_use]
    pub fn codec(&self, encoding: &str) -> Option<&Arc<dyn Codec>> {
        self.codecs
            .iter()
            .find(|c| c.encoding().eq_ignore_ascii_case(encoding))
    }

    #[must_use]
    pub fn supports(&self, encoding: &str) -> bool {
        self.codec(encoding).is_some()
    }

    /// Registered encodings in registration order.
    #[must_use]
    pub fn encodings(&self) -> Vec<&'static str> {
        self.codecs.iter().map(|c| c.encoding()).collect()
    }

    fn require(&self, encoding: &str) -> Result<&Arc<dyn Codec>, CompressError> {
        self.codec(encoding)
            .ok_or_else(|| CompressError::UnsupportedEncoding {
                encoding: encoding.to_string(),
            })
    }

    /// Stream `src` through the `encoding` encoder into `dst`.
    ///
    /// # Errors
    ///
    /// Unknown encoding or I/O failure.
    pub fn encode_stream(
        &self,
        encoding: &str,
        dst: &mut dyn Write,
        src: &mut dyn Read,
    ) -> Result<(), CompressError> {
        self.require(encoding)?.encode(dst, src)
    }

    /// Stream `src` through the `encoding` decoder into `dst`.
    ///
    /// # Errors
    ///
    /// Unknown encoding, corrupt input or I/O failure.
    pub fn decode_stream(
        &self,
        encoding: &str,
        dst: &mut dyn Write,
        src: &mut dyn Read,
    ) -> Result<(), CompressError> {
        self.require(encoding)?.decode(dst, src)
    }

    /// Encode a whole body in memory.
    ///
    /// # Errors
    ///
    /// Unknown encoding or encoder failure.
    pub fn encode(&self, encoding: &str, body: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut out = Vec::with_capacity(body.len() / 2 + 64);
        self.encode_stream(encoding, &mut out, &mut &body[..])?;
        Ok(out)
    }

    /// Decode a whole body in memory.
    ///
    /// # Errors
    ///
    /// Unknown encoding or corrupt input.
    pub fn decode(&self, encoding: &str, body: &[u8]) -> Result<Vec<u8>, CompressError> {
        let mut out = Vec::with_capacity(body.len() * 2);
        self.decode_stream(encoding, &mut out, &mut &body[..])?;
        Ok(out)
    }

    /// Minify `body` of media type `media_type`.
    ///
    /// # Errors
    ///
    /// Unsupported media type or input the minifier rejects.
    pub fn minify(&self, media_type: &str, body: &[u8]) -> Result<Vec<u8>, CompressError> {
        self.minifier.minify(media_type, body)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::with_config(&CompressionConfig::default())
    }
}

impl fmt::Debug for Compressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compressor")
            .field("encodings", &self.encodings())
            .finish_non_exhaustive()
    }
}
