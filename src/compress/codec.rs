use super::error::CompressError;
use flate2::read::{DeflateDecoder, GzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;
use std::io::{self, Read, Write};

/// A content coding that can encode and decode a byte stream.
///
/// Implementations are stateless apart from their settings and are shared
/// across threads by the [`super::Compressor`].
pub trait Codec: Send + Sync {
    /// `Content-Encoding` token, e.g. `gzip`.
    fn encoding(&self) -> &'static str;

    /// Compress everything readable from `src` into `dst`.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures of either side.
    fn encode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError>;

    /// Decompress everything readable from `src` into `dst`.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures, including corrupt input.
    fn decode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError>;
}

/// `gzip` (RFC 1952).
#[derive(Debug, Clone, Copy)]
pub struct Gzip {
    level: u32,
}

impl Gzip {
    /// `level` is clamped to `0..=9`.
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Codec for Gzip {
    fn encoding(&self) -> &'static str {
        "gzip"
    }

    fn encode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError> {
        let mut encoder = GzEncoder::new(dst, Compression::new(self.level));
        io::copy(src, &mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    fn decode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError> {
        let mut decoder = GzDecoder::new(src);
        io::copy(&mut decoder, dst)?;
        Ok(())
    }
}

/// `deflate` as a raw DEFLATE stream (RFC 1951), without a zlib wrapper.
#[derive(Debug, Clone, Copy)]
pub struct Deflate {
    level: u32,
}

impl Deflate {
    /// `level` is clamped to `0..=9`.
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

impl Codec for Deflate {
    fn encoding(&self) -> &'static str {
        "deflate"
    }

    fn encode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError> {
        let mut encoder = DeflateEncoder::new(dst, Compression::new(self.level));
        io::copy(src, &mut encoder)?;
        encoder.finish()?;
        Ok(())
    }

    fn decode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError> {
        let mut decoder = DeflateDecoder::new(src);
        io::copy(&mut decoder, dst)?;
        Ok(())
    }
}

/// `br` (RFC 7932).
#[derive(Debug, Clone, Copy)]
pub struct Brotli {
    quality: u32,
    window: u32,
}

impl Brotli {
    /// `quality` is clamped to `0..=11` and `window` (log2 of the sliding
    /// window) to `10..=24`.
    #[must_use]
    pub fn new(quality: u32, window: u32) -> Self {
        Self {
            quality: quality.min(11),
            window: window.clamp(10, 24),
        }
    }
}

impl Codec for Brotli {
    fn encoding(&self) -> &'static str {
        "br"
    }

    fn encode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError> {
        let params = brotli::enc::BrotliEncoderParams {
            quality: self.quality as i32,
            lgwin: self.window as i32,
            ..Default::default()
        };
        let (mut src, mut dst) = (src, dst);
        brotli::BrotliCompress(&mut src, &mut dst, &params)?;
        Ok(())
    }

    fn decode(&self, dst: &mut dyn Write, src: &mut dyn Read) -> Result<(), CompressError> {
        let (mut src, mut dst) = (src, dst);
        brotli::BrotliDecompress(&mut src, &mut dst)?;
        Ok(())
    }
}
