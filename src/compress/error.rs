use std::fmt;
use std::io;

/// Failure reported by a codec or minifier.
///
/// Returned by [`super::Compressor`] entry points. The response pipeline
/// recovers from all of them: a failed minify keeps the original body and a
/// failed encode sends the body uncompressed.
#[derive(Debug)]
pub enum CompressError {
    /// No codec is registered under this content coding
    UnsupportedEncoding {
        /// The requested coding, e.g. `zstd`
        encoding: String,
    },
    /// The minifier has no routine for this media type
    UnsupportedMediaType {
        /// Media type without parameters
        media_type: String,
    },
    /// Reading, writing or (de)compressing the stream failed
    Io(io::Error),
    /// The minifier rejected its input
    Minify {
        media_type: String,
        message: String,
    },
}

impl fmt::Display for CompressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressError::UnsupportedEncoding { encoding } => {
                write!(f, "compression error: unsupported content encoding '{encoding}'")
            }
            CompressError::UnsupportedMediaType { media_type } => {
                write!(f, "minify error: unsupported media type '{media_type}'")
            }
            CompressError::Io(err) => write!(f, "compression error: {err}"),
            CompressError::Minify {
                media_type,
                message,
            } => write!(f, "minify error: {media_type}: {message}"),
        }
    }
}

impl std::error::Error for CompressError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompressError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CompressError {
    fn from(err: io::Error) -> Self {
        CompressError::Io(err)
    }
}
