//! # Runtime Configuration Module
//!
//! Environment-driven defaults for handlers built at startup.
//!
//! ## Environment Variables
//!
//! ### `KITMUX_COMPRESSION`
//!
//! Comma separated compression directives applied by handlers that do not
//! choose their own, in order. Tokens: `minify`, `br`, `gzip`, `deflate`.
//!
//! Default: `minify,br,gzip,deflate`
//!
//! ### `KITMUX_MAX_BODY_BYTES`
//!
//! Request body limit used with [`crate::dispatcher::max_bytes`]. Accepts
//! decimal (`1048576`) or hexadecimal (`0x100000`).
//!
//! Default: `0x100000` (1 MiB)
//!
//! ## Usage
//!
//! ```rust
//! use kitmux::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("compression: {:?}", config.compression);
//! ```
//!
//! Invalid values fall back to the default with a warning.

use crate::pipeline::Directive;
use std::env;
use tracing::warn;

pub const DEFAULT_COMPRESSION: &str = "minify,br,gzip,deflate";
pub const DEFAULT_MAX_BODY_BYTES: usize = 0x10_0000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Default compression directives
    pub compression: Vec<Directive>,
    /// Maximum accepted request body in bytes
    pub max_body_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            compression: default_compression(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(
            env::var("KITMUX_COMPRESSION").ok().as_deref(),
            env::var("KITMUX_MAX_BODY_BYTES").ok().as_deref(),
        )
    }

    fn from_vars(compression: Option<&str>, max_body_bytes: Option<&str>) -> Self {
        let compression = match compression {
            Some(val) => Directive::parse_list(val).unwrap_or_else(|err| {
                warn!(value = %val, error = %err, "Invalid KITMUX_COMPRESSION; using default");
                default_compression()
            }),
            None => default_compression(),
        };

        let max_body_bytes = match max_body_bytes {
            Some(val) => parse_size(val).unwrap_or_else(|| {
                warn!(value = %val, "Invalid KITMUX_MAX_BODY_BYTES; using default");
                DEFAULT_MAX_BODY_BYTES
            }),
            None => DEFAULT_MAX_BODY_BYTES,
        };

        RuntimeConfig {
            compression,
            max_body_bytes,
        }
    }
}

fn default_compression() -> Vec<Directive> {
    vec![
        Directive::Minify,
        Directive::Brotli,
        Directive::Gzip,
        Directive::Deflate,
    ]
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
