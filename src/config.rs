//! # Configuration Module
//!
//! Declarative route tables and codec settings.
//!
//! ## Route tables
//!
//! A route table lists entries in one of two shapes and names the handlers
//! they dispatch to. Handler names are resolved against a
//! [`HandlerRegistry`] when the mux is built.
//!
//! ```yaml
//! not_found: missing
//! routes:
//!   - method: GET
//!     pattern: /users/:id
//!     handler: get_user
//!   - handler: health
//!     matcher:
//!       or:
//!         priority: 0
//!         muxes:
//!           - pattern: { pattern: /health }
//!           - pattern: { pattern: /healthz }
//! compression:
//!   gzip_level: 6
//! ```
//!
//! The `matcher` value is the serialized form of
//! [`MuxMatcher`](crate::router::MuxMatcher). The file format follows the
//! extension: `.yaml`/`.yml`, `.toml` or `.json`.

use crate::compress::Compressor;
use crate::dispatcher::{HandlerRegistry, SharedHandler};
use crate::router::{Mux, MuxMatcher};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Codec settings. Defaults favour the smallest output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// gzip level, 0 to 9
    pub gzip_level: u32,
    /// raw deflate level, 0 to 9
    pub deflate_level: u32,
    /// brotli quality, 0 to 11
    pub brotli_quality: u32,
    /// brotli window as log2 of bytes, 10 to 24
    pub brotli_window: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            gzip_level: 9,
            deflate_level: 9,
            brotli_quality: 11,
            brotli_window: 22,
        }
    }
}

/// One route: a full matcher, or the `method` + `pattern` shorthand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouteEntry {
    Matcher {
        handler: String,
        matcher: MuxMatcher,
    },
    Handle {
        method: String,
        pattern: String,
        handler: String,
    },
}

impl RouteEntry {
    #[must_use]
    pub fn handler(&self) -> &str {
        match self {
            RouteEntry::Matcher { handler, .. } | RouteEntry::Handle { handler, .. } => handler,
        }
    }

    /// Matcher this entry registers, before validation.
    #[must_use]
    pub fn matcher(&self) -> MuxMatcher {
        match self {
            RouteEntry::Matcher { matcher, .. } => matcher.clone(),
            RouteEntry::Handle {
                method, pattern, ..
            } => MuxMatcher::and(
                0.0,
                vec![
                    MuxMatcher::methods([method.as_str()]),
                    MuxMatcher::pattern(pattern),
                ],
            ),
        }
    }
}

/// Supported route table encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Yaml,
    Toml,
    Json,
}

impl TableFormat {
    /// Pick the format from the file extension.
    ///
    /// # Errors
    ///
    /// Missing or unrecognised extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "yaml" | "yml" => Ok(TableFormat::Yaml),
            "toml" => Ok(TableFormat::Toml),
            "json" => Ok(TableFormat::Json),
            _ => Err(anyhow!(
                "unsupported route table extension {:?} for {} (expected yaml, yml, toml or json)",
                ext,
                path.display()
            )),
        }
    }
}

/// Routes plus optional fallback handler names and codec settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    /// Handler used when no route matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found: Option<String>,
    /// Handler used when a handler panics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub panic: Option<String>,
    #[serde(default)]
    pub compression: CompressionConfig,
}

impl RouteTable {
    /// Read and parse a route table file.
    ///
    /// # Errors
    ///
    /// Unsupported extension, unreadable file or malformed content.
    pub fn load(path: &Path) -> Result<Self> {
        let format = TableFormat::from_path(path)?;
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read route table {}", path.display()))?;
        let table = Self::parse(&text, format)
            .with_context(|| format!("failed to parse route table {}", path.display()))?;
        info!(
            path = %path.display(),
            routes = table.routes.len(),
            "Route table loaded"
        );
        Ok(table)
    }

    /// Parse a route table from text.
    ///
    /// # Errors
    ///
    /// Malformed content for the given format.
    pub fn parse(text: &str, format: TableFormat) -> Result<Self> {
        let table = match format {
            TableFormat::Yaml => serde_yaml::from_str(text).context("invalid YAML route table")?,
            TableFormat::Toml => toml::from_str(text).context("invalid TOML route table")?,
            TableFormat::Json => serde_json::from_str(text).context("invalid JSON route table")?,
        };
        Ok(table)
    }

    /// Compressor carrying the table's codec settings.
    ///
    /// Handlers built for this table take it through their `with_compressor`
    /// builders. Default settings reuse [`Compressor::shared`].
    #[must_use]
    pub fn compressor(&self) -> Arc<Compressor> {
        if self.compression == CompressionConfig::default() {
            Compressor::shared()
        } else {
            Arc::new(Compressor::with_config(&self.compression))
        }
    }

    /// Build a mux, resolving handler names in `registry`.
    ///
    /// Entries naming an unknown handler are skipped with a warning, as are
    /// matchers that fail validation.
    #[must_use]
    pub fn build(&self, registry: &HandlerRegistry) -> Mux {
        let mut mux = Mux::new();
        for entry in &self.routes {
            let Some(handler) = lookup(registry, entry.handler()) else {
                continue;
            };
            mux.register(handler, entry.matcher());
        }
        if let Some(name) = &self.not_found {
            mux.set_not_found_handler(lookup(registry, name));
        }
        if let Some(name) = &self.panic {
            mux.set_panic_handler(lookup(registry, name));
        }
        mux
    }
}

fn lookup(registry: &HandlerRegistry, name: &str) -> Option<SharedHandler> {
    let handler = registry.get(name).map(Arc::clone);
    if handler.is_none() {
        warn!(handler = %name, "Unknown handler name in route table; skipped");
    }
    handler
}
