use crate::compress::Compressor;
use crate::dispatcher::Handler;
use crate::pipeline::{response_with, Directive, ResponseState};
use crate::server::{http_error, status_text, Request, ResponseWriter};
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const INDEX_FILE: &str = "index.html";

/// Handler serving files below a base directory.
///
/// The request path (minus an optional prefix) is mapped onto the base
/// directory; `..` and absolute components are rejected. Directories serve
/// their `index.html`. Bodies go through the response pipeline, so the
/// configured directives minify and compress them.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    base_dir: PathBuf,
    strip_prefix: String,
    compression: Vec<Directive>,
    compressor: Arc<Compressor>,
}

impl StaticFiles {
    pub fn new<P: Into<PathBuf>>(base: P) -> Self {
        Self {
            base_dir: base.into(),
            strip_prefix: String::new(),
            compression: Vec::new(),
            compressor: Compressor::shared(),
        }
    }

    /// Remove `prefix` from request paths before mapping, e.g. `/static`.
    #[must_use]
    pub fn strip_prefix(mut self, prefix: &str) -> Self {
        self.strip_prefix = prefix.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Vec<Directive>) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_compressor(mut self, compressor: Arc<Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    fn map_path(&self, url_path: &str) -> Option<PathBuf> {
        let url_path = url_path.strip_prefix(&self.strip_prefix)?;
        if !url_path.is_empty() && !url_path.starts_with('/') {
            return None;
        }
        let mut pb = self.base_dir.clone();
        for comp in Path::new(url_path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(s) => pb.push(s),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(pb)
    }

    /// Media type from the file extension.
    #[must_use]
    pub fn content_type(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" | "mjs" => "application/javascript",
            "json" => "application/json",
            "xml" => "text/xml; charset=utf-8",
            "svg" => "image/svg+xml",
            "txt" => "text/plain; charset=utf-8",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }

    /// Read the file for `url_path` and its media type.
    ///
    /// # Errors
    ///
    /// `NotFound` for rejected paths and missing files, otherwise the I/O error.
    pub fn load(&self, url_path: &str) -> io::Result<(Vec<u8>, &'static str)> {
        let mut path = self
            .map_path(url_path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "invalid path"))?;
        if path.is_dir() {
            path.push(INDEX_FILE);
        }
        if !path.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        }
        let bytes = fs::read(&path)?;
        Ok((bytes, Self::content_type(&path)))
    }
}

impl Handler for StaticFiles {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        match self.load(r.path()) {
            Ok((body, content_type)) => {
                debug!(path = %r.path(), bytes = body.len(), "Serving static file");
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
                let state = ResponseState::new(StatusCode::OK.as_u16(), headers, body)
                    .with_compression(self.compression.clone());
                response_with(state)
                    .with_compressor(Arc::clone(&self.compressor))
                    .serve(w, r);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %r.path(), "Static file not found");
                http_error(w, status_text(StatusCode::NOT_FOUND), StatusCode::NOT_FOUND);
            }
            Err(err) => {
                warn!(path = %r.path(), error = %err, "Failed to read static file");
                http_error(
                    w,
                    status_text(StatusCode::INTERNAL_SERVER_ERROR),
                    StatusCode::INTERNAL_SERVER_ERROR,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_path_prevents_traversal() {
        let sf = StaticFiles::new("assets");
        assert!(sf.map_path("../Cargo.toml").is_none());
        assert!(sf.map_path("/a/../../Cargo.toml").is_none());
        assert_eq!(
            sf.map_path("/css/./site.css"),
            Some(PathBuf::from("assets/css/site.css"))
        );
    }

    #[test]
    fn test_map_path_with_prefix() {
        let sf = StaticFiles::new("assets").strip_prefix("/static/");
        assert_eq!(
            sf.map_path("/static/app.js"),
            Some(PathBuf::from("assets/app.js"))
        );
        assert!(sf.map_path("/other/app.js").is_none());
        // prefix must end on a segment boundary
        assert!(sf.map_path("/staticsecret.txt").is_none());
        assert_eq!(sf.map_path("/static"), Some(PathBuf::from("assets")));
    }

    #[test]
    fn test_content_type() {
        assert_eq!(StaticFiles::content_type(Path::new("a.SVG")), "image/svg+xml");
        assert_eq!(StaticFiles::content_type(Path::new("a")), "application/octet-stream");
    }
}
