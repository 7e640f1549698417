use crate::compress::Compressor;
use crate::dispatcher::Handler;
use crate::pipeline::{response_with, Directive, ResponseState};
use crate::server::{Request, ResponseWriter};
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

// Placeholder handler: answers with what the mux extracted for the request
#[derive(Debug, Clone)]
pub struct Echo {
    name: String,
    compression: Vec<Directive>,
    compressor: Arc<Compressor>,
}

#[must_use]
pub fn echo(name: &str) -> Echo {
    Echo {
        name: name.to_string(),
        compression: Vec::new(),
        compressor: Compressor::shared(),
    }
}

impl Echo {
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

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Handler for Echo {
    fn serve(&self, w: &mut dyn ResponseWriter, r: &mut Request) {
        let body = json!({
            "handler": self.name,
            "method": r.method().as_str(),
            "path": r.path(),
            "args": r.named_args().to_map(),
            "recovered": r.recovered().and_then(|p| p.message()).map(str::to_string),
        });
        let body = serde_json::to_vec_pretty(&body).unwrap_or_else(|err| {
            warn!(handler = %self.name, error = %err, "Failed to encode echo body");
            Vec::new()
        });

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let state =
            ResponseState::new(200, headers, body).with_compression(self.compression.clone());
        response_with(state)
            .with_compressor(Arc::clone(&self.compressor))
            .serve(w, r);
    }
}
