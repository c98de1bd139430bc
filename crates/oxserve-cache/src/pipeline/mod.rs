//! Per-file content pipeline: MIME resolution, optimization, hashing and
//! compression.
//!
//! The three algorithms are pluggable through [`MimeDetector`],
//! [`Optimizer`] and [`Compressor`]. [`ContentPipeline`] owns the policy
//! around them: extension overrides beat sniffing, optimizer failures keep the
//! original bytes, and only textual or JSON content is compressed.

mod compress;
mod mime;
mod optimize;

pub use compress::{BrotliCompressor, DEFAULT_BROTLI_QUALITY, DEFAULT_BROTLI_WINDOW};
pub use mime::SniffingDetector;
pub use optimize::{
    StandardOptimizer, canonicalize_json, minify_css, minify_html, minify_svg, strip_json_comments,
};

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::error::OptimizeError;

/// Infers a MIME type from file bytes, with the extension as a hint.
pub trait MimeDetector: Send + Sync {
    /// Return the MIME type for `bytes`.
    fn detect(&self, bytes: &[u8], extension_hint: Option<&str>) -> String;
}

/// Rewrites content into a smaller equivalent form.
pub trait Optimizer: Send + Sync {
    /// Optimize `bytes` of type `mime`. Types the optimizer does not handle
    /// are returned unchanged.
    fn optimize(&self, mime: &str, bytes: Bytes) -> Result<Bytes, OptimizeError>;
}

/// Produces the compressed representation served with `Content-Encoding`.
pub trait Compressor: Send + Sync {
    /// Compress `bytes`.
    fn compress(&self, bytes: &[u8]) -> io::Result<Vec<u8>>;
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Only textual and JSON content gets a compressed representation.
pub fn is_compressible(mime: &str) -> bool {
    mime.starts_with("text") || mime.contains("json")
}

/// Content pipeline configuration plus the pluggable algorithms.
#[derive(Clone)]
pub struct ContentPipeline {
    detector: Arc<dyn MimeDetector>,
    optimizer: Arc<dyn Optimizer>,
    compressor: Arc<dyn Compressor>,
    mime_overrides: HashMap<String, String>,
    optimize_files: bool,
}

impl std::fmt::Debug for ContentPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentPipeline")
            .field("mime_overrides", &self.mime_overrides)
            .field("optimize_files", &self.optimize_files)
            .finish_non_exhaustive()
    }
}

impl Default for ContentPipeline {
    fn default() -> Self {
        Self::new(
            Arc::new(SniffingDetector),
            Arc::new(StandardOptimizer),
            Arc::new(BrotliCompressor::default()),
        )
    }
}

impl ContentPipeline {
    /// Create a pipeline from explicit algorithms, with optimization enabled
    /// and no MIME overrides.
    pub fn new(
        detector: Arc<dyn MimeDetector>,
        optimizer: Arc<dyn Optimizer>,
        compressor: Arc<dyn Compressor>,
    ) -> Self {
        Self {
            detector,
            optimizer,
            compressor,
            mime_overrides: HashMap::new(),
            optimize_files: true,
        }
    }

    /// Set the extension -> MIME override table.
    #[must_use]
    pub fn with_mime_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.mime_overrides = overrides;
        self
    }

    /// Enable or disable content optimization.
    #[must_use]
    pub fn with_optimize_files(mut self, enabled: bool) -> Self {
        self.optimize_files = enabled;
        self
    }

    /// Whether optimization runs for every optimizable file.
    pub fn optimize_files(&self) -> bool {
        self.optimize_files
    }

    /// Resolve the MIME type: extension override first, then sniffing.
    pub fn resolve_mime(&self, path: &Path, bytes: &[u8]) -> String {
        let extension = path.extension().and_then(|e| e.to_str());
        if let Some(ext) = extension {
            let hit = self
                .mime_overrides
                .get(ext)
                .or_else(|| self.mime_overrides.get(&ext.to_ascii_lowercase()));
            if let Some(mime) = hit {
                return mime.clone();
            }
        }
        self.detector.detect(bytes, extension)
    }

    /// Resolve the MIME type and run the optimizer according to policy.
    ///
    /// With optimization disabled only `.jsonc` files are canonicalized, so
    /// commented JSON is never served verbatim. Optimizer failures are logged
    /// and the original bytes are returned.
    pub fn prepare(&self, path: &Path, bytes: Bytes) -> (String, Bytes) {
        let mime = self.resolve_mime(path, &bytes);

        let wants_optimize = if self.optimize_files {
            true
        } else {
            mime.starts_with("application/json")
                && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("jsonc"))
        };

        if !wants_optimize {
            return (mime, bytes);
        }

        match self.optimizer.optimize(&mime, bytes.clone()) {
            Ok(optimized) => (mime, optimized),
            Err(e) => {
                warn!(path = %path.display(), mime = %mime, error = %e, "Optimization failed, keeping original bytes");
                (mime, bytes)
            }
        }
    }

    /// Compress `bytes` with the configured compressor.
    pub fn compress(&self, bytes: &[u8]) -> io::Result<Bytes> {
        self.compressor.compress(bytes).map(Bytes::from)
    }
}
