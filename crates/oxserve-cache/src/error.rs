//! Error types for the filesystem cache.
//!
//! Most failures inside the cache are transient (a file vanished between the
//! walk and the stat, an optimizer choked on malformed input) and are logged
//! rather than returned. The variants here cover what callers actually see:
//! opening a cache on a bad root, starting the watcher, and joining
//! background tasks.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`FsCache`](crate::FsCache) and its components.
#[derive(Debug, Error)]
pub enum CacheError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The cache root is missing or is not a directory.
    #[error("Cache root is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The filesystem watcher could not be created or attached.
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// A background task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Failure of the optional content optimization step.
///
/// Always recoverable: the builder logs it and keeps the original bytes.
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Content is declared JSON but does not parse.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Content is declared textual but is not valid UTF-8.
    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// The optimizer refused the input for another reason.
    #[error("optimization not applicable: {0}")]
    Unsupported(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_directory_message() {
        let e = CacheError::NotADirectory(PathBuf::from("/srv/apps"));
        assert_eq!(e.to_string(), "Cache root is not a directory: /srv/apps");
    }

    #[test]
    fn test_io_error_conversion() {
        let e: CacheError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(e, CacheError::Io(_)));
    }

    #[test]
    fn test_optimize_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: OptimizeError = err.into();
        assert!(e.to_string().starts_with("invalid JSON"));
    }
}
