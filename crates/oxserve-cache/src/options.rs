//! Cache configuration.

use std::path::{Path, PathBuf};
use std::thread;

/// Directory names skipped by the walker and the watch feed.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[".git", "node_modules"];

/// Options for [`FsCache::open`](crate::FsCache::open).
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Directory tree to cache.
    pub root: PathBuf,
    /// Directory names whose subtrees are never cached.
    pub ignored_dirs: Vec<String>,
    /// Maximum in-flight build tasks during a walk. `0` picks a default.
    pub build_concurrency: usize,
    /// Maximum in-flight compression jobs. `0` picks a default.
    pub compression_concurrency: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./apps"),
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(ToString::to_string).collect(),
            build_concurrency: 0,
            compression_concurrency: 0,
        }
    }
}

impl CacheOptions {
    /// Options for `root` with defaults elsewhere.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Replace the ignored directory names.
    #[must_use]
    pub fn with_ignored_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Set the build concurrency limit.
    #[must_use]
    pub fn with_build_concurrency(mut self, limit: usize) -> Self {
        self.build_concurrency = limit;
        self
    }

    /// Set the compression concurrency limit.
    #[must_use]
    pub fn with_compression_concurrency(mut self, limit: usize) -> Self {
        self.compression_concurrency = limit;
        self
    }

    /// Build concurrency with `0` resolved to available parallelism x 4.
    ///
    /// Build tasks mostly wait on the filesystem, so the default
    /// oversubscribes the cores.
    pub fn effective_build_concurrency(&self) -> usize {
        if self.build_concurrency == 0 {
            available_parallelism() * 4
        } else {
            self.build_concurrency
        }
    }

    /// Compression concurrency with `0` resolved to available parallelism.
    pub fn effective_compression_concurrency(&self) -> usize {
        if self.compression_concurrency == 0 {
            available_parallelism()
        } else {
            self.compression_concurrency
        }
    }

    /// Whether `path` is inside (or is) an ignored directory.
    ///
    /// Only components below `root` are checked, so a root that itself
    /// lives under an ignored name still works.
    pub fn is_ignored(&self, root: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(root).unwrap_or(path);
        relative.components().any(|component| {
            let name = component.as_os_str();
            self.ignored_dirs.iter().any(|ignored| name == ignored.as_str())
        })
    }
}

fn available_parallelism() -> usize {
    thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get)
}
