//! Temporary app trees and cache setup.

use oxserve_cache::{CacheOptions, ContentPipeline, FsCache};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use super::generators::{commented_json, png_header, stylesheet};

/// A temporary apps directory with a couple of sites.
///
/// ```text
/// site/
///   index.html
///   .hidden
///   css/app.css
///   img/logo.png
///   data/config.jsonc
/// docs/
///   .fsindex.readme.html
///   guide.txt
/// .git/HEAD
/// ```
pub struct AppTree {
    dir: TempDir,
}

impl AppTree {
    /// Create the standard tree.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let tree = Self { dir };
        tree.write(
            "site/index.html",
            "<html>\n  <!-- layout -->\n  <body>  \n\n    <p>Hello</p>\n  </body>\n</html>\n",
        );
        tree.write("site/.hidden", "secret");
        tree.write("site/css/app.css", &stylesheet(50));
        tree.write_bytes("site/img/logo.png", &png_header());
        tree.write("site/data/config.jsonc", commented_json());
        tree.write("docs/.fsindex.readme.html", "<p>Read me</p>");
        tree.write("docs/guide.txt", "plain text guide");
        tree.write(".git/HEAD", "ref: refs/heads/main");
        tree
    }

    /// Root of the tree, canonicalized to match cache keys.
    pub fn root(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).expect("Failed to canonicalize temp dir")
    }

    /// Absolute path of `relative` inside the tree.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// Write a text file, creating parents.
    pub fn write(&self, relative: &str, contents: &str) {
        self.write_bytes(relative, contents.as_bytes());
    }

    /// Write a binary file, creating parents.
    pub fn write_bytes(&self, relative: &str, contents: &[u8]) {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(path, contents).expect("Failed to write fixture file");
    }

    /// Delete a file or directory.
    pub fn remove(&self, relative: &str) {
        let path = self.dir.path().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).expect("Failed to remove fixture dir");
        } else {
            fs::remove_file(path).expect("Failed to remove fixture file");
        }
    }

    /// Open a cache over this tree with the default pipeline.
    pub async fn open(&self) -> FsCache {
        self.open_with(ContentPipeline::default()).await
    }

    /// Open a cache over this tree with a custom pipeline.
    pub async fn open_with(&self, pipeline: ContentPipeline) -> FsCache {
        FsCache::open(CacheOptions::new(self.dir.path()), pipeline)
            .await
            .expect("Failed to open cache")
    }
}

/// Poll `check` until it returns true or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    check()
}

/// Whether `path` is cached as a file.
pub fn is_cached_file(cache: &FsCache, path: &Path) -> bool {
    cache.get_file(path).is_some()
}
