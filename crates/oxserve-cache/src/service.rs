//! The cache service object.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::builder::{BuildSummary, CacheBuilder};
use crate::error::{CacheError, CacheResult};
use crate::options::CacheOptions;
use crate::pipeline::ContentPipeline;
use crate::progress::CacheProgress;
use crate::record::{CacheEntry, FileRecord, FolderRecord};
use crate::store::CacheStore;
use crate::watch::{WatchEvent, WatchFeed, apply_event};

/// An open filesystem cache.
///
/// Construct with [`FsCache::open`], share the [`CacheStore`] with readers
/// via [`FsCache::store`], and shut down with [`FsCache::close`].
#[derive(Debug)]
pub struct FsCache {
    builder: CacheBuilder,
    progress: Arc<CacheProgress>,
    watch: Option<WatchFeed>,
    summary: BuildSummary,
}

impl FsCache {
    /// Open a cache over `options.root` and wait for the initial walk.
    ///
    /// Returns once every path found by the walk has been built. Background
    /// compression may still be running; records are servable without it.
    pub async fn open(options: CacheOptions, pipeline: ContentPipeline) -> CacheResult<Self> {
        Self::open_with_progress(options, pipeline, Arc::new(CacheProgress::new())).await
    }

    /// Like [`open`](Self::open), reporting into caller-owned counters so
    /// progress can be observed while the walk runs.
    #[instrument(level = "info", skip_all, fields(root = %options.root.display()))]
    pub async fn open_with_progress(
        options: CacheOptions,
        pipeline: ContentPipeline,
        progress: Arc<CacheProgress>,
    ) -> CacheResult<Self> {
        let root = match tokio::fs::canonicalize(&options.root).await {
            Ok(root) => root,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CacheError::NotADirectory(options.root.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        if !tokio::fs::metadata(&root).await?.is_dir() {
            return Err(CacheError::NotADirectory(root));
        }

        let builder = CacheBuilder::new(
            root.clone(),
            Arc::new(options),
            pipeline,
            Arc::new(CacheStore::new()),
            Arc::clone(&progress),
        );

        info!(root = %root.display(), "Building cache");
        let started = Instant::now();
        let summary = builder.build_tree(&root).await;
        info!(
            files = summary.files,
            folders = summary.folders,
            failed = summary.failed,
            elapsed_ms = started.elapsed().as_millis(),
            "Cache ready"
        );
        if summary.failed > 0 {
            warn!(failed = summary.failed, "Some paths could not be cached");
        }

        Ok(Self {
            builder,
            progress,
            watch: None,
            summary,
        })
    }

    /// Canonical cache root.
    pub fn root(&self) -> &Path {
        self.builder.root()
    }

    /// Shared store for readers.
    pub fn store(&self) -> Arc<CacheStore> {
        Arc::clone(self.builder.store())
    }

    /// Progress counters.
    pub fn progress(&self) -> &Arc<CacheProgress> {
        &self.progress
    }

    /// Totals from the initial walk.
    pub fn summary(&self) -> BuildSummary {
        self.summary
    }

    /// Look up a path in the store.
    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        self.builder.store().get(path)
    }

    /// Look up a file record.
    pub fn get_file(&self, path: &Path) -> Option<Arc<FileRecord>> {
        self.builder.store().get_file(path)
    }

    /// Look up a folder record.
    pub fn get_folder(&self, path: &Path) -> Option<Arc<FolderRecord>> {
        self.builder.store().get_folder(path)
    }

    /// Start the watch feed. Calling it twice is a no-op.
    pub fn watch(&mut self) -> CacheResult<()> {
        if self.watch.is_none() {
            self.watch = Some(WatchFeed::start(self.builder.clone())?);
        }
        Ok(())
    }

    /// Whether the watch feed is running.
    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    /// Apply a change as if the watch feed had reported it.
    pub async fn apply(&self, event: &WatchEvent) {
        apply_event(&self.builder, event).await;
    }

    /// Wait for queued compression jobs.
    pub async fn flush_compression(&self) {
        self.builder.flush_compression().await;
    }

    /// Paths currently cached, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths = self.builder.store().paths();
        paths.sort();
        paths
    }

    /// Stop the watch feed and wait for in-flight compression.
    ///
    /// The store stays readable through any `Arc` handed out earlier.
    pub async fn close(mut self) -> CacheResult<()> {
        if let Some(watch) = self.watch.take() {
            watch.stop().await?;
        }
        self.builder.flush_compression().await;
        self.builder.close();
        info!(root = %self.root().display(), "Cache closed");
        Ok(())
    }
}
