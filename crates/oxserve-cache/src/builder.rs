//! Per-path record construction.
//!
//! [`CacheBuilder::build`] turns one absolute path into a published record.
//! Every step that can fail (stat, read, optimize, compress) fails for that
//! path only: the error is logged, counted, and the caller moves on.

use bytes::Bytes;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, trace, warn};

use crate::options::CacheOptions;
use crate::pipeline::{ContentPipeline, is_compressible};
use crate::progress::CacheProgress;
use crate::record::{CacheEntry, DirEntry, EntryKind, FileMeta, FileRecord, FolderRecord};
use crate::store::CacheStore;
use crate::walker::walk_stream;

/// Name of the directory index file.
pub const INDEX_FILE: &str = "index.html";

/// Name of the optional HTML fragment appended to directory listings.
pub const README_FILE: &str = ".fsindex.readme.html";

/// What [`CacheBuilder::build`] did with a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// A file record was published.
    File,
    /// A folder record was published.
    Folder,
    /// The path is ignored, or is neither a file nor a directory.
    Skipped,
    /// Stat or read failed; nothing was published.
    Failed,
}

/// Totals for a tree build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// File records published.
    pub files: usize,
    /// Folder records published.
    pub folders: usize,
    /// Paths skipped.
    pub skipped: usize,
    /// Paths that failed.
    pub failed: usize,
}

impl BuildSummary {
    fn record(mut self, outcome: BuildOutcome) -> Self {
        match outcome {
            BuildOutcome::File => self.files += 1,
            BuildOutcome::Folder => self.folders += 1,
            BuildOutcome::Skipped => self.skipped += 1,
            BuildOutcome::Failed => self.failed += 1,
        }
        self
    }
}

/// Builds and publishes cache records. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    root: Arc<PathBuf>,
    options: Arc<CacheOptions>,
    pipeline: ContentPipeline,
    store: Arc<CacheStore>,
    progress: Arc<CacheProgress>,
    compression: Arc<Semaphore>,
    compression_limit: usize,
}

impl CacheBuilder {
    /// Create a builder publishing into `store`. `root` must already be
    /// absolute and normalized.
    pub fn new(
        root: PathBuf,
        options: Arc<CacheOptions>,
        pipeline: ContentPipeline,
        store: Arc<CacheStore>,
        progress: Arc<CacheProgress>,
    ) -> Self {
        let compression_limit = options.effective_compression_concurrency();
        Self {
            root: Arc::new(root),
            options,
            pipeline,
            store,
            progress,
            compression: Arc::new(Semaphore::new(compression_limit)),
            compression_limit,
        }
    }

    /// Cache root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Options in effect.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Target store.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Whether `path` falls inside an ignored directory.
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.options.is_ignored(&self.root, path)
    }

    /// Build `start` and everything below it with bounded concurrency.
    ///
    /// Returns once every build task has finished. Compression jobs started
    /// along the way may still be running.
    pub async fn build_tree(&self, start: &Path) -> BuildSummary {
        let limit = self.options.effective_build_concurrency();
        debug!(start = %start.display(), limit, "Building tree");

        walk_stream(
            self.root.to_path_buf(),
            start.to_path_buf(),
            Arc::clone(&self.options),
        )
        .map(|path| async move { self.build(&path).await })
        .buffer_unordered(limit)
        .fold(BuildSummary::default(), |summary, outcome| async move {
            summary.record(outcome)
        })
        .await
    }

    /// Build and publish the record for a single path.
    ///
    /// Replaces any previous record at that key. Never removes entries:
    /// a path that cannot be stat'ed is left as it was.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn build(&self, path: &Path) -> BuildOutcome {
        self.progress.record_discovered();
        let outcome = self.build_inner(path).await;
        self.progress.record_processed();
        if outcome == BuildOutcome::Failed {
            self.progress.record_failed();
        }
        outcome
    }

    async fn build_inner(&self, path: &Path) -> BuildOutcome {
        if self.is_ignored(path) {
            trace!("Ignored path");
            return BuildOutcome::Skipped;
        }

        let metadata = match fs::metadata(path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat path, skipping");
                return BuildOutcome::Failed;
            }
        };

        if metadata.is_dir() {
            self.build_folder(path).await
        } else if metadata.is_file() {
            self.build_file(path, FileMeta::from_metadata(&metadata)).await
        } else {
            trace!("Not a regular file or directory");
            BuildOutcome::Skipped
        }
    }

    /// Rebuild only the folder record at `path`.
    pub async fn build_folder(&self, path: &Path) -> BuildOutcome {
        match self.read_folder(path).await {
            Ok(record) => {
                debug!(path = %path.display(), entries = record.entries.len(), "Published folder record");
                self.store.set(path.to_path_buf(), record);
                BuildOutcome::Folder
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read directory, skipping");
                BuildOutcome::Failed
            }
        }
    }

    async fn read_folder(&self, path: &Path) -> std::io::Result<FolderRecord> {
        let mut reader = fs::read_dir(path).await?;
        let mut entries = Vec::new();
        let mut index_path = None;
        let mut has_readme = false;

        while let Some(entry) = reader.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let kind = match entry.file_type().await {
                Ok(file_type) => EntryKind::from_file_type(file_type),
                Err(_) => EntryKind::Unknown,
            };

            if kind.is_directory() && self.options.ignored_dirs.iter().any(|d| *d == name) {
                continue;
            }
            if name == INDEX_FILE && !kind.is_directory() {
                index_path = Some(entry.path());
            }
            if name == README_FILE && !kind.is_directory() {
                has_readme = true;
            }
            entries.push(DirEntry::new(name, kind));
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));

        let readme_html = if has_readme {
            match fs::read(path.join(README_FILE)).await {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to read listing readme");
                    Bytes::new()
                }
            }
        } else {
            Bytes::new()
        };

        Ok(FolderRecord {
            index_path,
            readme_html,
            entries,
        })
    }

    async fn build_file(&self, path: &Path, meta: FileMeta) -> BuildOutcome {
        let bytes = match fs::read(path).await {
            Ok(bytes) => Bytes::from(bytes),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read file, skipping");
                return BuildOutcome::Failed;
            }
        };

        let pipeline = self.pipeline.clone();
        let owned_path = path.to_path_buf();
        let prepared = tokio::task::spawn_blocking(move || {
            let (mime, content) = pipeline.prepare(&owned_path, bytes);
            FileRecord::new(mime, content, meta)
        })
        .await;

        let record = match prepared {
            Ok(record) => Arc::new(record),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Content preparation task failed");
                return BuildOutcome::Failed;
            }
        };

        debug!(
            path = %path.display(),
            mime = %record.mime_type,
            size = record.len(),
            "Published file record"
        );
        self.store
            .set(path.to_path_buf(), CacheEntry::File(Arc::clone(&record)));

        if is_compressible(&record.mime_type) {
            self.schedule_compression(path.to_path_buf(), record).await;
        }

        BuildOutcome::File
    }

    /// Queue background compression for `record`.
    ///
    /// The permit is taken before spawning, so a saturated compressor slows
    /// the builder down instead of queueing unbounded work.
    async fn schedule_compression(&self, path: PathBuf, record: Arc<FileRecord>) {
        let Ok(permit) = Arc::clone(&self.compression).acquire_owned().await else {
            trace!(path = %path.display(), "Compression closed, skipping");
            return;
        };
        self.progress.record_compression_queued();

        let pipeline = self.pipeline.clone();
        let store = Arc::clone(&self.store);
        let progress = Arc::clone(&self.progress);

        tokio::spawn(async move {
            let source = Arc::clone(&record);
            let result = tokio::task::spawn_blocking(move || pipeline.compress(&source.content)).await;

            match result {
                Ok(Ok(compressed)) => {
                    let size = compressed.len();
                    if store.attach_compressed(&path, &record, compressed) {
                        trace!(path = %path.display(), original = record.len(), compressed = size, "Attached compressed content");
                    } else {
                        trace!(path = %path.display(), "Record replaced or removed before compression finished");
                    }
                }
                Ok(Err(e)) => {
                    warn!(path = %path.display(), error = %e, "Compression failed");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Compression task failed");
                }
            }

            progress.record_compression_done();
            drop(permit);
        });
    }

    /// Wait until every compression job queued so far has finished.
    pub async fn flush_compression(&self) {
        let permits = u32::try_from(self.compression_limit).unwrap_or(u32::MAX);
        if let Ok(all) = self.compression.acquire_many(permits).await {
            drop(all);
        }
    }

    /// Refuse new compression jobs.
    pub fn close(&self) {
        self.compression.close();
    }
}
