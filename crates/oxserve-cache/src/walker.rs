//! Directory tree enumeration.
//!
//! The walk itself is blocking (`walkdir`), so it runs on the blocking pool
//! and hands paths to async consumers through a bounded channel. Ignored
//! directories are pruned with `filter_entry`, so their subtrees are never
//! read.

use futures::Stream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::options::CacheOptions;

const CHANNEL_CAPACITY: usize = 1024;

/// Walk `start` (inclusive), yielding every path not inside an ignored
/// directory. Symlinks are reported but not followed.
///
/// Unreadable entries are logged and skipped.
pub fn walk_paths(root: &Path, start: &Path, options: &CacheOptions) -> Vec<PathBuf> {
    WalkDir::new(start)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !options.is_ignored(root, entry.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry.into_path()),
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "Skipping unreadable entry during walk");
                None
            }
        })
        .collect()
}

/// Streaming variant of [`walk_paths`] for large trees.
///
/// The walk starts immediately on the blocking pool; paths arrive as they
/// are discovered. The stream ends when the walk finishes.
pub fn walk_stream(
    root: PathBuf,
    start: PathBuf,
    options: Arc<CacheOptions>,
) -> impl Stream<Item = PathBuf> + Send + Unpin + 'static {
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

    tokio::task::spawn_blocking(move || {
        let walker = WalkDir::new(&start)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !options.is_ignored(&root, entry.path()));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if tx.blocking_send(entry.into_path()).is_err() {
                        debug!(start = %start.display(), "Walk consumer dropped, stopping early");
                        return;
                    }
                }
                Err(e) => {
                    warn!(path = ?e.path(), error = %e, "Skipping unreadable entry during walk");
                }
            }
        }
    });

    futures::stream::poll_fn(move |cx| rx.poll_recv(cx))
}
