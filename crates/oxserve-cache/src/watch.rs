//! Filesystem watch feed.
//!
//! A `notify` watcher forwards raw events over a channel to a consumer task,
//! which maps them to [`WatchEvent`]s and re-runs the builder. Every
//! application is a full recompute of the affected path, so duplicated or
//! reordered events converge once the filesystem settles.

use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::builder::CacheBuilder;
use crate::error::CacheResult;

/// Kind of change reported for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchKind {
    /// The path appeared.
    Add,
    /// The path's content or metadata changed.
    Update,
    /// The path disappeared.
    Remove,
}

/// A single change to apply to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    /// What happened.
    pub kind: WatchKind,
    /// Absolute path affected.
    pub path: PathBuf,
}

impl WatchEvent {
    /// Create an event.
    pub fn new(kind: WatchKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// Translate a raw `notify` event into cache events.
///
/// Renames without a known direction are resolved by checking whether the
/// path still exists. Access events produce nothing.
pub fn translate(event: &notify::Event) -> Vec<WatchEvent> {
    let each = |kind: WatchKind| -> Vec<WatchEvent> {
        event
            .paths
            .iter()
            .map(|path| WatchEvent::new(kind, path.clone()))
            .collect()
    };

    match event.kind {
        EventKind::Create(_) => each(WatchKind::Add),
        EventKind::Remove(_) => each(WatchKind::Remove),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(WatchKind::Remove),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(WatchKind::Add),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => vec![
            WatchEvent::new(WatchKind::Remove, event.paths[0].clone()),
            WatchEvent::new(WatchKind::Add, event.paths[1].clone()),
        ],
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                let kind = if path.exists() {
                    WatchKind::Add
                } else {
                    WatchKind::Remove
                };
                WatchEvent::new(kind, path.clone())
            })
            .collect(),
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => each(WatchKind::Update),
        EventKind::Access(_) => Vec::new(),
    }
}

/// Apply one event to the cache.
///
/// - `Remove` deletes the entry and everything below it.
/// - `Add` builds the path, and its whole subtree if it is a directory.
/// - `Update` rebuilds the single path.
///
/// `Add` and `Remove` also refresh the parent folder's listing.
pub async fn apply_event(builder: &CacheBuilder, event: &WatchEvent) {
    let path = event.path.as_path();
    if builder.is_ignored(path) {
        trace!(path = %path.display(), "Ignoring event inside ignored directory");
        return;
    }
    debug!(path = %path.display(), kind = ?event.kind, "Applying watch event");

    match event.kind {
        WatchKind::Remove => {
            let removed = builder.store().remove_subtree(path);
            trace!(path = %path.display(), removed, "Removed cache entries");
            refresh_parent(builder, path).await;
        }
        WatchKind::Add => {
            let is_dir = tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir());
            if is_dir {
                let summary = builder.build_tree(path).await;
                trace!(path = %path.display(), files = summary.files, folders = summary.folders, "Built added subtree");
            } else {
                builder.build(path).await;
            }
            refresh_parent(builder, path).await;
        }
        WatchKind::Update => {
            builder.build(path).await;
        }
    }
}

async fn refresh_parent(builder: &CacheBuilder, path: &Path) {
    let Some(parent) = path.parent() else {
        return;
    };
    if !parent.starts_with(builder.root()) {
        return;
    }
    if builder.store().get_folder(parent).is_some() {
        builder.build_folder(parent).await;
    }
}

/// A running watcher and its consumer task.
pub struct WatchFeed {
    watcher: RecommendedWatcher,
    consumer: JoinHandle<()>,
    root: PathBuf,
}

impl std::fmt::Debug for WatchFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchFeed")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WatchFeed {
    /// Watch the builder's root recursively and apply changes as they come.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(builder: CacheBuilder) -> CacheResult<Self> {
        let root = builder.root().to_path_buf();
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Event>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    // Receiver gone means the feed is shutting down.
                    let _ = tx.send(event);
                }
                Err(e) => warn!(error = %e, "Watcher reported an error"),
            }
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        info!(root = %root.display(), "Watching cache root");

        let consumer = tokio::spawn(async move {
            while let Some(raw) = rx.recv().await {
                for event in translate(&raw) {
                    apply_event(&builder, &event).await;
                }
            }
            debug!("Watch consumer exiting");
        });

        Ok(Self {
            watcher,
            consumer,
            root,
        })
    }

    /// Root being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching and wait for queued events to drain.
    pub async fn stop(mut self) -> CacheResult<()> {
        if let Err(e) = self.watcher.unwatch(&self.root) {
            warn!(root = %self.root.display(), error = %e, "Failed to unwatch cache root");
        }
        // Dropping the watcher drops the sender and ends the consumer loop.
        drop(self.watcher);
        self.consumer.await?;
        info!(root = %self.root.display(), "Stopped watching cache root");
        Ok(())
    }
}
