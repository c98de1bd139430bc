//! Concurrent path -> record store.
//!
//! Backed by `DashMap`. Writers publish whole records by replacing the map
//! entry; readers clone the entry's `Arc` out and never hold a shard lock
//! past the lookup.

use bytes::Bytes;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::{CacheEntry, FileRecord, FolderRecord};

/// Lookup counters.
#[derive(Debug, Default)]
pub struct StoreStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl StoreStats {
    #[inline]
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Successful lookups.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Failed lookups.
    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit rate in `0.0..=1.0`, `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hit_count();
        let total = hits + self.miss_count();
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

/// The shared cache map.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: DashMap<PathBuf, CacheEntry>,
    stats: StoreStats,
}

impl CacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `path`.
    pub fn get(&self, path: &Path) -> Option<CacheEntry> {
        let found = self.entries.get(path).map(|entry| entry.value().clone());
        if found.is_some() {
            self.stats.record_hit();
        } else {
            self.stats.record_miss();
        }
        found
    }

    /// Look up a file record at `path`.
    pub fn get_file(&self, path: &Path) -> Option<Arc<FileRecord>> {
        self.get(path).and_then(|entry| entry.as_file().cloned())
    }

    /// Look up a folder record at `path`.
    pub fn get_folder(&self, path: &Path) -> Option<Arc<FolderRecord>> {
        self.get(path).and_then(|entry| entry.as_folder().cloned())
    }

    /// Publish `entry` at `path`, replacing whatever was there.
    pub fn set(&self, path: PathBuf, entry: impl Into<CacheEntry>) -> Option<CacheEntry> {
        self.entries.insert(path, entry.into())
    }

    /// Remove the entry at `path`.
    pub fn remove(&self, path: &Path) -> Option<CacheEntry> {
        self.entries.remove(path).map(|(_, entry)| entry)
    }

    /// Remove `path` and every key below it. Returns the number removed.
    pub fn remove_subtree(&self, path: &Path) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(path));
        before.saturating_sub(self.entries.len())
    }

    /// Attach compressed bytes to `record` if it is still the entry
    /// published at `path`.
    ///
    /// Returns `false` when the entry was removed or replaced in the
    /// meantime, in which case the bytes are dropped.
    pub fn attach_compressed(&self, path: &Path, record: &Arc<FileRecord>, bytes: Bytes) -> bool {
        let Some(entry) = self.entries.get(path) else {
            return false;
        };
        match entry.value() {
            CacheEntry::File(current) if Arc::ptr_eq(current, record) => {
                current.attach_compressed(bytes)
            }
            _ => false,
        }
    }

    /// Whether `path` has an entry. Not counted in the lookup stats.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All cached paths, unordered.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Lookup counters.
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
