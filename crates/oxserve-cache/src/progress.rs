//! Build progress counters.
//!
//! Lock-free and purely observational: nothing in the cache reads these to
//! make decisions. The CLI polls [`CacheProgress::snapshot`] to draw its
//! startup bar.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counters for walk and compression progress.
#[derive(Debug, Default)]
pub struct CacheProgress {
    discovered: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    compressions_queued: AtomicU64,
    compressions_done: AtomicU64,
}

/// Point-in-time copy of [`CacheProgress`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Paths handed to the builder.
    pub discovered: u64,
    /// Paths the builder finished with, successfully or not.
    pub processed: u64,
    /// Paths dropped because of a stat or read failure.
    pub failed: u64,
    /// Compression jobs not yet finished.
    pub compressions_pending: u64,
    /// Compression jobs finished.
    pub compressions_done: u64,
}

impl ProgressSnapshot {
    /// Fraction of discovered paths processed, `1.0` when nothing was found.
    pub fn fraction(&self) -> f64 {
        if self.discovered == 0 {
            1.0
        } else {
            self.processed as f64 / self.discovered as f64
        }
    }

    /// Whether every discovered path has been processed.
    pub fn is_complete(&self) -> bool {
        self.processed >= self.discovered
    }
}

impl CacheProgress {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_discovered(&self) {
        self.discovered.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_compression_queued(&self) {
        self.compressions_queued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_compression_done(&self) {
        self.compressions_done.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let queued = self.compressions_queued.load(Ordering::Relaxed);
        let done = self.compressions_done.load(Ordering::Relaxed);
        ProgressSnapshot {
            discovered: self.discovered.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            compressions_pending: queued.saturating_sub(done),
            compressions_done: done,
        }
    }
}
