//! In-memory filesystem cache for static application serving.
//!
//! The cache walks a directory tree once, turns every file and directory
//! into an immutable record, and then keeps the records current from a
//! filesystem watch feed.
//!
//! # Components
//!
//! - [`ContentPipeline`] - MIME resolution, optional optimization, hashing
//!   and compression, each behind a pluggable trait
//! - [`CacheBuilder`] - builds and publishes the record for one path
//! - [`walk_paths`] / [`walk_stream`] - tree enumeration that prunes ignored
//!   directories
//! - [`WatchFeed`] - `notify` events mapped to add/update/remove and applied
//!   through the builder
//! - [`CacheStore`] - the shared `DashMap` readers query
//! - [`FsCache`] - the service object tying it together
//!
//! # Consistency
//!
//! Writers publish a complete record by replacing the map entry. The only
//! later change to a published record is its compressed representation,
//! which lives in a write-once cell: readers see none or all of it, and
//! compression finishing after the record was replaced or removed is
//! dropped.
//!
//! # Example
//!
//! ```no_run
//! use oxserve_cache::{CacheOptions, ContentPipeline, FsCache};
//!
//! # async fn run() -> oxserve_cache::CacheResult<()> {
//! let mut cache = FsCache::open(CacheOptions::new("./apps"), ContentPipeline::default()).await?;
//! cache.watch()?;
//!
//! if let Some(record) = cache.get_file(&cache.root().join("site/index.html")) {
//!     println!("{} bytes, etag {}", record.len(), record.hash);
//! }
//!
//! cache.close().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod builder;
mod error;
mod options;
pub mod pipeline;
mod progress;
mod record;
mod service;
mod store;
mod walker;
mod watch;

pub use builder::{BuildOutcome, BuildSummary, CacheBuilder, INDEX_FILE, README_FILE};
pub use error::{CacheError, CacheResult, OptimizeError};
pub use options::{CacheOptions, DEFAULT_IGNORED_DIRS};
pub use pipeline::{Compressor, ContentPipeline, MimeDetector, Optimizer};
pub use progress::{CacheProgress, ProgressSnapshot};
pub use record::{
    CacheEntry, DirEntry, EntryKind, FileMeta, FileRecord, FolderRecord, permissions_string,
};
pub use service::FsCache;
pub use store::{CacheStore, StoreStats};
pub use walker::{walk_paths, walk_stream};
pub use watch::{WatchEvent, WatchFeed, WatchKind, apply_event, translate};
