//! Content-negotiating HTTP file server over the oxserve cache.
//!
//! Requests never touch the filesystem: every path is resolved against an
//! [`oxserve_cache::CacheStore`] and answered from the cached record.
//!
//! # How It Works
//!
//! 1. A [`Router`] is built from the registered route initializers
//! 2. Each request goes to the route with the longest matching prefix
//! 3. File routes map the path onto the cache and pick a delivery: `304`,
//!    a `206` slice, or a whole body (Brotli when the client accepts it)
//! 4. Folders without an index are rendered as HTML listings
//!
//! # Example
//!
//! ```no_run
//! use oxserve_cache::{CacheOptions, FsCache};
//! use oxserve_http::{FileServer, HttpConfig, RouteContext, Router, ServerConfig, SiteConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = FsCache::open(CacheOptions::new("./apps"), Default::default()).await?;
//! let ctx = RouteContext::new(
//!     cache.store(),
//!     cache.root().to_path_buf(),
//!     SiteConfig::default(),
//!     HttpConfig::default(),
//! );
//! let server = FileServer::start(Router::from_registry(&ctx)?, ServerConfig::default()).await?;
//! println!("Serving on {}", server.url());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod delivery;
mod error;
mod file;
mod listing;
mod query;
mod range;
mod resolve;
mod response;
mod routes;
mod server;

pub use config::{DEFAULT_NOT_FOUND_ROUTE, HttpConfig, SiteConfig};
pub use delivery::{
    CachePolicy, CacheTimes, Delivery, DeliveryMode, accepts_brotli, cache_policy,
    classify_delivery, if_none_match, is_streamable_media,
};
pub use error::{HttpError, HttpResult};
pub use file::{CDN_CACHE_CONTROL, DEFAULT_UNCACHEABLE_SIZE, DeliveryConfig, deliver_file};
pub use listing::{DEFAULT_ICON_BASE, ListingRenderer, ListingTemplates, fill};
pub use query::{QueryFlags, query_suffix, with_param};
pub use range::{ByteRange, DEFAULT_CHUNK_CAP, DEFAULT_RANGE, RangeError, parse_range};
pub use resolve::{Resolution, resolve, resolve_path, strip_route_prefix};
pub use response::Body;
pub use routes::{
    APP_ICON_FILE, FaviconRoute, FileRoute, ROUTES, Route, RouteContext, RouteHandler,
    RouteInit, RouteRequest, Router, file_routes, not_found,
};
pub use server::{DEFAULT_PORT, FileServer, ServerConfig};
