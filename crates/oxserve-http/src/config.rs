//! Request server settings.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::delivery::CacheTimes;
use crate::file::{DEFAULT_UNCACHEABLE_SIZE, DeliveryConfig};
use crate::listing::DEFAULT_ICON_BASE;
use crate::range::DEFAULT_CHUNK_CAP;

/// Where unresolved requests are redirected.
pub const DEFAULT_NOT_FOUND_ROUTE: &str = "/404/";

/// Delivery and listing settings.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Redirect target for paths with no cache entry.
    pub not_found_route: String,
    /// Whole bodies above this size get `no-store`.
    pub uncacheable_size: u64,
    /// Cap on an open-ended range.
    pub stream_chunk_cap: u64,
    /// Per-MIME max-age table.
    pub mime_manual_cache_time: CacheTimes,
    /// Directory with listing template overrides.
    pub listing_templates: Option<PathBuf>,
    /// Base URL for listing icons.
    pub listing_icon_base: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            not_found_route: DEFAULT_NOT_FOUND_ROUTE.to_string(),
            uncacheable_size: DEFAULT_UNCACHEABLE_SIZE,
            stream_chunk_cap: DEFAULT_CHUNK_CAP,
            mime_manual_cache_time: CacheTimes::default(),
            listing_templates: None,
            listing_icon_base: DEFAULT_ICON_BASE.to_string(),
        }
    }
}

impl HttpConfig {
    /// The subset used by file delivery.
    pub fn delivery(&self) -> DeliveryConfig {
        DeliveryConfig {
            uncacheable_size: self.uncacheable_size,
            stream_chunk_cap: self.stream_chunk_cap,
            cache_times: self.mime_manual_cache_time.clone(),
        }
    }
}

/// Which directories are mounted where.
#[derive(Debug, Clone, Default)]
pub struct SiteConfig {
    /// Directory served at `/`.
    pub landing_page: Option<PathBuf>,
    /// Application whose `app.icon` is served as `/favicon.ico`.
    pub default_app: Option<String>,
    /// Extra mounts: URL prefix to directory.
    pub path_map: BTreeMap<String, PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.not_found_route, "/404/");
        assert_eq!(config.uncacheable_size, 10 * 1024 * 1024);
        assert_eq!(config.stream_chunk_cap, 2 * 1024 * 1024);
        assert_eq!(config.listing_icon_base, "/ipl/folderIndex/icon");
    }

    #[test]
    fn test_delivery_subset() {
        let config = HttpConfig {
            uncacheable_size: 7,
            mime_manual_cache_time: CacheTimes::new([("text", 1)]),
            ..HttpConfig::default()
        };
        let delivery = config.delivery();
        assert_eq!(delivery.uncacheable_size, 7);
        assert_eq!(delivery.cache_times.max_age_secs("text/css"), Some(60));
    }
}
