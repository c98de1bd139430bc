//! Configuration file support for oxserve.
//!
//! Configuration is read from `./oxserve.toml` unless `--config` points
//! elsewhere. Every section is optional; missing keys take built-in
//! defaults.
//!
//! # Example configuration
//!
//! ```toml
//! [network]
//! bind = "0.0.0.0"
//! port = 8080
//!
//! [cache]
//! root = "./apps"
//! optimize_files = true
//! ignored_dirs = [".git", "node_modules"]
//!
//! [http]
//! not_found_route = "/404/"
//!
//! [mime_overrides]
//! mjs = "text/javascript"
//!
//! [mime_manual_cache_time]
//! image = 60
//!
//! [site]
//! landing_page = "./apps/home"
//! default_app = "home"
//!
//! [site.path_map]
//! "/docs" = "./apps/docs"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::net::{IpAddr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxserve_cache::pipeline::{BrotliCompressor, DEFAULT_BROTLI_WINDOW, SniffingDetector, StandardOptimizer};
use oxserve_cache::{CacheOptions, ContentPipeline, DEFAULT_IGNORED_DIRS};
use oxserve_http::{
    CacheTimes, DEFAULT_CHUNK_CAP, DEFAULT_ICON_BASE, DEFAULT_NOT_FOUND_ROUTE, DEFAULT_PORT,
    DEFAULT_UNCACHEABLE_SIZE, HttpConfig, ServerConfig, SiteConfig,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

/// Default configuration path.
pub const DEFAULT_CONFIG_PATH: &str = "oxserve.toml";

/// Top-level sections, in file order.
pub const SECTIONS: &[&str] = &[
    "network",
    "cache",
    "http",
    "mime_overrides",
    "mime_manual_cache_time",
    "site",
];

/// A configuration file that exists but cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<toml::de::Error>,
    },
}

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Listening socket.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Cache root and build settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Delivery and listing settings.
    #[serde(default)]
    pub http: HttpSection,

    /// Extension to MIME type.
    #[serde(default)]
    pub mime_overrides: HashMap<String, String>,

    /// MIME substring to max-age in minutes.
    #[serde(default)]
    pub mime_manual_cache_time: HashMap<String, u64>,

    /// Mounts.
    #[serde(default)]
    pub site: SiteSection,
}

/// `[network]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Bind address.
    pub bind: IpAddr,
    /// Listening port.
    pub port: u16,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

/// `[cache]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory to cache.
    pub root: PathBuf,
    /// Minify and canonicalize content.
    pub optimize_files: bool,
    /// Directory names never walked.
    pub ignored_dirs: Vec<String>,
    /// Concurrent build tasks (0 = auto).
    pub build_concurrency: usize,
    /// Concurrent compression tasks (0 = auto).
    pub compression_concurrency: usize,
    /// Brotli quality, 0 to 11.
    pub compression_quality: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./apps"),
            optimize_files: true,
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(ToString::to_string).collect(),
            build_concurrency: 0,
            compression_concurrency: 0,
            compression_quality: 4,
        }
    }
}

/// `[http]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Redirect target for unknown paths.
    pub not_found_route: String,
    /// Whole bodies above this size are not cacheable.
    pub uncacheable_size: u64,
    /// Cap on an open-ended range.
    pub stream_chunk_cap: u64,
    /// Directory with listing template overrides.
    pub listing_templates: Option<PathBuf>,
    /// Base URL for listing icons.
    pub listing_icon_base: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            not_found_route: DEFAULT_NOT_FOUND_ROUTE.to_string(),
            uncacheable_size: DEFAULT_UNCACHEABLE_SIZE,
            stream_chunk_cap: DEFAULT_CHUNK_CAP,
            listing_templates: None,
            listing_icon_base: DEFAULT_ICON_BASE.to_string(),
        }
    }
}

/// `[site]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Directory mounted at `/`.
    pub landing_page: Option<PathBuf>,
    /// App whose icon is `/favicon.ico`.
    pub default_app: Option<String>,
    /// URL prefix to directory.
    pub path_map: BTreeMap<String, PathBuf>,
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file yields defaults. Sections absent from the file are
    /// reported at `warn` and filled with defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })?;

        for section in missing_sections(&content) {
            warn!(section, "Config section missing, using defaults");
        }
        Ok(config)
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Cache walk settings.
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions::new(&self.cache.root)
            .with_ignored_dirs(&self.cache.ignored_dirs)
            .with_build_concurrency(self.cache.build_concurrency)
            .with_compression_concurrency(self.cache.compression_concurrency)
    }

    /// Content pipeline with the configured quality and overrides.
    pub fn pipeline(&self) -> ContentPipeline {
        ContentPipeline::new(
            Arc::new(SniffingDetector),
            Arc::new(StandardOptimizer),
            Arc::new(BrotliCompressor::new(
                self.cache.compression_quality,
                DEFAULT_BROTLI_WINDOW,
            )),
        )
        .with_mime_overrides(self.mime_overrides.clone())
        .with_optimize_files(self.cache.optimize_files)
    }

    /// Delivery and listing settings.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            not_found_route: self.http.not_found_route.clone(),
            uncacheable_size: self.http.uncacheable_size,
            stream_chunk_cap: self.http.stream_chunk_cap,
            mime_manual_cache_time: CacheTimes::new(
                self.mime_manual_cache_time
                    .iter()
                    .map(|(mime, minutes)| (mime.clone(), *minutes)),
            ),
            listing_templates: self.http.listing_templates.clone(),
            listing_icon_base: self.http.listing_icon_base.clone(),
        }
    }

    /// Mount settings.
    pub fn site_config(&self) -> SiteConfig {
        SiteConfig {
            landing_page: self.site.landing_page.clone(),
            default_app: self.site.default_app.clone(),
            path_map: self.site.path_map.clone(),
        }
    }

    /// Listening socket.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            port: self.network.port,
            bind_address: self.network.bind,
        }
    }
}

/// Top-level sections not present in `content`.
fn missing_sections(content: &str) -> Vec<&'static str> {
    let Ok(table) = toml::from_str::<toml::Table>(content) else {
        return Vec::new();
    };
    SECTIONS
        .iter()
        .copied()
        .filter(|section| !table.contains_key(*section))
        .collect()
}
