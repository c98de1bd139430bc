//! Test server harness for HTTP integration tests.
//!
//! Builds an app tree in a temp dir, opens a cache over it and serves it
//! on an ephemeral port.

use oxserve_cache::{CacheOptions, ContentPipeline, FsCache, WatchEvent, WatchKind};
use oxserve_http::{FileServer, HttpConfig, RouteContext, Router, ServerConfig, SiteConfig};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Response, redirect};
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

use super::generators::{CLIP_SIZE, icon_bytes, media_clip, stylesheet};

/// `Accept` sent by default, as a browser would.
pub const BROWSER_ACCEPT: &str = "text/html,application/xhtml+xml,*/*;q=0.8";

/// Test server over this tree:
///
/// ```text
/// home/index.html          mounted at /
/// home/404/index.html      the not-found page
/// site/index.html
/// site/app.icon            served as /favicon.ico
/// site/.env
/// site/css/app.css
/// site/media/clip.mp4
/// docs/.fsindex.readme.html
/// docs/guide.txt
/// docs/a b.txt
/// docs/notes/todo.txt
/// ```
pub struct TestServer {
    server: FileServer,
    cache: FsCache,
    client: Client,
    /// Base URL for the server.
    pub base_url: String,
    dir: TempDir,
}

impl TestServer {
    /// Start with default HTTP settings.
    pub async fn start() -> Self {
        Self::with_http(HttpConfig::default()).await
    }

    /// Start with custom HTTP settings.
    pub async fn with_http(http: HttpConfig) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        populate(&dir);

        let root = fs::canonicalize(dir.path()).expect("Failed to canonicalize temp dir");
        let cache = FsCache::open(CacheOptions::new(&root), ContentPipeline::default())
            .await
            .expect("Failed to open cache");
        cache.flush_compression().await;

        let site = SiteConfig {
            landing_page: Some(root.join("home")),
            default_app: Some("site".to_string()),
            ..SiteConfig::default()
        };
        let ctx = RouteContext::new(cache.store(), cache.root().to_path_buf(), site, http)
            .with_display_base(root.clone());
        let router = Router::from_registry(&ctx).expect("Failed to build routes");

        let config = ServerConfig {
            port: 0,
            bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let server = FileServer::start(router, config)
            .await
            .expect("Failed to start file server");
        let base_url = server.url();

        // reqwest sends `Accept: */*` by default, which reads as a download.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self {
            server,
            cache,
            client,
            base_url,
            dir,
        }
    }

    /// Build a full URL from a path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Absolute path of `relative` inside the tree.
    pub fn path(&self, relative: &str) -> PathBuf {
        self.cache.root().join(relative)
    }

    /// The cache behind the server.
    pub fn cache(&self) -> &FsCache {
        &self.cache
    }

    /// HTTP client (redirects disabled, no automatic decompression).
    pub fn client(&self) -> &Client {
        &self.client
    }

    // ========== HTTP Convenience Methods ==========

    /// GET a path.
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET a path with extra headers.
    pub async fn get_with(&self, path: &str, headers: &[(&str, &str)]) -> Response {
        let mut request = self.client.get(self.url(path));
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request.send().await.expect("GET request failed")
    }

    /// GET with a `Range` header.
    pub async fn get_range(&self, path: &str, range: &str) -> Response {
        self.get_with(path, &[("range", range)]).await
    }

    /// GET a body as text.
    pub async fn get_text(&self, path: &str) -> String {
        self.get(path)
            .await
            .text()
            .await
            .expect("Failed to read response text")
    }

    // ========== Tree Mutation ==========

    /// Write a file and feed the change to the cache.
    pub async fn write(&self, relative: &str, contents: &[u8]) {
        let path = self.path(relative);
        let existed = path.exists();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&path, contents).expect("Failed to write file");
        let kind = if existed { WatchKind::Update } else { WatchKind::Add };
        self.cache.apply(&WatchEvent::new(kind, path)).await;
        self.cache.flush_compression().await;
    }

    /// Delete a file or directory and feed the change to the cache.
    pub async fn remove(&self, relative: &str) {
        let path = self.path(relative);
        if path.is_dir() {
            fs::remove_dir_all(&path).expect("Failed to remove dir");
        } else {
            fs::remove_file(&path).expect("Failed to remove file");
        }
        self.cache
            .apply(&WatchEvent::new(WatchKind::Remove, path))
            .await;
    }

    /// Stop the server and close the cache.
    pub async fn shutdown(self) {
        self.server.stop().await;
        self.cache.close().await.expect("Failed to close cache");
        drop(self.dir);
    }
}

fn populate(dir: &TempDir) {
    let write = |relative: &str, contents: &[u8]| {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(path, contents).expect("Failed to write fixture file");
    };

    write("home/index.html", b"<html><body><h1>Landing</h1></body></html>\n");
    write("home/404/index.html", b"<html><body><h1>Not found</h1></body></html>\n");
    write("site/index.html", b"<html><body><p>Site</p></body></html>\n");
    write("site/app.icon", &icon_bytes());
    write("site/.env", b"SECRET=1\n");
    write("site/css/app.css", stylesheet(200).as_bytes());
    write("site/media/clip.mp4", &media_clip(CLIP_SIZE));
    write("docs/.fsindex.readme.html", b"<p class=\"readme\">Read me first</p>");
    write("docs/guide.txt", b"plain text guide\n");
    write("docs/a b.txt", b"spaced\n");
    write("docs/notes/todo.txt", b"todo\n");
}
