//! Route registry and dispatch.
//!
//! Routes are produced by a compile-time list of initializers. Each
//! initializer turns the site configuration into `(prefix, handler)`
//! pairs; the [`Router`] dispatches a request to the longest prefix that
//! matches on a segment boundary.

use hyper::header::HeaderMap;
use hyper::{Method, Response, StatusCode, Uri};
use oxserve_cache::CacheStore;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::{HttpConfig, SiteConfig};
use crate::error::{HttpError, HttpResult};
use crate::file::{DeliveryConfig, deliver_file};
use crate::listing::{ListingRenderer, ListingTemplates};
use crate::query::QueryFlags;
use crate::resolve::{Resolution, resolve, strip_route_prefix};
use crate::response::{Body, empty, html, method_not_allowed, redirect, strip_body};

/// Icon file served as `/favicon.ico`, relative to the default app.
pub const APP_ICON_FILE: &str = "app.icon";

/// A request as seen by a route handler.
#[derive(Debug, Clone, Copy)]
pub struct RouteRequest<'a> {
    /// Full request path, still percent-encoded.
    pub path: &'a str,
    /// Part of `path` below the route prefix.
    pub relative: &'a str,
    /// Raw query string.
    pub query: Option<&'a str>,
    /// Request headers.
    pub headers: &'a HeaderMap,
}

/// Something that answers requests under a prefix.
pub trait RouteHandler: Send + Sync + fmt::Debug {
    /// Produce the response. Never fails: errors are HTTP statuses.
    fn handle(&self, request: &RouteRequest<'_>) -> Response<Body>;
}

/// A mounted handler.
#[derive(Debug, Clone)]
pub struct Route {
    /// URL prefix, starting with `/`.
    pub prefix: String,
    /// Handler for requests under `prefix`.
    pub handler: Arc<dyn RouteHandler>,
}

impl Route {
    /// Mount `handler` at `prefix`.
    pub fn new(prefix: impl Into<String>, handler: Arc<dyn RouteHandler>) -> Self {
        Self {
            prefix: prefix.into(),
            handler,
        }
    }
}

/// Everything initializers need to build routes.
#[derive(Debug, Clone)]
pub struct RouteContext {
    /// Shared cache store.
    pub store: Arc<CacheStore>,
    /// Canonical cache root; mounted directories must live under it.
    pub cache_root: PathBuf,
    /// Mount configuration.
    pub site: SiteConfig,
    /// Delivery and listing settings.
    pub http: HttpConfig,
    /// Listing headers show paths relative to this directory.
    pub display_base: PathBuf,
}

impl RouteContext {
    /// Create a context whose listings are relative to the working
    /// directory.
    pub fn new(store: Arc<CacheStore>, cache_root: PathBuf, site: SiteConfig, http: HttpConfig) -> Self {
        let display_base = std::env::current_dir().unwrap_or_else(|_| cache_root.clone());
        Self {
            store,
            cache_root,
            site,
            http,
            display_base,
        }
    }

    /// Override the listing display base.
    #[must_use]
    pub fn with_display_base(mut self, base: PathBuf) -> Self {
        self.display_base = base;
        self
    }
}

/// A named route initializer.
#[derive(Debug, Clone, Copy)]
pub struct RouteInit {
    /// Name used in logs.
    pub name: &'static str,
    /// Builds the routes.
    pub init: fn(&RouteContext) -> HttpResult<Vec<Route>>,
}

/// Initializers run at startup, in order.
pub static ROUTES: &[RouteInit] = &[RouteInit {
    name: "files",
    init: file_routes,
}];

/// Shared state of the file-serving handlers.
#[derive(Debug)]
struct ServeState {
    store: Arc<CacheStore>,
    delivery: DeliveryConfig,
    listing: ListingRenderer,
    not_found_route: String,
}

/// Serves a directory tree out of the cache.
#[derive(Debug)]
pub struct FileRoute {
    root: PathBuf,
    state: Arc<ServeState>,
}

impl FileRoute {
    /// Directory this route serves.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl RouteHandler for FileRoute {
    fn handle(&self, request: &RouteRequest<'_>) -> Response<Body> {
        let flags = QueryFlags::parse(request.query);
        let resolution = resolve(
            &self.state.store,
            &self.root,
            request.path,
            request.relative,
            request.query,
            &flags,
        );

        match resolution {
            Resolution::File(record) => deliver_file(&record, request.headers, &flags, &self.state.delivery),
            Resolution::Listing { path, folder } => html(self.state.listing.render(
                &path,
                &folder,
                request.path,
                request.query,
                &flags,
            )),
            Resolution::Redirect(location) => redirect(&location),
            Resolution::NotFound => not_found(request.path, &self.state.not_found_route),
        }
    }
}

/// Serves the default app's icon.
#[derive(Debug)]
pub struct FaviconRoute {
    icon: PathBuf,
    state: Arc<ServeState>,
}

impl RouteHandler for FaviconRoute {
    fn handle(&self, request: &RouteRequest<'_>) -> Response<Body> {
        if !request.relative.is_empty() {
            return not_found(request.path, &self.state.not_found_route);
        }
        match self.state.store.get_file(&self.icon) {
            Some(record) => deliver_file(
                &record,
                request.headers,
                &QueryFlags::parse(request.query),
                &self.state.delivery,
            ),
            None => empty(StatusCode::NOT_FOUND),
        }
    }
}

/// The built-in `files` initializer.
///
/// Mounts the landing page at `/`, the cache root at `/apps`, every
/// `path_map` entry, and `/favicon.ico` when a default app is set.
pub fn file_routes(ctx: &RouteContext) -> HttpResult<Vec<Route>> {
    let templates = ListingTemplates::load(ctx.http.listing_templates.as_deref());
    let state = Arc::new(ServeState {
        store: Arc::clone(&ctx.store),
        delivery: ctx.http.delivery(),
        listing: ListingRenderer::new(
            templates,
            ctx.http.listing_icon_base.clone(),
            ctx.display_base.clone(),
        ),
        not_found_route: ctx.http.not_found_route.clone(),
    });

    let file_route = |prefix: &str, dir: &Path| -> HttpResult<Route> {
        let root = mount_dir(ctx, prefix, dir)?;
        Ok(Route::new(
            normalize_prefix(prefix)?,
            Arc::new(FileRoute {
                root,
                state: Arc::clone(&state),
            }),
        ))
    };

    let mut routes = Vec::new();
    if let Some(landing) = &ctx.site.landing_page {
        routes.push(file_route("/", landing)?);
    }
    routes.push(file_route("/apps", &ctx.cache_root)?);
    for (prefix, dir) in &ctx.site.path_map {
        routes.push(file_route(prefix, dir)?);
    }
    if let Some(app) = &ctx.site.default_app {
        routes.push(Route::new(
            "/favicon.ico",
            Arc::new(FaviconRoute {
                icon: ctx.cache_root.join(app).join(APP_ICON_FILE),
                state: Arc::clone(&state),
            }),
        ));
    }
    Ok(routes)
}

fn normalize_prefix(prefix: &str) -> HttpResult<String> {
    if !prefix.starts_with('/') {
        return Err(HttpError::invalid_route(prefix, "prefix must start with '/'"));
    }
    let trimmed = prefix.trim_end_matches('/');
    Ok(if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    })
}

fn mount_dir(ctx: &RouteContext, prefix: &str, dir: &Path) -> HttpResult<PathBuf> {
    let dir = if dir.is_relative() && !dir.exists() {
        ctx.cache_root.join(dir)
    } else {
        dir.to_path_buf()
    };
    let canonical = dir.canonicalize().map_err(|e| {
        HttpError::invalid_route(prefix, format!("cannot open {}: {e}", dir.display()))
    })?;
    if !canonical.is_dir() {
        return Err(HttpError::invalid_route(
            prefix,
            format!("{} is not a directory", canonical.display()),
        ));
    }
    if !canonical.starts_with(&ctx.cache_root) {
        return Err(HttpError::invalid_route(
            prefix,
            format!(
                "{} is outside the cache root {}",
                canonical.display(),
                ctx.cache_root.display()
            ),
        ));
    }
    Ok(canonical)
}

/// Redirect to the not-found route, or a plain `404` for requests already
/// under it.
pub fn not_found(path: &str, not_found_route: &str) -> Response<Body> {
    if strip_route_prefix(path, not_found_route).is_some() {
        empty(StatusCode::NOT_FOUND)
    } else {
        redirect(not_found_route)
    }
}

/// Dispatches requests to mounted routes.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    not_found_route: String,
}

impl Router {
    /// Build a router from explicit routes.
    ///
    /// Fails on duplicate prefixes.
    pub fn new(mut routes: Vec<Route>, not_found_route: impl Into<String>) -> HttpResult<Self> {
        for route in &mut routes {
            route.prefix = normalize_prefix(&route.prefix)?;
        }
        routes.sort_by(|a, b| {
            b.prefix
                .len()
                .cmp(&a.prefix.len())
                .then_with(|| a.prefix.cmp(&b.prefix))
        });
        if let Some(pair) = routes.windows(2).find(|w| w[0].prefix == w[1].prefix) {
            return Err(HttpError::invalid_route(
                pair[0].prefix.clone(),
                "prefix is mounted twice",
            ));
        }

        Ok(Self {
            routes,
            not_found_route: not_found_route.into(),
        })
    }

    /// Run every registered initializer against `ctx`.
    pub fn from_registry(ctx: &RouteContext) -> HttpResult<Self> {
        let mut routes = Vec::new();
        for init in ROUTES {
            let built = (init.init)(ctx)?;
            info!(
                initializer = init.name,
                prefixes = ?built.iter().map(|r| r.prefix.as_str()).collect::<Vec<_>>(),
                "Routes registered"
            );
            routes.extend(built);
        }
        Self::new(routes, ctx.http.not_found_route.clone())
    }

    /// Mounted prefixes, longest first.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.prefix.as_str())
    }

    /// Answer one request.
    pub fn handle(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Response<Body> {
        let path = uri.path();
        let response = if method == Method::GET || method == Method::HEAD {
            self.dispatch(path, uri.query(), headers)
        } else {
            method_not_allowed()
        };
        debug!(method = %method, path, status = response.status().as_u16(), "Request handled");

        if method == Method::HEAD {
            strip_body(response)
        } else {
            response
        }
    }

    fn dispatch(&self, path: &str, query: Option<&str>, headers: &HeaderMap) -> Response<Body> {
        for route in &self.routes {
            if let Some(relative) = strip_route_prefix(path, &route.prefix) {
                let request = RouteRequest {
                    path,
                    relative,
                    query,
                    headers,
                };
                return route.handler.handle(&request);
            }
        }
        not_found(path, &self.not_found_route)
    }
}
