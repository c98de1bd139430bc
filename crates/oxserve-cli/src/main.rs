#![deny(unsafe_code)]

// Use mimalloc for reduced allocation latency (enabled by default).
// Disable with `--no-default-features` if debugging allocator issues.
#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod config;
mod exit_code;
mod progress;

use std::io::{self, IsTerminal};
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use oxserve_cache::{CacheError, CacheProgress, FsCache};
use oxserve_http::{FileServer, HttpError, RouteContext, Router};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::{Config, ConfigError, DEFAULT_CONFIG_PATH};
use crate::progress::StartupProgress;

/// Cached static app server
#[derive(Parser)]
#[command(name = "oxserve")]
#[command(author, version)]
#[command(after_help = "EXAMPLES:
    # Serve ./apps with settings from ./oxserve.toml
    oxserve

    # Serve another directory on port 8080 without watching for changes
    oxserve --root ./site --port 8080 --no-watch

    # Validate configuration and build the cache, then exit
    oxserve --check -v
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    /// Configuration file
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Directory to serve (overrides cache.root)
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Listening port (overrides network.port)
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address (overrides network.bind)
    #[arg(long, value_name = "ADDR")]
    bind: Option<IpAddr>,

    /// Serve files exactly as stored on disk
    #[arg(long)]
    no_optimize: bool,

    /// Do not follow filesystem changes after startup
    #[arg(long)]
    no_watch: bool,

    /// Build the cache and routes, print a summary, and exit
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.cache.root.clone_from(root);
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(bind) = self.bind {
            config.network.bind = bind;
        }
        if self.no_optimize {
            config.cache.optimize_files = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up tracing based on verbosity (skip if quiet)
    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    match run(&cli) {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e:#}");
            }
            ExitCode::from(categorize_error(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(serve(cli))
}

async fn serve(cli: &Cli) -> Result<()> {
    let mut config = Config::load(&cli.config)?;
    cli.apply_overrides(&mut config);

    let progress = Arc::new(CacheProgress::new());
    let reporter = StartupProgress::start(
        Arc::clone(&progress),
        !cli.quiet && io::stderr().is_terminal(),
    );
    let opened =
        FsCache::open_with_progress(config.cache_options(), config.pipeline(), progress).await;
    let mut cache = match opened {
        Ok(cache) => {
            reporter.finish(&cache.summary());
            cache
        }
        Err(e) => {
            reporter.abandon();
            return Err(e).with_context(|| {
                format!("Failed to build cache for {}", config.cache.root.display())
            });
        }
    };

    let ctx = RouteContext::new(
        cache.store(),
        cache.root().to_path_buf(),
        config.site_config(),
        config.http_config(),
    );
    let router = Router::from_registry(&ctx).context("Failed to register routes")?;

    if cli.check {
        let summary = cache.summary();
        println!("root: {}", cache.root().display());
        println!(
            "cached: {} files, {} folders, {} failed",
            summary.files, summary.folders, summary.failed
        );
        println!(
            "routes: {}",
            router.prefixes().collect::<Vec<_>>().join(", ")
        );
        cache.close().await.context("Failed to close cache")?;
        return Ok(());
    }

    if !cli.no_watch {
        cache.watch().context("Failed to start file watcher")?;
    }

    let server = FileServer::start(router, config.server_config())
        .await
        .context("Failed to start server")?;
    info!(url = %server.url(), root = %cache.root().display(), "Serving");
    if !cli.quiet {
        eprintln!("Serving {} on {}", cache.root().display(), server.url());
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");

    server.stop().await;
    cache.close().await.context("Failed to close cache")?;
    Ok(())
}

/// Default filter directives per `-v` count.
///
/// Cache and server crates get the requested level; dependencies stay one
/// step quieter. Per-path build, compression and stale watch events only
/// show at `-vvv`, and hyper/h2 connection chatter never goes below `info`.
fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "warn,oxserve=info,oxserve_cache=info,oxserve_http=info",
        2 => {
            "info,oxserve=debug,oxserve_cache=debug,oxserve_http=debug,\
             oxserve_cache::builder=info"
        }
        _ => "debug,oxserve=trace,oxserve_cache=trace,oxserve_http=trace,hyper=info,h2=info",
    }
}

/// Set up tracing to stderr. `RUST_LOG` overrides the `-v` defaults.
fn setup_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .with_filter(filter);
    let registry = tracing_subscriber::registry().with(fmt_layer);

    #[cfg(feature = "tokio-console")]
    {
        let (console, addr) = console_layer();
        let enabled = console.is_some();
        registry.with(console).init();
        if enabled {
            info!("tokio-console enabled, connect with: tokio-console http://{addr}");
        } else {
            tracing::warn!(%addr, "tokio-console port already in use, running without console instrumentation");
        }
    }

    #[cfg(not(feature = "tokio-console"))]
    registry.init();
}

/// Console layer on `TOKIO_CONSOLE_PORT` (default 6669), if the port is free.
#[cfg(feature = "tokio-console")]
fn console_layer() -> (Option<console_subscriber::ConsoleLayer>, std::net::SocketAddr) {
    let port = std::env::var("TOKIO_CONSOLE_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(6669);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    if std::net::TcpListener::bind(addr).is_err() {
        return (None, addr);
    }
    let layer = console_subscriber::ConsoleLayer::builder()
        .server_addr(addr)
        .spawn();
    (Some(layer), addr)
}

/// Categorize an error into an exit code using typed error downcasting
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<ConfigError>().is_some() {
            return exit_code::CONFIG_ERROR;
        }

        if let Some(http_err) = cause.downcast_ref::<HttpError>() {
            return match http_err {
                HttpError::Bind { .. } => exit_code::BIND_FAILED,
                HttpError::InvalidRoute { .. } => exit_code::CONFIG_ERROR,
            };
        }

        if let Some(CacheError::NotADirectory(_)) = cause.downcast_ref::<CacheError>() {
            return exit_code::CONFIG_ERROR;
        }
    }
    exit_code::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, SocketAddr};

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_directives_parse() {
        for verbose in 0..=4 {
            let directives = default_directives(verbose);
            assert!(
                EnvFilter::try_new(directives).is_ok(),
                "-v x{verbose}: {directives}"
            );
        }
        assert_eq!(default_directives(0), "warn");
        assert!(default_directives(1).contains("oxserve_http=info"));
        assert!(default_directives(3).contains("oxserve_cache=trace"));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let cli = Cli::parse_from([
            "oxserve",
            "--root",
            "/srv/site",
            "--port",
            "9000",
            "--bind",
            "127.0.0.1",
            "--no-optimize",
        ]);
        let mut config = Config::parse("[network]\nport = 1\n").unwrap();
        cli.apply_overrides(&mut config);
        assert_eq!(config.cache.root, PathBuf::from("/srv/site"));
        assert_eq!(config.network.port, 9000);
        assert_eq!(config.network.bind, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(!config.cache.optimize_files);
    }

    #[test]
    fn test_categorize_errors() {
        let bind = anyhow::Error::new(HttpError::Bind {
            addr: SocketAddr::from(([127, 0, 0, 1], 80)),
            source: io::Error::from(io::ErrorKind::AddrInUse),
        })
        .context("Failed to start server");
        assert_eq!(categorize_error(&bind), exit_code::BIND_FAILED);

        let route = anyhow::Error::new(HttpError::invalid_route("/x", "missing"));
        assert_eq!(categorize_error(&route), exit_code::CONFIG_ERROR);

        let root = anyhow::Error::new(CacheError::NotADirectory(PathBuf::from("/nope")));
        assert_eq!(categorize_error(&root), exit_code::CONFIG_ERROR);

        let other = anyhow::anyhow!("boom");
        assert_eq!(categorize_error(&other), exit_code::GENERAL_ERROR);
    }
}
