//! HTTP server lifecycle.
//!
//! Binds a listener, serves HTTP/1.1 and cleartext HTTP/2 through the
//! `hyper-util` auto builder, and dispatches every request to a
//! [`Router`].

use hyper::Request;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use std::convert::Infallible;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::error::{HttpError, HttpResult};
use crate::routes::Router;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8443;

/// Where to listen.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 = ephemeral).
    pub port: u16,
    /// Bind address.
    pub bind_address: IpAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind_address: IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }
}

/// A running file server.
pub struct FileServer {
    /// The actual bound address.
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    server_handle: Option<tokio::task::JoinHandle<()>>,
}

impl std::fmt::Debug for FileServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileServer")
            .field("addr", &self.addr)
            .field("running", &self.server_handle.is_some())
            .finish()
    }
}

impl FileServer {
    /// Bind and start serving in a background task.
    pub async fn start(router: Router, config: ServerConfig) -> HttpResult<Self> {
        let addr = SocketAddr::new(config.bind_address, config.port);
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| HttpError::Bind { addr, source })?;
        let actual_addr = listener
            .local_addr()
            .map_err(|source| HttpError::Bind { addr, source })?;

        info!(addr = %actual_addr, "Starting file server");

        let router = Arc::new(router);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            tokio::select! {
                () = run_server(listener, router) => {
                    debug!("Server loop ended");
                }
                _ = shutdown_rx => {
                    info!("Received shutdown signal");
                }
            }
        });

        Ok(Self {
            addr: actual_addr,
            shutdown_tx: Some(shutdown_tx),
            server_handle: Some(server_handle),
        })
    }

    /// Base URL of this server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            let _ = handle.await;
        }
        info!("File server stopped");
    }

    fn stop_sync(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.server_handle.take() {
            handle.abort();
        }
    }
}

impl Drop for FileServer {
    fn drop(&mut self) {
        self.stop_sync();
    }
}

async fn run_server(listener: TcpListener, router: Arc<Router>) {
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req: Request<Incoming>| {
                        let response = router.handle(req.method(), req.uri(), req.headers());
                        async move { Ok::<_, Infallible>(response) }
                    });

                    if let Err(e) = auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service)
                        .await
                    {
                        debug!(peer = %peer_addr, error = %e, "HTTP connection error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
