//! Error types for the HTTP layer.
//!
//! Request handling itself never fails: every outcome is an HTTP response.
//! These errors cover setting the server up.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from building routes or starting the server.
#[derive(Debug, Error)]
pub enum HttpError {
    /// The listening socket could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A route's prefix or directory is unusable.
    #[error("Invalid route {prefix}: {reason}")]
    InvalidRoute {
        /// Route prefix as configured.
        prefix: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl HttpError {
    /// Shorthand for [`HttpError::InvalidRoute`].
    pub fn invalid_route(prefix: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRoute {
            prefix: prefix.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for server setup.
pub type HttpResult<T> = Result<T, HttpError>;
