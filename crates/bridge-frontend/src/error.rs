//! Frontend error types.

use std::net::SocketAddr;

use thiserror::Error;

/// Errors from the client-facing server.
#[derive(Debug, Error)]
pub enum FrontendError {
    /// The listening socket could not be bound.
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Socket-level I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
