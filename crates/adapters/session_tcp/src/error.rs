//! Session adapter error types.

use std::net::SocketAddr;

use dehum_domain::error::DehumError;

/// Errors raised by the session server.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The listening socket could not be set up.
    #[error("failed to listen on {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to a connection failed.
    #[error("session I/O error")]
    Io(#[from] std::io::Error),

    /// The gateway dispatcher could not answer.
    #[error("gateway unavailable")]
    Gateway(#[from] DehumError),
}
