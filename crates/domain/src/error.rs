//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`DehumError`]
//! when crossing a port boundary.

/// Boxed error from an adapter, kept opaque at the domain level.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error shared by ports and services.
#[derive(Debug, thiserror::Error)]
pub enum DehumError {
    /// A bus payload could not be encoded or decoded.
    #[error("invalid bus payload")]
    Payload(#[from] PayloadError),

    /// Writing or reading an actuator pin failed.
    #[error("actuator I/O error")]
    Actuator(#[source] BoxError),

    /// The bus transport rejected a publish or subscribe.
    #[error("bus transport error")]
    Bus(#[source] BoxError),

    /// A channel between tasks was closed before the request completed.
    #[error("channel closed")]
    Closed,
}

/// Why a bus payload could not be understood.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// The payload is not valid JSON of the expected shape.
    #[error("malformed JSON payload")]
    Json(#[from] serde_json::Error),
}
