//! Error types for regalo-core

use std::time::Duration;

use thiserror::Error;

/// Result type alias using regalo-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in regalo-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote API returned a non-success status
    #[error("Reservation API error: {0}")]
    Api(String),

    /// Remote call did not finish in time
    #[error("Remote call timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid site or backend configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Bulk load failed, so nothing is known about which gifts are taken
    #[error("Reservation state unknown: {0}")]
    ReservationStateUnknown(String),

    /// Operation needs a remote backend but none is configured
    #[error("No reservation backend configured (local-only mode)")]
    LocalOnly,

    /// Change feed ended
    #[error("Change feed closed")]
    SubscriptionClosed,
}
