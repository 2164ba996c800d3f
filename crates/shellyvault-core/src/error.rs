//! Unified error types for Shellyvault Core.

use thiserror::Error;

/// Main error type for all Shellyvault operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum VaultError {
    /// Network request failed (connect error, DNS, timeout).
    #[error("Request to {endpoint} ({method}) failed: {source}")]
    Network {
        /// Device endpoint the request was sent to.
        endpoint: String,
        /// RPC method that was being called.
        method: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Device answered with a non-success HTTP status.
    #[error("Request to {endpoint} ({method}) failed: HTTP {status}")]
    Status {
        /// Device endpoint the request was sent to.
        endpoint: String,
        /// RPC method that was being called.
        method: String,
        /// HTTP status code returned by the device.
        status: u16,
    },

    /// File system I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Endpoint URL could not be parsed.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Another sweep or restore is already in flight on this coordinator.
    #[error("Operation rejected: {0} already in progress")]
    Busy(&'static str),
}

/// Result type alias for Shellyvault operations.
pub type VaultResult<T> = Result<T, VaultError>;
