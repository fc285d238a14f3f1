//! Error types for directory reads.

use thiserror::Error;

/// Errors that can occur when reading a person collection.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// HTTP request failed.
    #[error("request to {endpoint} failed: {message}")]
    Http { endpoint: String, message: String },

    /// Backend responded with a non-success status.
    #[error("request to {endpoint} rejected: HTTP {status}")]
    Status { endpoint: String, status: u16 },

    /// Response body could not be decoded.
    #[error("failed to decode {endpoint} response: {message}")]
    Decode { endpoint: String, message: String },
}
