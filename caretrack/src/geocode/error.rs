//! Error types for geocode lookups.

use thiserror::Error;

/// Errors that can occur when resolving an address with the provider.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("geocoding request failed: {0}")]
    Http(String),

    /// Provider responded with a non-success status.
    #[error("geocoding request rejected: HTTP {0}")]
    Status(u16),

    /// Response body could not be parsed.
    #[error("failed to parse geocoding response: {0}")]
    Json(String),

    /// Provider returned no candidate with a usable coordinate pair.
    #[error("no usable candidate returned for address")]
    NoUsableCandidate,
}
