//! Geocoding client trait and Nominatim implementation.
//!
//! The [`GeocodeClient`] trait abstracts over forward-geocoding providers so
//! the cache can be exercised against mocks. The [`NominatimClient`]
//! implementation queries the OpenStreetMap Nominatim search endpoint via
//! `reqwest`.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::error::GeocodeError;

/// Default Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Default HTTP timeout for geocoding requests.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// One candidate from a forward-geocoding response.
///
/// Providers disagree on whether coordinates arrive as strings or numbers
/// (Nominatim sends strings), so the raw values are kept and validated by
/// the cache with the same parser used for record fields.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeCandidate {
    pub lat: Value,
    pub lon: Value,
}

/// Trait for resolving a free-text address to coordinate candidates.
///
/// Implementations return zero or more candidates; only the first is used.
pub trait GeocodeClient: Send + Sync {
    /// Look up an address with the provider.
    fn geocode(
        &self,
        address: &str,
    ) -> impl Future<Output = Result<Vec<GeocodeCandidate>, GeocodeError>> + Send;
}

/// Nominatim client using direct HTTP requests.
///
/// Uses a reusable `reqwest::Client` with connection pooling, a request
/// timeout, and an identifying User-Agent (required by the Nominatim usage
/// policy).
pub struct NominatimClient {
    http: reqwest::Client,
    search_url: String,
}

impl NominatimClient {
    /// Create a client against the public Nominatim endpoint.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_NOMINATIM_URL.to_string())
    }

    /// Create a client against a custom search endpoint.
    pub fn with_url(search_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(concat!("caretrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { http, search_url }
    }

    /// The configured search endpoint.
    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

impl Default for NominatimClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GeocodeClient for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
        let response = self
            .http
            .get(&self.search_url)
            .query(&[("format", "json"), ("q", address)])
            .send()
            .await
            .map_err(|e| GeocodeError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GeocodeError::Http(e.to_string()))?;

        let candidates: Vec<GeocodeCandidate> =
            serde_json::from_slice(&bytes).map_err(|e| GeocodeError::Json(e.to_string()))?;

        tracing::debug!(
            candidates = candidates.len(),
            address = %address,
            "Geocoding response received"
        );

        Ok(candidates)
    }
}
