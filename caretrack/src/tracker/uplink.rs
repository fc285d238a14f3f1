//! Upstream location sync.
//!
//! The [`LocationUplink`] trait abstracts the backend endpoint that stores
//! the authenticated principal's position. Pushes are best-effort telemetry:
//! failures are logged by the caller and never retried automatically.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Default HTTP timeout for location pushes.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from pushing a location upstream.
#[derive(Debug, Error)]
pub enum UplinkError {
    /// HTTP request failed.
    #[error("location update failed: {0}")]
    Http(String),

    /// Backend rejected the update.
    #[error("location update rejected: HTTP {0}")]
    Status(u16),
}

/// Payload for one location push.
#[derive(Debug, Clone, Serialize)]
pub struct LocationUpdate {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationUpdate {
    /// Create an update stamped with the current wall-clock time.
    pub fn new(latitude: f64, longitude: f64, accuracy: Option<f64>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp: Utc::now(),
        }
    }
}

/// Trait for pushing the device position to the backend.
pub trait LocationUplink: Send + Sync {
    /// Push one update as the authenticated principal.
    fn push_location(
        &self,
        update: LocationUpdate,
    ) -> impl Future<Output = Result<(), UplinkError>> + Send;
}

/// HTTP implementation posting to the location-update endpoint.
pub struct HttpLocationUplink {
    http: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpLocationUplink {
    /// Create an uplink posting to `endpoint` (e.g.
    /// `https://api.example.com/location/update`).
    pub fn new(endpoint: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            endpoint,
            bearer_token: None,
        }
    }

    /// Attach a bearer token identifying the principal.
    pub fn with_bearer_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl LocationUplink for HttpLocationUplink {
    async fn push_location(&self, update: LocationUpdate) -> Result<(), UplinkError> {
        let mut request = self.http.post(&self.endpoint).json(&update);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UplinkError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UplinkError::Status(status.as_u16()));
        }

        Ok(())
    }
}
