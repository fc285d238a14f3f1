//! REST implementation of the directory client.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::proximity::{Assignment, ServiceRequest};
use crate::roster::PersonRecord;

use super::error::DirectoryError;
use super::DirectoryClient;

/// Default HTTP timeout for directory reads.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Default page limit; the backends cap list endpoints, so ask for enough.
const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Directory client using direct HTTP requests.
///
/// Uses a reusable `reqwest::Client` with connection pooling and a request
/// timeout. A bearer token can be attached for backends that gate the
/// collections.
pub struct RestDirectoryClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
    page_limit: usize,
}

impl RestDirectoryClient {
    /// Create a client against `base_url` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            base_url,
            bearer_token: None,
            page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    /// Attach a bearer token.
    pub fn with_bearer_token(mut self, token: String) -> Self {
        self.bearer_token = Some(token);
        self
    }

    /// Override the page limit sent to list endpoints.
    pub fn with_page_limit(mut self, limit: usize) -> Self {
        self.page_limit = limit;
        self
    }

    /// The configured base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, DirectoryError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .get(&url)
            .query(&[("limit", self.page_limit.to_string())]);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| DirectoryError::Http {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| DirectoryError::Http {
            endpoint: path.to_string(),
            message: e.to_string(),
        })?;

        serde_json::from_slice(&bytes).map_err(|e| DirectoryError::Decode {
            endpoint: path.to_string(),
            message: e.to_string(),
        })
    }
}

impl DirectoryClient for RestDirectoryClient {
    async fn fetch_accounts(&self) -> Result<Vec<PersonRecord>, DirectoryError> {
        self.get_list("/users").await
    }

    async fn fetch_staff(&self) -> Result<Vec<PersonRecord>, DirectoryError> {
        self.get_list("/staff").await
    }

    async fn fetch_patients(&self) -> Result<Vec<PersonRecord>, DirectoryError> {
        self.get_list("/patients").await
    }

    async fn fetch_assignments(&self) -> Result<Vec<Assignment>, DirectoryError> {
        self.get_list("/assignments").await
    }

    async fn fetch_service_requests(&self) -> Result<Vec<ServiceRequest>, DirectoryError> {
        self.get_list("/service_requests").await
    }
}
