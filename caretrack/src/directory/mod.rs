//! Read access to the person collections.
//!
//! The directory backend exposes REST endpoints for accounts, staff
//! profiles, patient profiles, assignments, and service requests. The
//! [`DirectoryClient`] trait abstracts them so the refresh loop can run
//! against mocks.

mod client;
mod error;

use std::future::Future;

use crate::proximity::{Assignment, ServiceRequest};
use crate::roster::PersonRecord;

pub use client::RestDirectoryClient;
pub use error::DirectoryError;

/// Trait for fetching the person collections from the backend.
pub trait DirectoryClient: Send + Sync {
    /// Fetch the generic account records.
    fn fetch_accounts(
        &self,
    ) -> impl Future<Output = Result<Vec<PersonRecord>, DirectoryError>> + Send;

    /// Fetch the staff profile records.
    fn fetch_staff(&self)
        -> impl Future<Output = Result<Vec<PersonRecord>, DirectoryError>> + Send;

    /// Fetch the patient profile records.
    fn fetch_patients(
        &self,
    ) -> impl Future<Output = Result<Vec<PersonRecord>, DirectoryError>> + Send;

    /// Fetch the staff-to-service-request assignments.
    fn fetch_assignments(
        &self,
    ) -> impl Future<Output = Result<Vec<Assignment>, DirectoryError>> + Send;

    /// Fetch the service requests.
    fn fetch_service_requests(
        &self,
    ) -> impl Future<Output = Result<Vec<ServiceRequest>, DirectoryError>> + Send;
}
