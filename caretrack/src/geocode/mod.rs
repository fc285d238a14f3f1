//! Forward geocoding with caching and in-flight deduplication.
//!
//! Address-only records are enriched through an external geocoding provider.
//! Lookups are expensive and rate-limited upstream, so results are cached for
//! the lifetime of the [`GeocodeCache`] and concurrent requests for the same
//! normalized address collapse to a single outstanding lookup.
//!
//! # Design
//!
//! The cache is an explicit object with caller-owned construction and
//! disposal - no module-level state leaks across views or test runs. Callers
//! never block: a miss kicks off a background lookup and returns
//! [`GeocodeOutcome::Pending`] immediately. Completion is observable either
//! on the next poll or through the settlement broadcast
//! ([`GeocodeCache::subscribe_settlements`]).

mod cache;
mod client;
mod error;

pub use cache::{GeocodeCache, GeocodeOutcome};
pub use client::{GeocodeCandidate, GeocodeClient, NominatimClient, DEFAULT_NOMINATIM_URL};
pub use error::GeocodeError;
