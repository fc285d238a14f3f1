//! CareTrack - location resolution and live tracking for a home-care platform.
//!
//! This library resolves geographic positions for the people in a care
//! directory (generic accounts, staff profiles, patient profiles) whose
//! location data arrives in inconsistent record shapes, enriches address-only
//! records through a cached, deduplicated geocoding client, tracks the
//! current device's live position with throttled upstream synchronization,
//! and computes staff-patient proximity.
//!
//! # Components
//!
//! - [`position`] - validated positions with provenance tags, and the
//!   ordered-candidate coordinate resolver for loosely-shaped records
//! - [`geocode`] - address-to-position cache with in-flight deduplication
//!   against a forward-geocoding provider
//! - [`roster`] - joins accounts, staff, and patient collections into one
//!   resolved row per person
//! - [`tracker`] - live device position watch with auth-gated, throttled
//!   upstream sync
//! - [`proximity`] - great-circle distance and the assigned-patient
//!   distance report
//! - [`directory`] - REST client for the backing person collections
//! - [`service`] - periodic roster refresh daemon publishing resolved rows
//!
//! # Example
//!
//! ```ignore
//! use caretrack::directory::RestDirectoryClient;
//! use caretrack::geocode::{GeocodeCache, NominatimClient};
//! use caretrack::service::RosterRefresher;
//!
//! let directory = RestDirectoryClient::new("https://api.example.com".into());
//! let geocode = GeocodeCache::new(NominatimClient::new());
//! let handle = RosterRefresher::new(directory, geocode).start();
//!
//! let mut rows = handle.rows();
//! rows.changed().await?;
//! for row in rows.borrow().iter() {
//!     println!("{} -> {:?}, {:?}", row.name, row.latitude, row.longitude);
//! }
//! ```

pub mod directory;
pub mod geocode;
pub mod logging;
pub mod position;
pub mod proximity;
pub mod roster;
pub mod service;
pub mod time;
pub mod tracker;

/// Version of the CareTrack library.
///
/// Synchronized across all components in the workspace; defined in
/// `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
