//! Core position types.

use serde::Serialize;

/// Where a resolved position came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PositionSource {
    /// Read directly off the record that was being resolved.
    Direct,
    /// Taken from a linked staff profile.
    Staff,
    /// Taken from a linked patient profile.
    Patient,
    /// Produced by a geocode lookup and served from the cache.
    GeocodedCache,
    /// Reported by the device's live position feed.
    Device,
}

impl std::fmt::Display for PositionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Staff => write!(f, "staff"),
            Self::Patient => write!(f, "patient"),
            Self::GeocodedCache => write!(f, "geocoded-cache"),
            Self::Device => write!(f, "device"),
        }
    }
}

/// A validated latitude/longitude pair with provenance.
///
/// Construction goes through [`ResolvedPosition::new`], which rejects
/// non-finite components. A position therefore never carries the (0, 0)
/// that a null or empty field would coerce to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedPosition {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Provenance of this position.
    pub source: PositionSource,
    /// Reported accuracy in meters, when the source provides one.
    pub accuracy: Option<f64>,
}

impl ResolvedPosition {
    /// Create a position, rejecting non-finite components.
    pub fn new(latitude: f64, longitude: f64, source: PositionSource) -> Option<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        Some(Self {
            latitude,
            longitude,
            source,
            accuracy: None,
        })
    }

    /// Attach a reported accuracy in meters.
    pub fn with_accuracy(mut self, meters: f64) -> Self {
        if meters.is_finite() {
            self.accuracy = Some(meters);
        }
        self
    }
}
