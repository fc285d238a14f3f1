//! Live device position tracking with throttled upstream sync.
//!
//! The [`LiveTracker`] owns a continuous position subscription, keeps the
//! latest fix in memory, and pushes it to the backend at a bounded rate
//! while the caller is authenticated.
//!
//! # State machine
//!
//! - `Idle -> Watching` on [`LiveTracker::start`], guarded by the position
//!   source accepting the subscription; an unavailable source lands in
//!   `Error` with a capability-missing message instead.
//! - While `Watching`, every fix updates the in-memory position
//!   unconditionally and pushes upstream only when auto-sync is on, the
//!   auth signal is true, and the update interval has elapsed since the
//!   last push attempt.
//! - `Watching -> Idle` on [`LiveTracker::stop`] and automatically when the
//!   auth signal turns false; both release the subscription synchronously.
//! - A position error from the source moves to `Error`, records the
//!   message, and clears the tracking flag; no automatic retry.
//!
//! # Components
//!
//! - [`state`] - `TrackerPhase` and the `TrackerStatus` snapshot
//! - [`source`] - `DevicePositionSource` trait and the watch handle
//! - [`gps`] - UDP NMEA listener implementing the source trait
//! - [`uplink`] - `LocationUplink` trait and the HTTP implementation

mod error;
mod gps;
mod source;
mod state;
mod tracker;
mod uplink;

pub use error::TrackerError;
pub use gps::{GpsFeedConfig, UdpGpsSource};
pub use source::{
    DeviceFix, DevicePositionSource, PositionEvent, PositionWatch, UnsupportedPositionSource,
    WatchOptions,
};
pub use state::{TrackerPhase, TrackerStatus};
pub use tracker::{current_fix, LiveTracker, LiveTrackerConfig};
pub use uplink::{HttpLocationUplink, LocationUpdate, LocationUplink, UplinkError};
