//! Device position source abstraction.
//!
//! A source hands out a [`PositionWatch`]: an event channel paired with a
//! cancellation token. Cancelling the token is the synchronous release the
//! tracker relies on - once cancelled, no further events are delivered, so
//! a leaked callback can never trigger an upstream push after logout.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::TrackerError;

/// Options for a position watch request.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Request the highest precision the source can provide. A hint;
    /// sources that cannot vary precision report what the device sends.
    pub high_accuracy: bool,

    /// Accept a cached fix up to this old as the first event.
    pub max_fix_age: Duration,

    /// Bounded wait for the first fix; exceeding it is an error, not a hang.
    pub first_fix_timeout: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            max_fix_age: Duration::from_secs(10),
            first_fix_timeout: Duration::from_secs(20),
        }
    }
}

/// One position fix from the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Estimated accuracy in meters, when the device reports one.
    pub accuracy: Option<f64>,
}

/// Event delivered by a position watch.
#[derive(Debug, Clone)]
pub enum PositionEvent {
    /// A new fix.
    Fix(DeviceFix),
    /// The device reported an error; the watch ends after this.
    Error(String),
}

/// Handle for an active position subscription.
pub struct PositionWatch {
    events: mpsc::Receiver<PositionEvent>,
    cancel: CancellationToken,
}

impl PositionWatch {
    /// Create a watch handle. Source implementations hold the sender side
    /// of `events` and observe `cancel` to stop emitting.
    pub fn new(events: mpsc::Receiver<PositionEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    pub(crate) fn into_parts(self) -> (mpsc::Receiver<PositionEvent>, CancellationToken) {
        (self.events, self.cancel)
    }
}

/// Trait for platforms that can deliver continuous position updates.
pub trait DevicePositionSource: Send + Sync {
    /// Begin watching the device position.
    ///
    /// Returns an error when the capability is unavailable (the caller
    /// surfaces it instead of waiting forever).
    fn watch(&self, options: &WatchOptions) -> Result<PositionWatch, TrackerError>;
}

/// Source for platforms with no positioning capability.
///
/// Always refuses the watch, so the tracker lands in its error phase with a
/// capability-missing message.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedPositionSource;

impl DevicePositionSource for UnsupportedPositionSource {
    fn watch(&self, _options: &WatchOptions) -> Result<PositionWatch, TrackerError> {
        Err(TrackerError::Unavailable(
            "no position source on this platform".to_string(),
        ))
    }
}
