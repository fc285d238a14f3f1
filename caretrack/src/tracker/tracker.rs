//! The live tracker state machine.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::time::{Clock, SystemClock};

use super::error::TrackerError;
use super::source::{DeviceFix, DevicePositionSource, PositionEvent, WatchOptions};
use super::state::{TrackerPhase, TrackerStatus};
use super::uplink::{LocationUpdate, LocationUplink};

/// Configuration for the live tracker.
#[derive(Debug, Clone)]
pub struct LiveTrackerConfig {
    /// Minimum interval between automatic upstream pushes.
    pub update_interval: Duration,

    /// Push fixes upstream automatically while authenticated.
    pub auto_sync: bool,

    /// Options forwarded to the position source.
    pub watch: WatchOptions,
}

impl Default for LiveTrackerConfig {
    fn default() -> Self {
        Self {
            update_interval: Duration::from_millis(30_000),
            auto_sync: true,
            watch: WatchOptions::default(),
        }
    }
}

#[derive(Default)]
struct TrackerShared {
    phase: TrackerPhase,
    latitude: Option<f64>,
    longitude: Option<f64>,
    accuracy: Option<f64>,
    last_push: Option<Instant>,
    last_error: Option<String>,
    watch_cancel: Option<CancellationToken>,
}

impl TrackerShared {
    /// Release the subscription and clear the tracking state.
    fn release(&mut self) {
        if let Some(cancel) = self.watch_cancel.take() {
            cancel.cancel();
        }
        self.latitude = None;
        self.longitude = None;
        self.accuracy = None;
        self.last_push = None;
    }
}

/// Live device position tracker with throttled upstream sync.
///
/// See the [module docs](super) for the state machine. `start` and the
/// position sources spawn tasks, so the tracker must be used from within a
/// Tokio runtime.
pub struct LiveTracker<S, U> {
    source: S,
    uplink: Arc<U>,
    auth: watch::Receiver<bool>,
    clock: Arc<dyn Clock>,
    config: LiveTrackerConfig,
    shared: Arc<Mutex<TrackerShared>>,
}

impl<S, U> LiveTracker<S, U>
where
    S: DevicePositionSource,
    U: LocationUplink + 'static,
{
    /// Create a tracker with the default configuration.
    ///
    /// `auth` is the authentication context's boolean signal: pushes only
    /// happen while it is true, and it turning false stops the watch.
    pub fn new(source: S, uplink: U, auth: watch::Receiver<bool>) -> Self {
        Self::with_config(source, uplink, auth, LiveTrackerConfig::default())
    }

    /// Create a tracker with a custom configuration.
    pub fn with_config(
        source: S,
        uplink: U,
        auth: watch::Receiver<bool>,
        config: LiveTrackerConfig,
    ) -> Self {
        Self {
            source,
            uplink: Arc::new(uplink),
            auth,
            clock: Arc::new(SystemClock),
            config,
            shared: Arc::new(Mutex::new(TrackerShared::default())),
        }
    }

    /// Replace the throttle clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Begin watching the device position.
    ///
    /// Already watching is a no-op. A refused watch records the error and
    /// leaves the tracker in its error phase.
    pub fn start(&self) -> Result<(), TrackerError> {
        let mut shared = self.shared.lock().unwrap();
        if shared.phase == TrackerPhase::Watching {
            return Ok(());
        }

        match self.source.watch(&self.config.watch) {
            Ok(watch) => {
                let (events, cancel) = watch.into_parts();
                shared.release();
                shared.phase = TrackerPhase::Watching;
                shared.last_error = None;
                shared.watch_cancel = Some(cancel.clone());
                drop(shared);

                info!("Live position tracking started");
                let task = WatchTask {
                    shared: Arc::clone(&self.shared),
                    uplink: Arc::clone(&self.uplink),
                    clock: Arc::clone(&self.clock),
                    config: self.config.clone(),
                };
                tokio::spawn(task.run(events, cancel, self.auth.clone()));
                Ok(())
            }
            Err(error) => {
                shared.release();
                shared.phase = TrackerPhase::Error;
                shared.last_error = Some(error.to_string());
                warn!(error = %error, "Live position tracking unavailable");
                Err(error)
            }
        }
    }

    /// Stop watching and reset the tracking state.
    ///
    /// The subscription is released synchronously: no event delivered after
    /// this call can reach the tracker.
    pub fn stop(&self) {
        let mut shared = self.shared.lock().unwrap();
        shared.release();
        shared.phase = TrackerPhase::Idle;
        shared.last_error = None;
        debug!("Live position tracking stopped");
    }

    /// Push the most recent fix immediately, bypassing the throttle.
    ///
    /// No-op when no fix was ever obtained or the caller is not
    /// authenticated. Failures are logged, never surfaced.
    pub async fn update_now(&self) {
        let fix = {
            let shared = self.shared.lock().unwrap();
            match (shared.latitude, shared.longitude) {
                (Some(latitude), Some(longitude)) => DeviceFix {
                    latitude,
                    longitude,
                    accuracy: shared.accuracy,
                },
                _ => return,
            }
        };

        if !*self.auth.borrow() {
            debug!("Skipping manual location push while unauthenticated");
            return;
        }

        push_fix(self.uplink.as_ref(), fix).await;
    }

    /// Current tracker snapshot.
    pub fn status(&self) -> TrackerStatus {
        let shared = self.shared.lock().unwrap();
        TrackerStatus {
            latitude: shared.latitude,
            longitude: shared.longitude,
            accuracy: shared.accuracy,
            error: shared.last_error.clone(),
            is_tracking: shared.phase == TrackerPhase::Watching,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> TrackerPhase {
        self.shared.lock().unwrap().phase
    }

    /// Whether a subscription is currently active.
    pub fn is_tracking(&self) -> bool {
        self.phase() == TrackerPhase::Watching
    }
}

/// Per-watch task consuming position events.
struct WatchTask<U> {
    shared: Arc<Mutex<TrackerShared>>,
    uplink: Arc<U>,
    clock: Arc<dyn Clock>,
    config: LiveTrackerConfig,
}

impl<U: LocationUplink> WatchTask<U> {
    async fn run(
        self,
        mut events: mpsc::Receiver<PositionEvent>,
        cancel: CancellationToken,
        auth: watch::Receiver<bool>,
    ) {
        let first_fix_deadline = tokio::time::sleep(self.config.watch.first_fix_timeout);
        tokio::pin!(first_fix_deadline);
        let mut have_fix = false;

        // Second receiver for change notifications; `auth` itself stays
        // readable from the fix handler.
        let mut auth_changes = auth.clone();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = &mut first_fix_deadline, if !have_fix => {
                    let error = TrackerError::FixTimeout(self.config.watch.first_fix_timeout);
                    self.fail(error.to_string(), &cancel);
                    break;
                }
                changed = auth_changes.changed() => {
                    if changed.is_err() || !*auth.borrow() {
                        info!("Authentication lost, stopping live tracking");
                        self.go_idle(&cancel);
                        break;
                    }
                }
                event = events.recv() => match event {
                    Some(PositionEvent::Fix(fix)) => {
                        have_fix = true;
                        let authenticated = *auth.borrow();
                        self.on_fix(fix, authenticated).await;
                    }
                    Some(PositionEvent::Error(message)) => {
                        self.fail(message, &cancel);
                        break;
                    }
                    None => {
                        debug!("Position feed ended, going idle");
                        self.go_idle(&cancel);
                        break;
                    }
                }
            }
        }
    }

    /// Apply one fix: update the in-memory position unconditionally, then
    /// push upstream when auto-sync, authentication, and the throttle allow.
    async fn on_fix(&self, fix: DeviceFix, authenticated: bool) {
        let should_push = {
            let mut shared = self.shared.lock().unwrap();
            shared.latitude = Some(fix.latitude);
            shared.longitude = Some(fix.longitude);
            shared.accuracy = fix.accuracy;

            let now = self.clock.now();
            if self.config.auto_sync
                && authenticated
                && throttle_elapsed(now, shared.last_push, self.config.update_interval)
            {
                // Anchor the throttle on the attempt, not the outcome, so a
                // failing backend sees one attempt per interval.
                shared.last_push = Some(now);
                true
            } else {
                false
            }
        };

        if should_push {
            push_fix(self.uplink.as_ref(), fix).await;
        }
    }

    fn fail(&self, message: String, cancel: &CancellationToken) {
        cancel.cancel();
        let mut shared = self.shared.lock().unwrap();
        shared.watch_cancel = None;
        shared.phase = TrackerPhase::Error;
        shared.last_error = Some(message.clone());
        warn!(error = %message, "Device position error");
    }

    fn go_idle(&self, cancel: &CancellationToken) {
        cancel.cancel();
        let mut shared = self.shared.lock().unwrap();
        shared.release();
        shared.phase = TrackerPhase::Idle;
        shared.last_error = None;
    }
}

/// Push one fix upstream; failures are logged only.
async fn push_fix<U: LocationUplink>(uplink: &U, fix: DeviceFix) {
    let update = LocationUpdate::new(fix.latitude, fix.longitude, fix.accuracy);
    match uplink.push_location(update).await {
        Ok(()) => debug!(
            lat = format!("{:.4}", fix.latitude),
            lon = format!("{:.4}", fix.longitude),
            "Location pushed upstream"
        ),
        Err(error) => warn!(error = %error, "Failed to push location upstream"),
    }
}

/// Throttle predicate: has `interval` elapsed since the last push attempt?
fn throttle_elapsed(now: Instant, last_push: Option<Instant>, interval: Duration) -> bool {
    match last_push {
        None => true,
        Some(at) => now.saturating_duration_since(at) >= interval,
    }
}

/// Resolve a single fix from a source, bounded by the watch's first-fix
/// timeout.
///
/// For callers that need the position once rather than a continuous watch.
/// The subscription is released before returning.
pub async fn current_fix<S: DevicePositionSource>(
    source: &S,
    options: &WatchOptions,
) -> Result<DeviceFix, TrackerError> {
    let watch = source.watch(options)?;
    let (mut events, cancel) = watch.into_parts();

    let outcome = tokio::time::timeout(options.first_fix_timeout, async {
        loop {
            match events.recv().await {
                Some(PositionEvent::Fix(fix)) => return Ok(fix),
                Some(PositionEvent::Error(message)) => return Err(TrackerError::Position(message)),
                None => return Err(TrackerError::FeedClosed),
            }
        }
    })
    .await;

    cancel.cancel();
    match outcome {
        Ok(result) => result,
        Err(_) => Err(TrackerError::FixTimeout(options.first_fix_timeout)),
    }
}
