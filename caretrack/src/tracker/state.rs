//! Tracker state types.

/// Lifecycle phase of the live tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerPhase {
    /// Not watching; no subscription held.
    #[default]
    Idle,
    /// Subscription active, fixes flowing.
    Watching,
    /// Watching ended on an error; call start again to retry.
    Error,
}

impl std::fmt::Display for TrackerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Watching => write!(f, "Watching"),
            Self::Error => write!(f, "Error"),
        }
    }
}

/// Snapshot of the tracker for consumers.
#[derive(Debug, Clone, Default)]
pub struct TrackerStatus {
    /// Latest device latitude, if any fix was obtained.
    pub latitude: Option<f64>,
    /// Latest device longitude, if any fix was obtained.
    pub longitude: Option<f64>,
    /// Reported accuracy of the latest fix in meters.
    pub accuracy: Option<f64>,
    /// Message from the most recent device error, if the tracker is in the
    /// error phase.
    pub error: Option<String>,
    /// Whether a subscription is currently active.
    pub is_tracking: bool,
}
