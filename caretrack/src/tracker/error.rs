//! Error types for device position tracking.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when watching the device position.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The platform offers no continuous positioning capability.
    #[error("continuous positioning unavailable: {0}")]
    Unavailable(String),

    /// Failed to bind the position feed socket.
    #[error("failed to bind position feed socket on port {port}: {source}")]
    SocketBind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// No fix arrived within the bounded wait.
    #[error("no position fix within {0:?}")]
    FixTimeout(Duration),

    /// The device reported a position error.
    #[error("device position error: {0}")]
    Position(String),

    /// The position feed closed before a fix was obtained.
    #[error("position feed closed before a fix was obtained")]
    FeedClosed,
}
