//! Periodic roster refresh daemon.
//!
//! Pulls the person collections from the directory on a fixed interval,
//! joins them into resolved rows, and publishes the rows on a `watch`
//! channel. A geocode settlement triggers an immediate recomputation with
//! the collections already on hand, so address-only rows upgrade without
//! waiting for the next pull.

mod refresh;

pub use refresh::{RefreshConfig, RosterHandle, RosterRefresher};
