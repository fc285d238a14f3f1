//! The refresh loop.

use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::directory::{DirectoryClient, DirectoryError};
use crate::geocode::{GeocodeCache, GeocodeClient};
use crate::roster::{resolve_rows, PersonRecord, ResolvedRow};

/// Configuration for the roster refresher.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Interval between directory pulls.
    pub refresh_interval: Duration,

    /// Organization scope filter; `None` disables filtering.
    pub org_filter: Option<String>,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(15),
            org_filter: None,
        }
    }
}

/// The collections from one directory pull.
struct Snapshot {
    accounts: Vec<PersonRecord>,
    staff: Vec<PersonRecord>,
    patients: Vec<PersonRecord>,
}

/// Periodic roster refresh daemon.
///
/// Owns the geocode cache consulted by the joiner; constructed, started,
/// and torn down by the owning view.
pub struct RosterRefresher<D, C> {
    directory: D,
    geocode: GeocodeCache<C>,
    config: RefreshConfig,
}

/// Handle for a running refresher.
pub struct RosterHandle {
    rows: watch::Receiver<Vec<ResolvedRow>>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl RosterHandle {
    /// Subscribe to resolved-row publications.
    pub fn rows(&self) -> watch::Receiver<Vec<ResolvedRow>> {
        self.rows.clone()
    }

    /// The most recently published rows.
    pub fn latest(&self) -> Vec<ResolvedRow> {
        self.rows.borrow().clone()
    }

    /// Stop the refresh loop and tear down its bookkeeping.
    ///
    /// Cancellation is synchronous; the loop mutates nothing after it
    /// observes the token.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Stop the refresh loop and wait for it to finish.
    pub async fn shutdown_and_wait(self) {
        self.cancel.cancel();
        if let Err(error) = self.task.await {
            warn!(error = %error, "Roster refresher task failed");
        }
    }
}

impl<D, C> RosterRefresher<D, C>
where
    D: DirectoryClient + 'static,
    C: GeocodeClient + 'static,
{
    /// Create a refresher with the default configuration.
    pub fn new(directory: D, geocode: GeocodeCache<C>) -> Self {
        Self::with_config(directory, geocode, RefreshConfig::default())
    }

    /// Create a refresher with a custom configuration.
    pub fn with_config(directory: D, geocode: GeocodeCache<C>, config: RefreshConfig) -> Self {
        Self {
            directory,
            geocode,
            config,
        }
    }

    /// Start the refresh loop as an async task.
    pub fn start(self) -> RosterHandle {
        let (rows_tx, rows_rx) = watch::channel(Vec::new());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(rows_tx, cancel.clone()));

        RosterHandle {
            rows: rows_rx,
            cancel,
            task,
        }
    }

    async fn run(self, rows_tx: watch::Sender<Vec<ResolvedRow>>, cancel: CancellationToken) {
        info!(
            refresh_interval_secs = self.config.refresh_interval.as_secs(),
            org_filter = ?self.config.org_filter,
            "Roster refresher started"
        );

        let mut interval = tokio::time::interval(self.config.refresh_interval);
        let mut settlements = self.geocode.subscribe_settlements();
        let mut settlements_open = true;
        let mut snapshot: Option<Snapshot> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    match self.fetch_snapshot().await {
                        Ok(fresh) => {
                            self.publish(&rows_tx, &fresh);
                            snapshot = Some(fresh);
                        }
                        Err(error) => warn!(error = %error, "Roster refresh failed"),
                    }
                }
                settled = settlements.recv(), if settlements_open => match settled {
                    Ok(address) => {
                        debug!(address = %address, "Geocode settled, recomputing rows");
                        if let Some(snapshot) = &snapshot {
                            self.publish(&rows_tx, snapshot);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Missed settlements, recomputing rows");
                        if let Some(snapshot) = &snapshot {
                            self.publish(&rows_tx, snapshot);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => settlements_open = false,
                }
            }
        }

        info!("Roster refresher stopped");
    }

    async fn fetch_snapshot(&self) -> Result<Snapshot, DirectoryError> {
        let (accounts, staff, patients) = tokio::try_join!(
            self.directory.fetch_accounts(),
            self.directory.fetch_staff(),
            self.directory.fetch_patients(),
        )?;

        debug!(
            accounts = accounts.len(),
            staff = staff.len(),
            patients = patients.len(),
            "Directory collections fetched"
        );

        Ok(Snapshot {
            accounts,
            staff,
            patients,
        })
    }

    /// Join the snapshot into rows and publish them. Idempotent: the same
    /// snapshot with an unchanged cache produces the same rows.
    fn publish(&self, rows_tx: &watch::Sender<Vec<ResolvedRow>>, snapshot: &Snapshot) {
        let rows = resolve_rows(
            &snapshot.accounts,
            &snapshot.staff,
            &snapshot.patients,
            &self.geocode,
            self.config.org_filter.as_deref(),
        );
        let _ = rows_tx.send(rows);
    }
}
