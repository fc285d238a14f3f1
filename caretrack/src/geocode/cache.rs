//! Address cache with pending-set deduplication.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::position::{parse_coordinate, PositionSource, ResolvedPosition};

use super::client::GeocodeClient;
use super::error::GeocodeError;

/// Capacity of the settlement broadcast channel.
const SETTLEMENT_CHANNEL_CAPACITY: usize = 32;

/// Outcome of a cache consultation. Never blocks the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeocodeOutcome {
    /// The address is cached; here is its position.
    Hit(ResolvedPosition),
    /// A lookup for this address is outstanding; poll again later.
    Pending,
    /// Nothing cached and no lookup was started (empty address).
    Miss,
}

struct CacheInner {
    entries: HashMap<String, ResolvedPosition>,
    pending: HashSet<String>,
}

/// Session-lifetime geocode cache with in-flight deduplication.
///
/// Keys are normalized addresses (trimmed, lower-cased). A key is a member
/// of at most one of {pending, cached} at any instant, which is what bounds
/// the provider to one outstanding request per address.
///
/// Entries persist for the lifetime of the cache object; unbounded growth is
/// an accepted tradeoff for a session-scoped cache.
///
/// Cloning is cheap and shares the underlying storage. Lookups are spawned
/// on the current Tokio runtime, so [`resolve_address`] must be called from
/// within one.
///
/// [`resolve_address`]: GeocodeCache::resolve_address
pub struct GeocodeCache<C> {
    client: Arc<C>,
    inner: Arc<Mutex<CacheInner>>,
    settled_tx: broadcast::Sender<String>,
}

impl<C> Clone for GeocodeCache<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            inner: Arc::clone(&self.inner),
            settled_tx: self.settled_tx.clone(),
        }
    }
}

impl<C: GeocodeClient + 'static> GeocodeCache<C> {
    /// Create an empty cache backed by the given provider client.
    pub fn new(client: C) -> Self {
        let (settled_tx, _) = broadcast::channel(SETTLEMENT_CHANNEL_CAPACITY);
        Self {
            client: Arc::new(client),
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                pending: HashSet::new(),
            })),
            settled_tx,
        }
    }

    /// Normalize an address into its cache key.
    pub fn normalize(address: &str) -> String {
        address.trim().to_lowercase()
    }

    /// Consult the cache for an address.
    ///
    /// - Cached: returns [`GeocodeOutcome::Hit`] immediately.
    /// - Fresh miss: marks the key pending, spawns exactly one provider
    ///   lookup, and returns [`GeocodeOutcome::Pending`].
    /// - Already pending: returns [`GeocodeOutcome::Pending`] without a
    ///   second lookup.
    /// - Empty normalized address: always [`GeocodeOutcome::Miss`], never
    ///   looked up.
    ///
    /// Lookup failures leave the key uncached and clear its pending mark;
    /// the next consultation may retry, so at most one request per address
    /// is ever outstanding.
    pub fn resolve_address(&self, address: &str) -> GeocodeOutcome {
        let key = Self::normalize(address);
        if key.is_empty() {
            return GeocodeOutcome::Miss;
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(position) = inner.entries.get(&key) {
            return GeocodeOutcome::Hit(*position);
        }
        if !inner.pending.insert(key.clone()) {
            return GeocodeOutcome::Pending;
        }
        drop(inner);

        self.spawn_lookup(key);
        GeocodeOutcome::Pending
    }

    /// Subscribe to settlement notifications.
    ///
    /// One normalized key is broadcast per successful lookup; consumers
    /// recompute whatever derived state they hold. Failed lookups fire no
    /// settlement - recomputing on failure would immediately re-issue the
    /// same lookup.
    pub fn subscribe_settlements(&self) -> broadcast::Receiver<String> {
        self.settled_tx.subscribe()
    }

    /// Number of cached entries.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Whether a lookup for this address is currently outstanding.
    pub fn is_pending(&self, address: &str) -> bool {
        let key = Self::normalize(address);
        self.inner.lock().unwrap().pending.contains(&key)
    }

    fn spawn_lookup(&self, key: String) {
        let client = Arc::clone(&self.client);
        let inner = Arc::clone(&self.inner);
        let settled_tx = self.settled_tx.clone();

        tokio::spawn(async move {
            match lookup(client.as_ref(), &key).await {
                Ok(position) => {
                    {
                        let mut inner = inner.lock().unwrap();
                        inner.pending.remove(&key);
                        inner.entries.insert(key.clone(), position);
                    }
                    tracing::debug!(
                        address = %key,
                        latitude = position.latitude,
                        longitude = position.longitude,
                        "Geocode lookup settled"
                    );
                    let _ = settled_tx.send(key);
                }
                Err(error) => {
                    tracing::warn!(address = %key, error = %error, "Geocode lookup failed");
                    inner.lock().unwrap().pending.remove(&key);
                }
            }
        });
    }
}

/// Run one provider lookup and validate the first candidate.
async fn lookup<C: GeocodeClient>(
    client: &C,
    address: &str,
) -> Result<ResolvedPosition, GeocodeError> {
    let candidates = client.geocode(address).await?;
    let first = candidates.first().ok_or(GeocodeError::NoUsableCandidate)?;

    let latitude = parse_coordinate(&first.lat).ok_or(GeocodeError::NoUsableCandidate)?;
    let longitude = parse_coordinate(&first.lon).ok_or(GeocodeError::NoUsableCandidate)?;

    ResolvedPosition::new(latitude, longitude, PositionSource::GeocodedCache)
        .ok_or(GeocodeError::NoUsableCandidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::client::GeocodeCandidate;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Client that counts calls and holds each lookup until released.
    struct GatedClient {
        calls: Arc<AtomicUsize>,
        gate: Arc<Notify>,
        candidates: Vec<GeocodeCandidate>,
    }

    impl GeocodeClient for GatedClient {
        async fn geocode(&self, _address: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(self.candidates.clone())
        }
    }

    /// Client that always fails.
    struct FailingClient {
        calls: Arc<AtomicUsize>,
    }

    impl GeocodeClient for FailingClient {
        async fn geocode(&self, _address: &str) -> Result<Vec<GeocodeCandidate>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(GeocodeError::Http("connection refused".to_string()))
        }
    }

    fn toronto_candidates() -> Vec<GeocodeCandidate> {
        serde_json::from_value(json!([{"lat": "43.6532", "lon": "-79.3832"}])).unwrap()
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..1000 {
            if condition() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn concurrent_calls_for_same_address_trigger_one_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let cache = GeocodeCache::new(GatedClient {
            calls: Arc::clone(&calls),
            gate: Arc::clone(&gate),
            candidates: toronto_candidates(),
        });
        let mut settlements = cache.subscribe_settlements();

        assert_eq!(cache.resolve_address("100 Queen St"), GeocodeOutcome::Pending);
        assert_eq!(cache.resolve_address("100 Queen St"), GeocodeOutcome::Pending);

        // Let the lookup task reach the gate, then release it.
        wait_until(|| calls.load(Ordering::SeqCst) == 1).await;
        gate.notify_one();

        let settled = settlements.recv().await.unwrap();
        assert_eq!(settled, "100 queen st");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        match cache.resolve_address("100 Queen St") {
            GeocodeOutcome::Hit(position) => {
                assert_eq!(position.latitude, 43.6532);
                assert_eq!(position.longitude, -79.3832);
                assert_eq!(position.source, PositionSource::GeocodedCache);
            }
            other => panic!("expected hit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn normalization_shares_one_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let cache = GeocodeCache::new(GatedClient {
            calls: Arc::clone(&calls),
            gate: Arc::clone(&gate),
            candidates: toronto_candidates(),
        });
        let mut settlements = cache.subscribe_settlements();

        assert_eq!(cache.resolve_address("  123 Main St "), GeocodeOutcome::Pending);
        // Differently-spelled but identically-normalized address: no new lookup.
        assert_eq!(cache.resolve_address("123 main st"), GeocodeOutcome::Pending);

        wait_until(|| calls.load(Ordering::SeqCst) == 1).await;
        gate.notify_one();
        settlements.recv().await.unwrap();

        assert_eq!(cache.entry_count(), 1);
        assert!(matches!(cache.resolve_address("  123 Main St "), GeocodeOutcome::Hit(_)));
        assert!(matches!(cache.resolve_address("123 main st"), GeocodeOutcome::Hit(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_address_is_a_miss_and_never_looked_up() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = GeocodeCache::new(FailingClient {
            calls: Arc::clone(&calls),
        });

        assert_eq!(cache.resolve_address(""), GeocodeOutcome::Miss);
        assert_eq!(cache.resolve_address("   "), GeocodeOutcome::Miss);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn failed_lookup_clears_pending_and_allows_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = GeocodeCache::new(FailingClient {
            calls: Arc::clone(&calls),
        });

        assert_eq!(cache.resolve_address("nowhere"), GeocodeOutcome::Pending);
        wait_until(|| !cache.is_pending("nowhere")).await;

        // Nothing cached, and a later consultation issues a fresh lookup.
        assert_eq!(cache.entry_count(), 0);
        assert_eq!(cache.resolve_address("nowhere"), GeocodeOutcome::Pending);
        wait_until(|| calls.load(Ordering::SeqCst) == 2).await;
    }
}
