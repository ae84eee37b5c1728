//! Keyed in-memory cache with per-entry TTL and single-flight computation.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::Clock;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug)]
struct CacheInner<K, V> {
    map: HashMap<K, CacheEntry<V>>,
}

impl<K: Hash + Eq, V: Clone> CacheInner<K, V> {
    fn get(&self, key: &K, now: Instant) -> Option<V> {
        self.map
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone())
    }

    fn put(&mut self, key: K, value: V, expires_at: Instant) {
        self.map.insert(key, CacheEntry { value, expires_at });
    }

    fn clear_expired(&mut self, now: Instant) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| now < entry.expires_at);
        before - self.map.len()
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// Thread-safe TTL cache.
///
/// An entry is live while `now < inserted_at + ttl`, where "now" comes from
/// the injected [`Clock`]. At most one entry exists per key; inserting again
/// replaces it.
///
/// [`get_or_try_insert_with`](TtlCache::get_or_try_insert_with) serializes
/// concurrent misses for the same key: one caller computes, the others wait
/// and then read the stored value. Different keys never block each other.
pub struct TtlCache<K, V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<K, V>>>,
    gates: Arc<Mutex<HashMap<K, Gate>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            gates: Arc::clone(&self.gates),
            ttl: self.ttl,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
            })),
            gates: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live value for `key`, if any.
    pub async fn lookup(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        self.inner.read().await.get(key, now)
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub async fn insert(&self, key: K, value: V) {
        let expires_at = self.clock.now() + self.ttl;
        self.inner.write().await.put(key, value, expires_at);
    }

    /// Remove expired entries, returning how many were dropped.
    pub async fn expire(&self) -> usize {
        let now = self.clock.now();
        self.inner.write().await.clear_expired(now)
    }

    pub async fn clear(&self) {
        self.inner.write().await.map.clear();
    }

    /// Number of stored entries, expired ones included until [`expire`](Self::expire) runs.
    pub async fn len(&self) -> usize {
        self.inner.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Return the live value for `key`, or run `compute` and store its `Ok`
    /// result.
    ///
    /// Errors are returned to the caller that computed them and are not
    /// cached; a waiting caller then gets its own turn to compute.
    pub async fn get_or_try_insert_with<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.lookup(&key).await {
            return Ok(value);
        }

        let gate = self.gate_for(&key);
        let _guard = gate.lock().await;

        // whoever held the gate before us may have filled the entry
        if let Some(value) = self.lookup(&key).await {
            self.release_gate(&key, &gate);
            return Ok(value);
        }

        let result = compute().await;
        if let Ok(value) = &result {
            self.insert(key.clone(), value.clone()).await;
        }
        self.release_gate(&key, &gate);
        result
    }

    /// Infallible form of [`get_or_try_insert_with`](Self::get_or_try_insert_with).
    pub async fn get_or_insert_with<F, Fut>(&self, key: K, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let result: Result<V, std::convert::Infallible> = self
            .get_or_try_insert_with(key, || async move { Ok(compute().await) })
            .await;
        match result {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    fn gate_for(&self, key: &K) -> Gate {
        let mut gates = self.gates.lock().expect("cache gate lock is not poisoned");
        Arc::clone(
            gates
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Drop the gate for `key` once nobody else is queued on it.
    ///
    /// The map and `gate` account for two references; any more belong to
    /// waiters that must keep sharing this gate with later callers.
    fn release_gate(&self, key: &K, gate: &Gate) {
        let mut gates = self.gates.lock().expect("cache gate lock is not poisoned");
        let idle = gates
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, gate) && Arc::strong_count(gate) <= 2);
        if idle {
            gates.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache(clock: Arc<ManualClock>) -> TtlCache<String, u32> {
        TtlCache::new(Duration::from_secs(120), clock)
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let cache = cache(Arc::new(ManualClock::new()));

        cache.insert(String::from("key1"), 7).await;

        assert_eq!(cache.lookup(&String::from("key1")).await, Some(7));
        assert_eq!(cache.lookup(&String::from("key2")).await, None);
    }

    #[tokio::test]
    async fn test_entry_expires_at_ttl_boundary() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache(Arc::clone(&clock));
        cache.insert(String::from("key"), 1).await;

        clock.advance(Duration::from_secs(119));
        assert_eq!(cache.lookup(&String::from("key")).await, Some(1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.lookup(&String::from("key")).await, None);
    }

    #[tokio::test]
    async fn test_expire_drops_only_stale_entries() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache(Arc::clone(&clock));

        cache.insert(String::from("old"), 1).await;
        clock.advance(Duration::from_secs(100));
        cache.insert(String::from("new"), 2).await;
        clock.advance(Duration::from_secs(30));

        assert_eq!(cache.expire().await, 1);
        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.lookup(&String::from("new")).await, Some(2));
    }

    #[tokio::test]
    async fn test_insert_replaces_existing_entry() {
        let cache = cache(Arc::new(ManualClock::new()));
        cache.insert(String::from("key"), 1).await;
        cache.insert(String::from("key"), 2).await;

        assert_eq!(cache.len().await, 1);
        assert_eq!(cache.lookup(&String::from("key")).await, Some(2));

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_compute_runs_once_within_ttl() {
        let clock = Arc::new(ManualClock::new());
        let cache = cache(Arc::clone(&clock));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_insert_with(String::from("key"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42
                })
                .await;
            assert_eq!(value, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        clock.advance(Duration::from_secs(120));
        cache
            .get_or_insert_with(String::from("key"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                43
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache = cache(Arc::new(ManualClock::new()));

        let failed: Result<u32, &str> = cache
            .get_or_try_insert_with(String::from("key"), || async { Err("down") })
            .await;
        assert_eq!(failed, Err("down"));
        assert!(cache.is_empty().await);

        let ok: Result<u32, &str> = cache
            .get_or_try_insert_with(String::from("key"), || async { Ok(5) })
            .await;
        assert_eq!(ok, Ok(5));
    }

    #[tokio::test]
    async fn test_concurrent_misses_share_one_computation() {
        let cache = cache(Arc::new(ManualClock::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_insert_with(String::from("key"), || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        9
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.expect("task should not panic"), 9);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_compute_keeps_later_callers_serialized() {
        let cache = cache(Arc::new(ManualClock::new()));
        let calls = Arc::new(AtomicUsize::new(0));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        // first computation fails after 50ms; callers arrive at 0, 5 and 60ms
        let mut handles = Vec::new();
        for start_ms in [0_u64, 5, 60] {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            let in_flight = Arc::clone(&in_flight);
            let max_in_flight = Arc::clone(&max_in_flight);
            handles.push(tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(start_ms)).await;
                cache
                    .get_or_try_insert_with(String::from("key"), || async move {
                        let call = calls.fetch_add(1, Ordering::SeqCst);
                        let running = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        max_in_flight.fetch_max(running, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        if call == 0 {
                            Err("upstream down")
                        } else {
                            Ok(11)
                        }
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.expect("task should not panic"));
        }

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(results, vec![Err("upstream down"), Ok(11), Ok(11)]);
    }
}
