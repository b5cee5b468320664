// =============================================================================
// TTL Cache — time-to-live memoisation for provider responses
// =============================================================================
//
// The analytics engines are pure and never memoise; caching lives out here as
// an explicit collaborator keyed by request parameters.  An entry is served
// until its fetch time is older than the TTL, after which `get` treats it as
// absent and the next fetch overwrites it.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Thread-safe map of `key -> (value, fetched_at)` with a fixed TTL.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, (V, Instant)>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Return the cached value unless it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read();
        let (value, fetched_at) = entries.get(key)?;
        if fetched_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    /// Store `value` with the current instant as its fetch time.
    pub fn insert(&self, key: K, value: V) {
        self.entries.write().insert(key, (value, Instant::now()));
    }

    /// Drop every expired entry.  Called opportunistically from the refresh
    /// loop; correctness never depends on it because `get` re-checks the TTL.
    pub fn purge_expired(&self) {
        let mut entries = self.entries.write();
        entries.retain(|_, (_, fetched_at)| fetched_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
