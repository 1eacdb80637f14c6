use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct StoredEntry<T> {
    value: T,
    expires_at: Instant,
}

/// In-memory key/value store with per-entry time-to-live.
///
/// Nothing survives the process. Expired entries are dropped on lookup and
/// swept from the whole map on every insert.
pub struct TtlCache<T> {
    store: Mutex<HashMap<String, StoredEntry<T>>>,
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> TtlCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Mutex::new(HashMap::new()),
        }
    }

    /// Stores a value with a time-to-live (TTL).
    #[tracing::instrument(name = "put_cache", level = "debug", skip(self, value))]
    pub fn put(&self, key: &str, value: T, ttl: Duration) {
        let now = Instant::now();
        let Some(expires_at) = now.checked_add(ttl) else {
            tracing::debug!("TTL overflow, entry not stored");
            return;
        };

        let mut store = self.store.lock();
        let before = store.len();
        store.retain(|_, entry| entry.expires_at > now);
        if store.len() < before {
            tracing::debug!("Swept {} expired entries", before - store.len());
        }
        store.insert(key.to_string(), StoredEntry { value, expires_at });
    }

    /// Retrieves a value if it exists and has not expired.
    /// Returns `None` for cache misses or expired entries.
    #[tracing::instrument(name = "query_cache", level = "debug", skip(self))]
    pub fn get(&self, key: &str) -> Option<T> {
        let mut store = self.store.lock();
        match store.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => {
                tracing::debug!("Key found and still fresh");
                Some(entry.value.clone())
            }
            Some(_) => {
                tracing::debug!("Key found but expired");
                store.remove(key);
                None
            }
            None => {
                tracing::debug!("Key not found");
                None
            }
        }
    }

    /// Manually removes a key from the cache.
    pub fn remove(&self, key: &str) {
        self.store.lock().remove(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_get() {
        let cache = TtlCache::new();
        cache.put("rio", vec![1, 2], Duration::from_secs(60));
        assert_eq!(cache.get("rio"), Some(vec![1, 2]));
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = TtlCache::new();
        cache.put("rio", 7, Duration::ZERO);
        assert_eq!(cache.get("rio"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_sweeps_other_expired_keys() {
        let cache = TtlCache::new();
        cache.put("re", 1, Duration::ZERO);
        cache.put("rec", 2, Duration::ZERO);
        cache.put("recife", 3, Duration::from_secs(60));

        // the stale prefixes are gone without ever being read again
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("recife"), Some(3));
    }

    #[test]
    fn test_remove() {
        let cache = TtlCache::new();
        cache.put("rio", 7, Duration::from_secs(60));
        cache.remove("rio");
        assert_eq!(cache.get("rio"), None);
    }
}
