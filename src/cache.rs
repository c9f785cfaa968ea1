use std::{
    collections::HashMap,
    sync::RwLock,
    time::{Duration, Instant},
};

/// Key value cache with per entry time to live
pub trait Cache<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;
    fn set(&self, key: &str, value: V, ttl: Duration);
    fn delete(&self, key: &str);
    /// Drop expired entries, returns how many were removed
    fn sweep(&self) -> usize;
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In process cache. Expired entries are ignored on read and removed by `sweep`.
pub struct MemoryCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send + Sync> Cache<V> for MemoryCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            return None;
        }
        Some(entry.value.clone())
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        let Ok(mut entries) = self.entries.write() else {
            tracing::warn!("cache lock poisoned, skipping set for {key}");
            return;
        };
        let expires_at = Instant::now() + ttl;
        entries.insert(key.to_owned(), Entry { value, expires_at });
    }

    fn delete(&self, key: &str) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    fn sweep(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl<V> Cache<V> for NoopCache {
    fn get(&self, _key: &str) -> Option<V> {
        None
    }

    fn set(&self, _key: &str, _value: V, _ttl: Duration) {}

    fn delete(&self, _key: &str) {}

    fn sweep(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_get_set_delete() {
        let cache = MemoryCache::<String>::new();
        cache.set("k1", "v1".to_owned(), Duration::from_secs(60));
        assert_eq!(cache.get("k1"), Some("v1".to_owned()));
        assert_eq!(cache.get("k2"), None);
        cache.delete("k1");
        assert_eq!(cache.get("k1"), None);
    }

    #[test]
    fn test_memory_cache_expiry_and_sweep() {
        let cache = MemoryCache::<u32>::new();
        cache.set("gone", 1, Duration::ZERO);
        cache.set("kept", 2, Duration::from_secs(60));
        assert_eq!(cache.get("gone"), None);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("kept"), Some(2));
    }

    #[test]
    fn test_noop_cache() {
        let cache = NoopCache;
        Cache::<u32>::set(&cache, "k", 1, Duration::from_secs(60));
        assert_eq!(Cache::<u32>::get(&cache, "k"), None);
    }
}
