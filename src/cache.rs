use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// String key-value cache with per-entry expiry
pub trait KvCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Store `value`; `ttl` of `None` uses the cache's default
    fn put(&self, key: &str, value: String, ttl: Option<Duration>);

    fn remove(&self, key: &str);
}

/// Read a JSON value, treating undecodable entries as misses
pub fn get_json<T: DeserializeOwned>(cache: &dyn KvCache, key: &str) -> Option<T> {
    let raw = cache.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            ::log::warn!("Dropping undecodable cache entry {}: {}", key, e);
            cache.remove(key);
            None
        }
    }
}

pub fn put_json<T: Serialize>(cache: &dyn KvCache, key: &str, value: &T, ttl: Option<Duration>) {
    match serde_json::to_string(value) {
        Ok(raw) => cache.put(key, raw, ttl),
        Err(e) => ::log::warn!("Not caching {}: {}", key, e),
    }
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process [`KvCache`]
pub struct MemoryCache {
    default_ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            default_ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Evict every expired entry, returning how many were dropped
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Number of stored entries, expired or not
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                ::log::trace!("Cache entry expired: {}", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: String, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        self.lock()
            .insert(key.to_string(), Entry { value, expires_at });
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ttl() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        cache.put("pages:all", "[]".to_string(), None);
        assert_eq!(cache.get("pages:all").as_deref(), Some("[]"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("pages:all").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("pages:all").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_ttl_overrides_default() {
        let cache = MemoryCache::new(Duration::from_secs(600));
        cache.put("short", "1".to_string(), Some(Duration::from_secs(5)));
        cache.put("long", "2".to_string(), None);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.get("short").is_none());
        assert_eq!(cache.get("long").as_deref(), Some("2"));
    }

    #[test]
    fn test_json_helpers() {
        let cache = MemoryCache::new(Duration::from_secs(60));
        put_json(&cache, "numbers", &vec![1, 2, 3], None);
        let back: Option<Vec<i32>> = get_json(&cache, "numbers");
        assert_eq!(back, Some(vec![1, 2, 3]));

        cache.put("broken", "{not json".to_string(), None);
        let broken: Option<Vec<i32>> = get_json(&cache, "broken");
        assert!(broken.is_none());
        assert!(cache.get("broken").is_none());

        cache.remove("numbers");
        assert!(cache.is_empty());
    }
}
