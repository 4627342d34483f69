use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

/// How often the background sweep evicts expired entries
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One cached AI response
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    #[allow(dead_code)] // Kept for debugging cache age
    created_at: Instant,
    expires_at: Instant,
}

/// TTL-keyed memo store for AI responses
///
/// Keys are request fingerprints, payloads are serialized analysis results.
/// An explicitly constructed instance (no global state) so tests can
/// isolate one per case. Expired entries are evicted lazily on `get` and
/// proactively by the periodic sweep.
#[derive(Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored payload if it has not expired, evicting it
    /// otherwise.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores a payload with the given time-to-live.
    pub fn set(&self, key: &str, payload: String, ttl: Duration) {
        let now = Instant::now();
        let entry = CacheEntry {
            payload,
            created_at: now,
            expires_at: now + ttl,
        };
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key.to_string(), entry);
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        let evicted = before - entries.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = entries.len(), "Cache sweep completed");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Spawns the periodic sweep task for a shared cache instance.
pub fn spawn_sweeper(cache: Arc<ResponseCache>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await; // First tick fires immediately
        loop {
            ticker.tick().await;
            cache.purge_expired();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_within_ttl_returns_payload() {
        let cache = ResponseCache::new();
        cache.set("k", "payload".to_string(), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(cache.get("k"), Some("payload".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_past_ttl_evicts_and_misses() {
        let cache = ResponseCache::new();
        cache.set("k", "payload".to_string(), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_overwrites_existing_entry() {
        let cache = ResponseCache::new();
        cache.set("k", "old".to_string(), Duration::from_secs(60));
        cache.set("k", "new".to_string(), Duration::from_secs(60));

        assert_eq!(cache.get("k"), Some("new".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_live_entries() {
        let cache = ResponseCache::new();
        cache.set("short", "a".to_string(), Duration::from_secs(10));
        cache.set("long", "b".to_string(), Duration::from_secs(120));

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.purge_expired();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("long"), Some("b".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_in_background() {
        let cache = Arc::new(ResponseCache::new());
        cache.set("k", "payload".to_string(), Duration::from_secs(10));
        spawn_sweeper(cache.clone(), Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(90)).await;
        // Give the sweep task a chance to run
        tokio::task::yield_now().await;

        assert!(cache.is_empty());
    }
}
