//! A small TTL + capacity-bounded response cache with optional single-flight
//! coalescing of concurrent fetches for the same key.

use std::{collections::hash_map::RandomState, sync::Arc, time::Duration};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use yfin_core::clock::{Clock, MonotonicClock};

/// Cache key: the normalized identity of a scrape target (endpoint + params).
pub type CacheKey = String;

/// Configuration for a [`ResponseCache`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Whether caching is active at all; `false` makes every lookup miss.
    pub enabled: bool,
    /// Maximum number of entries retained; oldest entry is evicted on overflow.
    pub max_entries: usize,
    /// How long an entry remains fresh after being stored.
    pub ttl: Duration,
    /// Whether concurrent fetches for the same key are coalesced into one.
    pub coalesce_in_flight: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 512,
            ttl: Duration::from_secs(60),
            coalesce_in_flight: true,
        }
    }
}

struct Entry {
    body: Bytes,
    stored_at_millis: u64,
}

/// A concurrent, TTL-bounded response cache with single-flight coalescing.
pub struct ResponseCache {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entries: DashMap<CacheKey, Entry, RandomState>,
    in_flight: DashMap<CacheKey, Arc<AsyncMutex<()>>, RandomState>,
}

impl ResponseCache {
    /// Builds a cache using the system monotonic clock.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::default()))
    }

    /// Builds a cache using an injected clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, entries: DashMap::default(), in_flight: DashMap::default() }
    }

    /// Returns a fresh cached body for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Bytes> {
        if !self.config.enabled {
            return None;
        }
        let entry = self.entries.get(key)?;
        let age_millis = self.clock.now_millis().saturating_sub(entry.stored_at_millis);
        if age_millis > self.config.ttl.as_millis() as u64 {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.body.clone())
    }

    /// Stores `body` under `key`, evicting the oldest entry if at capacity.
    pub fn put(&self, key: CacheKey, body: Bytes) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(key, Entry { body, stored_at_millis: self.clock.now_millis() });
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.stored_at_millis)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    /// Fetches `key`, serving a fresh cached value if present, otherwise
    /// running `fetch` and caching its result. When `coalesce_in_flight` is
    /// enabled, concurrent callers for the same key share one `fetch` call.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: CacheKey, fetch: F) -> Result<Bytes, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Bytes, E>>,
    {
        if let Some(cached) = self.get(&key) {
            return Ok(cached);
        }

        if !self.config.coalesce_in_flight {
            let body = fetch().await?;
            self.put(key, body.clone());
            return Ok(body);
        }

        let lock = self.in_flight.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone();
        let _guard = lock.lock().await;

        if let Some(cached) = self.get(&key) {
            self.in_flight.remove(&key);
            return Ok(cached);
        }

        let body = fetch().await?;
        self.put(key.clone(), body.clone());
        self.in_flight.remove(&key);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use yfin_core::clock::ManualClock;

    use super::*;

    #[test]
    fn disabled_cache_never_hits() {
        let cache = ResponseCache::new(CacheConfig { enabled: false, ..CacheConfig::default() });
        cache.put("k".into(), Bytes::from_static(b"v"));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(
            CacheConfig { ttl: Duration::from_millis(100), ..CacheConfig::default() },
            clock.clone(),
        );
        cache.put("k".into(), Bytes::from_static(b"v"));
        assert!(cache.get("k").is_some());
        clock.advance(Duration::from_millis(200));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn overflow_evicts_oldest_entry() {
        let clock = Arc::new(ManualClock::new());
        let cache = ResponseCache::with_clock(CacheConfig { max_entries: 2, ..CacheConfig::default() }, clock.clone());
        cache.put("a".into(), Bytes::from_static(b"1"));
        clock.advance(Duration::from_millis(1));
        cache.put("b".into(), Bytes::from_static(b"2"));
        clock.advance(Duration::from_millis(1));
        cache.put("c".into(), Bytes::from_static(b"3"));
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[tokio::test]
    async fn concurrent_fetches_for_same_key_are_coalesced() {
        let cache = Arc::new(ResponseCache::new(CacheConfig::default()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch::<_, _, std::convert::Infallible>("k".to_string(), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok(Bytes::from_static(b"v"))
                    })
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
