//! Per-key token-bucket rate limiting.
//!
//! Admission is governed by a generic cell-rate algorithm (GCRA), which is
//! mathematically equivalent to a continuously-refilling token bucket: tokens
//! accrue at a steady rate up to the quota's burst capacity, and a request is
//! admitted only when at least one token is available. [`check_key`] is the
//! non-blocking primitive; [`RateLimiter::acquire`] layers a cancellable wait
//! loop on top of it for callers that want to block until admitted.

pub mod quota;

use std::{
    collections::HashMap,
    hash::{BuildHasher, Hash},
    sync::Mutex,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use quota::Quota;
use yfin_core::cancellation::{CancellationToken, WaitOutcome};

/// Error returned when a key has no configured quota and no default quota
/// exists, or when the bucket is momentarily exhausted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// No quota is registered for the key and no default quota was configured.
    #[error("no quota configured for key and no default quota set")]
    NoQuota,
    /// The bucket has no tokens available right now.
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    Exceeded {
        /// How long until a token becomes available.
        retry_after: Duration,
    },
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: f64) -> Self {
        Self { tokens: capacity, last_refill: Instant::now() }
    }

    /// Refills and attempts to withdraw one token. On failure returns the
    /// duration until the next token would be available.
    fn try_acquire(&mut self, quota: &Quota) -> Result<(), Duration> {
        let capacity = f64::from(quota.burst_size().get());
        let interval = quota.replenish_interval().as_secs_f64();
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.last_refill = now;
        if interval > 0.0 {
            self.tokens = (self.tokens + elapsed / interval).min(capacity);
        }
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            Err(Duration::from_secs_f64(deficit * interval))
        }
    }
}

/// A per-key token-bucket rate limiter.
pub struct RateLimiter<K, S = ahash::RandomState>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    S: BuildHasher + Clone + Default + Send + Sync + 'static,
{
    default_quota: Option<Quota>,
    key_quotas: HashMap<K, Quota, S>,
    buckets: DashMap<K, Mutex<Bucket>, S>,
}

impl<K, S> RateLimiter<K, S>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    S: BuildHasher + Clone + Default + Send + Sync + 'static,
{
    /// Creates a limiter with an optional default quota and per-key overrides.
    #[must_use]
    pub fn new_with_quota(default_quota: Option<Quota>, keyed_quotas: Vec<(K, Quota)>) -> Self {
        let mut key_quotas: HashMap<K, Quota, S> = HashMap::with_hasher(S::default());
        for (k, q) in keyed_quotas {
            key_quotas.insert(k, q);
        }
        Self {
            default_quota,
            key_quotas,
            buckets: DashMap::with_hasher(S::default()),
        }
    }

    fn quota_for(&self, key: &K) -> Option<Quota> {
        self.key_quotas.get(key).copied().or(self.default_quota)
    }

    /// Non-blocking admission check for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::NoQuota`] if no quota applies, or
    /// [`RateLimitError::Exceeded`] if the bucket has no tokens available.
    pub fn check_key(&self, key: &K) -> Result<(), RateLimitError> {
        let quota = self.quota_for(key).ok_or(RateLimitError::NoQuota)?;
        let capacity = f64::from(quota.burst_size().get());
        let entry = self
            .buckets
            .entry(key.clone())
            .or_insert_with(|| Mutex::new(Bucket::new(capacity)));
        let mut bucket = entry.lock().unwrap();
        bucket.try_acquire(&quota).map_err(|retry_after| RateLimitError::Exceeded { retry_after })
    }

    /// Blocks until `key` is admitted or `token` is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError::NoQuota`] if no quota applies to `key`.
    pub async fn acquire(&self, key: &K, token: &CancellationToken) -> Result<WaitOutcome, RateLimitError> {
        loop {
            match self.check_key(key) {
                Ok(()) => return Ok(WaitOutcome::Completed),
                Err(RateLimitError::Exceeded { retry_after }) => {
                    if yfin_core::cancellation::sleep_or_cancelled(retry_after, token).await
                        == WaitOutcome::Cancelled
                    {
                        return Ok(WaitOutcome::Cancelled);
                    }
                }
                Err(err @ RateLimitError::NoQuota) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use rstest::rstest;

    use super::*;

    #[test]
    fn first_request_within_burst_is_allowed() {
        let quota = Quota::per_second(NonZeroU32::new(5).unwrap());
        let limiter: RateLimiter<String> = RateLimiter::new_with_quota(Some(quota), vec![]);
        assert!(limiter.check_key(&"host".to_string()).is_ok());
    }

    #[test]
    fn exhausts_after_burst_capacity() {
        let quota = Quota::per_second(NonZeroU32::new(3).unwrap());
        let limiter: RateLimiter<String> = RateLimiter::new_with_quota(Some(quota), vec![]);
        let key = "host".to_string();
        for _ in 0..3 {
            assert!(limiter.check_key(&key).is_ok());
        }
        assert!(matches!(limiter.check_key(&key), Err(RateLimitError::Exceeded { .. })));
    }

    #[rstest]
    fn missing_quota_is_an_error() {
        let limiter: RateLimiter<String> = RateLimiter::new_with_quota(None, vec![]);
        assert_eq!(limiter.check_key(&"host".to_string()), Err(RateLimitError::NoQuota));
    }

    #[test]
    fn keys_are_isolated() {
        let quota = Quota::per_second(NonZeroU32::new(1).unwrap());
        let limiter: RateLimiter<String> = RateLimiter::new_with_quota(Some(quota), vec![]);
        assert!(limiter.check_key(&"a".to_string()).is_ok());
        assert!(limiter.check_key(&"a".to_string()).is_err());
        assert!(limiter.check_key(&"b".to_string()).is_ok());
    }

    #[tokio::test]
    async fn acquire_respects_cancellation() {
        let quota = Quota::per_second(NonZeroU32::new(1).unwrap());
        let limiter: RateLimiter<String> = RateLimiter::new_with_quota(Some(quota), vec![]);
        let key = "host".to_string();
        assert!(limiter.check_key(&key).is_ok());
        let token = CancellationToken::new();
        token.cancel();
        let outcome = limiter.acquire(&key, &token).await.unwrap();
        assert_eq!(outcome, WaitOutcome::Cancelled);
    }
}
