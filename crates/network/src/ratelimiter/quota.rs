//! Quota definitions for the rate limiter.

use std::{num::NonZeroU32, time::Duration};

/// A rate limit expressed as a burst capacity and a per-token replenish interval.
///
/// `replenish_interval` is the time it takes to accrue a single additional
/// token; `max_burst` is the maximum number of tokens the bucket can hold.
/// A `per_second(r)` quota therefore has `max_burst = r` and
/// `replenish_interval = 1s / r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    max_burst: NonZeroU32,
    replenish_interval: Duration,
}

impl Quota {
    fn with_rate_per(period: Duration, rate: NonZeroU32) -> Self {
        let interval_nanos = (period.as_nanos() / u128::from(rate.get())).max(1);
        Self {
            max_burst: rate,
            replenish_interval: Duration::from_nanos(interval_nanos as u64),
        }
    }

    /// A quota admitting `rate` requests per second, with burst equal to `rate`.
    #[must_use]
    pub fn per_second(rate: NonZeroU32) -> Self {
        Self::with_rate_per(Duration::from_secs(1), rate)
    }

    /// A quota admitting `rate` requests per minute, with burst equal to `rate`.
    #[must_use]
    pub fn per_minute(rate: NonZeroU32) -> Self {
        Self::with_rate_per(Duration::from_secs(60), rate)
    }

    /// A quota admitting `rate` requests per hour, with burst equal to `rate`.
    #[must_use]
    pub fn per_hour(rate: NonZeroU32) -> Self {
        Self::with_rate_per(Duration::from_secs(3600), rate)
    }

    /// A quota that replenishes a single token every `period`, with burst `1`.
    /// Returns `None` if `period` is zero.
    #[must_use]
    pub fn with_period(period: Duration) -> Option<Self> {
        if period.is_zero() {
            return None;
        }
        Some(Self {
            max_burst: NonZeroU32::new(1).unwrap(),
            replenish_interval: period,
        })
    }

    /// Returns a copy of this quota with `burst` as its maximum burst capacity,
    /// leaving the replenish interval unchanged.
    #[must_use]
    pub fn allow_burst(mut self, burst: NonZeroU32) -> Self {
        self.max_burst = burst;
        self
    }

    /// The maximum number of tokens the bucket can hold.
    #[must_use]
    pub fn burst_size(&self) -> NonZeroU32 {
        self.max_burst
    }

    /// The time it takes to accrue a single additional token.
    #[must_use]
    pub fn replenish_interval(&self) -> Duration {
        self.replenish_interval
    }
}
