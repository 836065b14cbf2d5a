//! Injectable clock abstraction.
//!
//! Time-sensitive components (the circuit breaker's rolling window, backoff
//! delay computation, session cooldowns) depend on a [`Clock`] rather than
//! calling `Instant::now()` directly, so tests can advance time deterministically
//! instead of sleeping.

use std::{
    fmt::Debug,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

/// A source of monotonic time, expressed in milliseconds since an arbitrary epoch.
pub trait Clock: Send + Sync + Debug {
    /// Returns the current time in milliseconds since the clock's epoch.
    fn now_millis(&self) -> u64;
}

/// A [`Clock`] backed by [`Instant::now`], pinned at construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self { start: Instant::now() }
    }
}

impl Clock for MonotonicClock {
    fn now_millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// A [`Clock`] whose value is advanced explicitly by test code.
#[derive(Debug, Clone)]
pub struct ManualClock {
    millis: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a new manual clock starting at `0`.
    #[must_use]
    pub fn new() -> Self {
        Self { millis: Arc::new(AtomicU64::new(0)) }
    }

    /// Advances the clock by `duration`.
    pub fn advance(&self, duration: Duration) {
        self.millis.fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    /// Sets the clock to an absolute value in milliseconds.
    pub fn set_millis(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_millis(), 0);
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now_millis(), 250);
    }

    #[test]
    fn monotonic_clock_is_nondecreasing() {
        let clock = MonotonicClock::default();
        let a = clock.now_millis();
        let b = clock.now_millis();
        assert!(b >= a);
    }
}
