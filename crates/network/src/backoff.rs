//! Exponential backoff with jitter.

use std::time::Duration;

use rand::RngExt;

/// Errors produced constructing an [`ExponentialBackoff`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BackoffError {
    /// `factor` was outside the supported range `[1.0, 100.0]`.
    #[error("backoff factor {0} out of range [1.0, 100.0]")]
    InvalidFactor(String),
    /// `max` was smaller than `initial`.
    #[error("max delay {max:?} is smaller than initial delay {initial:?}")]
    MaxBelowInitial {
        /// The configured initial delay.
        initial: Duration,
        /// The configured maximum delay.
        max: Duration,
    },
}

/// Computes successive retry delays: `clamp(initial * factor^n, initial, max)`,
/// jittered by up to `jitter_ms` on each call. A server-supplied retry hint can
/// override the computed delay for a single call via [`ExponentialBackoff::next_duration_with_hint`].
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter_ms: u64,
    immediate_first: bool,
    current: Duration,
    calls: u32,
}

impl ExponentialBackoff {
    /// Constructs a new backoff policy.
    ///
    /// # Errors
    ///
    /// Returns [`BackoffError::InvalidFactor`] if `factor` is outside
    /// `[1.0, 100.0]`, or [`BackoffError::MaxBelowInitial`] if `max < initial`.
    pub fn new(
        initial: Duration,
        max: Duration,
        factor: f64,
        jitter_ms: u64,
        immediate_first: bool,
    ) -> Result<Self, BackoffError> {
        if !(1.0..=100.0).contains(&factor) {
            return Err(BackoffError::InvalidFactor(factor.to_string()));
        }
        if max < initial {
            return Err(BackoffError::MaxBelowInitial { initial, max });
        }
        Ok(Self {
            initial,
            max,
            factor,
            jitter_ms,
            immediate_first,
            current: initial,
            calls: 0,
        })
    }

    /// The current base delay (before jitter), without advancing state.
    #[must_use]
    pub fn current_delay(&self) -> Duration {
        self.current
    }

    fn jitter(&self, base: Duration) -> Duration {
        if self.jitter_ms == 0 {
            return base;
        }
        let jitter = rand::rng().random_range(0..=self.jitter_ms);
        base + Duration::from_millis(jitter)
    }

    /// Returns the next delay and advances internal state.
    ///
    /// When `immediate_first` is set, the very first call after construction or
    /// [`reset`](Self::reset) returns [`Duration::ZERO`] without advancing the
    /// exponential progression.
    pub fn next_duration(&mut self) -> Duration {
        if self.immediate_first && self.calls == 0 {
            self.calls += 1;
            return Duration::ZERO;
        }
        let base = self.current;
        let delay = self.jitter(base);
        self.calls += 1;
        let next = Duration::from_secs_f64((self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()));
        self.current = next.max(self.initial).min(self.max);
        delay
    }

    /// Returns the next delay, honoring a server-supplied retry hint when it
    /// does not exceed `max`. The hint still advances internal state as
    /// [`next_duration`](Self::next_duration) would, but the returned delay is
    /// overridden by the hint (with jitter applied) when present and in range.
    pub fn next_duration_with_hint(&mut self, hint: Option<Duration>) -> Duration {
        let computed = self.next_duration();
        match hint {
            Some(h) if h <= self.max => self.jitter(h),
            _ => computed,
        }
    }

    /// Resets the backoff to its initial state.
    pub fn reset(&mut self) {
        self.current = self.initial;
        self.calls = 0;
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1.0, true)]
    #[case(1.1, true)]
    #[case(100.0, true)]
    #[case(0.0, false)]
    #[case(0.99, false)]
    #[case(100.1, false)]
    fn factor_bounds_are_enforced(#[case] factor: f64, #[case] expected_ok: bool) {
        let result = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(1), factor, 0, false);
        assert_eq!(result.is_ok(), expected_ok);
    }

    #[test]
    fn immediate_first_returns_zero_once() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1), 2.0, 0, true).unwrap();
        assert_eq!(backoff.next_duration(), Duration::ZERO);
        assert!(backoff.next_duration() >= Duration::from_millis(100));
    }

    #[test]
    fn grows_exponentially_and_clamps_to_max() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(500), 2.0, 0, false).unwrap();
        let d1 = backoff.next_duration();
        let d2 = backoff.next_duration();
        let d3 = backoff.next_duration();
        assert_eq!(d1, Duration::from_millis(100));
        assert_eq!(d2, Duration::from_millis(200));
        assert_eq!(d3, Duration::from_millis(400));
        let d4 = backoff.next_duration();
        assert_eq!(d4, Duration::from_millis(500));
        let d5 = backoff.next_duration();
        assert_eq!(d5, Duration::from_millis(500));
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1), 2.0, 0, false).unwrap();
        backoff.next_duration();
        backoff.next_duration();
        assert_ne!(backoff.current_delay(), Duration::from_millis(100));
        backoff.reset();
        assert_eq!(backoff.current_delay(), Duration::from_millis(100));
    }

    #[test]
    fn retry_after_hint_within_max_overrides_computed_delay() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10), 2.0, 0, false).unwrap();
        let delay = backoff.next_duration_with_hint(Some(Duration::from_secs(2)));
        assert_eq!(delay, Duration::from_secs(2));
    }

    #[test]
    fn retry_after_hint_exceeding_max_falls_back_to_computed() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(1), 2.0, 0, false).unwrap();
        let delay = backoff.next_duration_with_hint(Some(Duration::from_secs(10)));
        assert_eq!(delay, Duration::from_millis(100));
    }
}
