//! Rolling-window circuit breaker.
//!
//! Three states — closed, open, half-open — tracked as an atomic `u8` so
//! `allow()` never takes a lock on the hot path. State transitions are lazy:
//! open-to-half-open happens on the first `allow()` call after `reset_timeout`
//! has elapsed, not on a background timer.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering},
    },
    time::Duration,
};

use yfin_core::clock::{Clock, MonotonicClock};

const STATE_CLOSED: u8 = 0;
const STATE_OPEN: u8 = 1;
const STATE_HALF_OPEN: u8 = 2;

/// Configuration for a [`CircuitBreaker`].
#[derive(Debug, Clone, Copy)]
pub struct CircuitBreakerConfig {
    /// Length of the rolling sample window.
    pub window: Duration,
    /// Failure ratio at or above which the breaker opens.
    pub failure_threshold: f64,
    /// Minimum number of samples in the window before the ratio is evaluated.
    pub min_samples: usize,
    /// How long the breaker stays open before admitting a half-open probe.
    pub reset_timeout: Duration,
    /// Consecutive successful half-open probes required to close the breaker.
    pub half_open_successes_required: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(10),
            failure_threshold: 0.6,
            min_samples: 5,
            reset_timeout: Duration::from_secs(30),
            half_open_successes_required: 2,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at_millis: u64,
    failed: bool,
}

struct Window {
    samples: VecDeque<Sample>,
}

impl Window {
    fn new() -> Self {
        Self { samples: VecDeque::new() }
    }

    fn push(&mut self, now: u64, window: Duration, failed: bool) {
        self.evict(now, window);
        self.samples.push_back(Sample { at_millis: now, failed });
    }

    fn evict(&mut self, now: u64, window: Duration) {
        let window_millis = window.as_millis() as u64;
        while let Some(front) = self.samples.front() {
            if now.saturating_sub(front.at_millis) > window_millis {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn ratio(&self, now: u64, window: Duration) -> (f64, usize) {
        let window_millis = window.as_millis() as u64;
        let mut failures = 0usize;
        let mut total = 0usize;
        for sample in &self.samples {
            if now.saturating_sub(sample.at_millis) <= window_millis {
                total += 1;
                if sample.failed {
                    failures += 1;
                }
            }
        }
        if total == 0 { (0.0, 0) } else { (failures as f64 / total as f64, total) }
    }
}

/// A per-host rolling-window circuit breaker.
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    clock: Arc<dyn Clock>,
    state: AtomicU8,
    opened_at_millis: AtomicU64,
    half_open_inflight: AtomicUsize,
    half_open_successes: AtomicUsize,
    window: Mutex<Window>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("state", &self.state.load(Ordering::SeqCst))
            .finish()
    }
}

/// The breaker's current phase, as observed by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests are admitted normally.
    Closed,
    /// Requests are rejected outright.
    Open,
    /// A limited number of probe requests are admitted to test recovery.
    HalfOpen,
}

impl CircuitBreaker {
    /// Creates a new breaker using the system clock.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::default()))
    }

    /// Creates a new breaker with an injected clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(config: CircuitBreakerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            state: AtomicU8::new(STATE_CLOSED),
            opened_at_millis: AtomicU64::new(0),
            half_open_inflight: AtomicUsize::new(0),
            half_open_successes: AtomicUsize::new(0),
            window: Mutex::new(Window::new()),
        }
    }

    /// The breaker's current observable state.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        match self.state.load(Ordering::SeqCst) {
            STATE_OPEN => CircuitState::Open,
            STATE_HALF_OPEN => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    /// Decides whether a request may proceed right now.
    ///
    /// In the open state, lazily transitions to half-open once `reset_timeout`
    /// has elapsed since the breaker opened. In half-open, admits at most one
    /// concurrent probe.
    pub fn allow(&self) -> bool {
        let now = self.clock.now_millis();
        match self.state.load(Ordering::SeqCst) {
            STATE_CLOSED => true,
            STATE_OPEN => {
                let opened_at = self.opened_at_millis.load(Ordering::SeqCst);
                if now.saturating_sub(opened_at) >= self.config.reset_timeout.as_millis() as u64
                    && self
                        .state
                        .compare_exchange(STATE_OPEN, STATE_HALF_OPEN, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                {
                    self.half_open_successes.store(0, Ordering::SeqCst);
                    self.half_open_inflight.store(0, Ordering::SeqCst);
                    self.try_claim_half_open_probe()
                } else {
                    false
                }
            }
            STATE_HALF_OPEN => self.try_claim_half_open_probe(),
            _ => unreachable!("invalid circuit breaker state"),
        }
    }

    fn try_claim_half_open_probe(&self) -> bool {
        self.half_open_inflight
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Records the outcome of a request that [`allow`](Self::allow) admitted.
    pub fn record(&self, success: bool) {
        let now = self.clock.now_millis();
        match self.state.load(Ordering::SeqCst) {
            STATE_HALF_OPEN => {
                self.half_open_inflight.store(0, Ordering::SeqCst);
                if success {
                    let successes = self.half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
                    if successes >= self.config.half_open_successes_required {
                        self.state.store(STATE_CLOSED, Ordering::SeqCst);
                        self.window.lock().unwrap().samples.clear();
                    }
                } else {
                    self.state.store(STATE_OPEN, Ordering::SeqCst);
                    self.opened_at_millis.store(now, Ordering::SeqCst);
                    self.window.lock().unwrap().samples.clear();
                }
            }
            _ => {
                let (ratio, total) = {
                    let mut window = self.window.lock().unwrap();
                    window.push(now, self.config.window, !success);
                    window.ratio(now, self.config.window)
                };
                if total >= self.config.min_samples && ratio >= self.config.failure_threshold {
                    self.state.store(STATE_OPEN, Ordering::SeqCst);
                    self.opened_at_millis.store(now, Ordering::SeqCst);
                }
            }
        }
    }
}
