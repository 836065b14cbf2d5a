//! Cookie-isolated session pool with round-robin dispensing and self-healing.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use reqwest::cookie::Jar;
use yfin_core::{
    cancellation::{CancellationToken, WaitOutcome},
    clock::{Clock, MonotonicClock},
    consts::YFIN_DEFAULT_USER_AGENT,
};

/// Configuration for a [`SessionPool`].
#[derive(Debug, Clone)]
pub struct SessionPoolConfig {
    /// Number of sessions held in the ring.
    pub size: usize,
    /// Consecutive failures before a session is quarantined.
    pub eject_after: usize,
    /// How long a quarantined session waits before being replaced.
    pub recreate_cooldown: Duration,
    /// How often `next()` polls while every session is quarantined.
    pub poll_interval: Duration,
    /// The user-agent string assigned to every session.
    pub user_agent: String,
}

impl Default for SessionPoolConfig {
    fn default() -> Self {
        Self {
            size: 4,
            eject_after: 3,
            recreate_cooldown: Duration::from_secs(60),
            poll_interval: Duration::from_millis(50),
            user_agent: YFIN_DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Errors produced dispensing a session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionPoolError {
    /// The caller's cancellation token fired before a session became available.
    #[error("cancelled while waiting for an available session")]
    Cancelled,
}

/// A single isolated session: one cookie jar, one stable identity.
#[derive(Debug)]
pub struct Session {
    id: usize,
    jar: Arc<Jar>,
    user_agent: String,
    consecutive_failures: AtomicUsize,
    quarantined: AtomicBool,
    quarantined_at_millis: AtomicU64,
}

impl Session {
    fn fresh(id: usize, user_agent: &str) -> Self {
        Self {
            id,
            jar: Arc::new(Jar::default()),
            user_agent: user_agent.to_string(),
            consecutive_failures: AtomicUsize::new(0),
            quarantined: AtomicBool::new(false),
            quarantined_at_millis: AtomicU64::new(0),
        }
    }

    /// The session's stable identity within the pool.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// The session's isolated cookie jar.
    #[must_use]
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    /// The session's user-agent string.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    fn is_quarantined(&self) -> bool {
        self.quarantined.load(Ordering::SeqCst)
    }
}

/// A fixed-size ring of [`Session`]s, dispensed round-robin, health-tracked,
/// and lazily replaced after quarantine.
pub struct SessionPool {
    slots: Vec<Mutex<Arc<Session>>>,
    cursor: AtomicUsize,
    config: SessionPoolConfig,
    clock: Arc<dyn Clock>,
}

impl SessionPool {
    /// Creates a pool of `config.size` fresh sessions.
    #[must_use]
    pub fn new(config: SessionPoolConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::default()))
    }

    /// Creates a pool with an injected clock, for deterministic tests.
    #[must_use]
    pub fn with_clock(config: SessionPoolConfig, clock: Arc<dyn Clock>) -> Self {
        let slots = (0..config.size)
            .map(|id| Mutex::new(Arc::new(Session::fresh(id, &config.user_agent))))
            .collect();
        Self { slots, cursor: AtomicUsize::new(0), config, clock }
    }

    fn try_dispense(&self) -> Option<Arc<Session>> {
        let n = self.slots.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % n;
        let now = self.clock.now_millis();
        for offset in 0..n {
            let idx = (start + offset) % n;
            let mut slot = self.slots[idx].lock().unwrap();
            if slot.is_quarantined() {
                let quarantined_at = slot.quarantined_at_millis.load(Ordering::SeqCst);
                if now.saturating_sub(quarantined_at) >= self.config.recreate_cooldown.as_millis() as u64 {
                    *slot = Arc::new(Session::fresh(idx, &self.config.user_agent));
                    return Some(slot.clone());
                }
            } else {
                return Some(slot.clone());
            }
        }
        None
    }

    /// Dispenses the next healthy session, blocking (cancellably) if every
    /// session is currently quarantined and no replacement is ready yet.
    ///
    /// # Errors
    ///
    /// Returns [`SessionPoolError::Cancelled`] if `token` fires first.
    pub async fn next(&self, token: &CancellationToken) -> Result<Arc<Session>, SessionPoolError> {
        loop {
            if let Some(session) = self.try_dispense() {
                return Ok(session);
            }
            if yfin_core::cancellation::sleep_or_cancelled(self.config.poll_interval, token).await
                == WaitOutcome::Cancelled
            {
                return Err(SessionPoolError::Cancelled);
            }
        }
    }

    /// Records the outcome of a request bound to `session`, updating its
    /// health and quarantining it once `eject_after` consecutive failures
    /// accrue.
    pub fn record_outcome(&self, session: &Session, success: bool) {
        if success {
            session.consecutive_failures.store(0, Ordering::SeqCst);
            return;
        }
        let failures = session.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.config.eject_after && !session.quarantined.swap(true, Ordering::SeqCst) {
            session.quarantined_at_millis.store(self.clock.now_millis(), Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionPoolConfig {
        SessionPoolConfig {
            size: 3,
            eject_after: 1,
            recreate_cooldown: Duration::from_millis(100),
            poll_interval: Duration::from_millis(5),
            user_agent: "test-agent".to_string(),
        }
    }

    #[tokio::test]
    async fn dispenses_round_robin() {
        let pool = SessionPool::new(config());
        let token = CancellationToken::new();
        let a = pool.next(&token).await.unwrap();
        let b = pool.next(&token).await.unwrap();
        let c = pool.next(&token).await.unwrap();
        assert_eq!([a.id(), b.id(), c.id()], [0, 1, 2]);
    }

    #[tokio::test]
    async fn cookies_are_isolated_between_sessions() {
        let pool = SessionPool::new(config());
        let token = CancellationToken::new();
        let a = pool.next(&token).await.unwrap();
        let b = pool.next(&token).await.unwrap();
        assert!(!Arc::ptr_eq(&a.cookie_jar(), &b.cookie_jar()));
    }

    #[tokio::test]
    async fn quarantines_after_eject_threshold() {
        let clock = Arc::new(yfin_core::clock::ManualClock::new());
        let pool = SessionPool::with_clock(config(), clock.clone());
        let token = CancellationToken::new();
        let s0 = pool.next(&token).await.unwrap();
        pool.record_outcome(&s0, false);
        let s1 = pool.next(&token).await.unwrap();
        let s2 = pool.next(&token).await.unwrap();
        assert_ne!(s1.id(), 0);
        assert_ne!(s2.id(), 0);
    }

    #[tokio::test]
    async fn replaces_quarantined_session_after_cooldown() {
        let clock = Arc::new(yfin_core::clock::ManualClock::new());
        let pool = SessionPool::with_clock(config(), clock.clone());
        let token = CancellationToken::new();
        let s0 = pool.next(&token).await.unwrap();
        pool.record_outcome(&s0, false);
        let old_jar = s0.cookie_jar();
        clock.advance(Duration::from_millis(150));
        // spin through the ring until slot 0 is dispensed again
        let mut replacement = None;
        for _ in 0..6 {
            let s = pool.next(&token).await.unwrap();
            if s.id() == 0 {
                replacement = Some(s);
                break;
            }
        }
        let replacement = replacement.expect("slot 0 should become dispensable again");
        assert!(!Arc::ptr_eq(&replacement.cookie_jar(), &old_jar));
    }
}
