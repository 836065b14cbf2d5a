//! The resilient HTTP client: composes the rate limiter, circuit breaker,
//! session pool, and backoff policy around a single logical fetch.

use std::{
    num::NonZeroU32,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use dashmap::DashMap;
use reqwest::{Client, redirect::Policy};
use tracing::{debug, warn};
use url::Url;
use yfin_core::cancellation::{CancellationToken, WaitOutcome};

use crate::{
    backoff::ExponentialBackoff,
    breaker::{CircuitBreaker, CircuitBreakerConfig},
    outcome::{ClassifiedStatus, FatalKind, FetchMeta, Outcome, RetryableKind, classify_status},
    ratelimiter::{RateLimiter, quota::Quota},
    session::{SessionPool, SessionPoolConfig},
};

/// A normalized request authority: scheme + host + port. The unit of identity
/// for per-host limiters, breakers, and logging.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostKey(String);

impl HostKey {
    /// Derives a [`HostKey`] from a URL's scheme, host, and port.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        let scheme = url.scheme();
        let host = url.host_str().unwrap_or("");
        match url.port() {
            Some(port) => Self(format!("{scheme}://{host}:{port}")),
            None => Self(format!("{scheme}://{host}")),
        }
    }
}

impl std::fmt::Display for HostKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for an [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-attempt request deadline.
    pub timeout: Duration,
    /// Maximum attempts per logical request (`1` disables retrying).
    pub max_attempts: u32,
    /// Initial backoff delay.
    pub backoff_base: Duration,
    /// Maximum backoff delay.
    pub backoff_max: Duration,
    /// Backoff growth factor.
    pub backoff_factor: f64,
    /// Maximum jitter applied to a computed delay.
    pub backoff_jitter_ms: u64,
    /// Requests per second admitted per host.
    pub qps: f64,
    /// Burst capacity per host.
    pub burst: u32,
    /// Circuit breaker configuration, shared across hosts.
    pub breaker: CircuitBreakerConfig,
    /// Session pool configuration.
    pub session_pool: SessionPoolConfig,
    /// Maximum redirects followed before treating the response as fatal.
    pub redirect_cap: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            backoff_base: Duration::from_millis(200),
            backoff_max: Duration::from_secs(10),
            backoff_factor: 2.0,
            backoff_jitter_ms: 100,
            qps: 2.0,
            burst: 4,
            breaker: CircuitBreakerConfig::default(),
            session_pool: SessionPoolConfig::default(),
            redirect_cap: 5,
        }
    }
}

/// A rate-limited, circuit-broken, session-rotating HTTP client.
pub struct HttpClient {
    config: HttpClientConfig,
    limiter: RateLimiter<HostKey>,
    breakers: DashMap<HostKey, Arc<CircuitBreaker>>,
    sessions: SessionPool,
}

impl HttpClient {
    /// Builds a client from `config`.
    #[must_use]
    pub fn new(config: HttpClientConfig) -> Self {
        let default_quota = NonZeroU32::new(config.burst.max(1))
            .map(|burst| Quota::per_second(NonZeroU32::new(config.qps.max(1.0) as u32).unwrap_or(burst)).allow_burst(burst));
        Self {
            limiter: RateLimiter::new_with_quota(default_quota, vec![]),
            breakers: DashMap::new(),
            sessions: SessionPool::new(config.session_pool.clone()),
            config,
        }
    }

    fn breaker_for(&self, host: &HostKey) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(host.clone())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config.breaker)))
            .clone()
    }

    fn build_reqwest_client(
        &self,
        session: &crate::session::Session,
        redirect_count: Arc<AtomicUsize>,
    ) -> Result<Client, reqwest::Error> {
        let cap = self.config.redirect_cap;
        let policy = Policy::custom(move |attempt| {
            let hops = redirect_count.fetch_add(1, Ordering::SeqCst) + 1;
            if hops > cap { attempt.error("redirect cap exceeded") } else { attempt.follow() }
        });
        Client::builder()
            .cookie_provider(session.cookie_jar())
            .user_agent(session.user_agent())
            .timeout(self.config.timeout)
            .redirect(policy)
            .build()
    }

    /// Executes a single logical GET request against `url`, retrying
    /// transient failures up to `config.max_attempts` times.
    pub async fn fetch(&self, url: &Url, token: &CancellationToken) -> Outcome {
        let host = HostKey::from_url(url);
        let breaker = self.breaker_for(&host);
        let mut backoff = match ExponentialBackoff::new(
            self.config.backoff_base,
            self.config.backoff_max,
            self.config.backoff_factor,
            self.config.backoff_jitter_ms,
            false,
        ) {
            Ok(b) => b,
            Err(err) => {
                warn!(error = %err, "invalid backoff configuration");
                return Outcome::Fatal(FatalKind::ClientConfig);
            }
        };

        for attempt in 0..self.config.max_attempts {
            if !breaker.allow() {
                debug!(host = %host, "circuit open, denying attempt");
                return Outcome::CircuitOpen;
            }

            if self.limiter.acquire(&host, token).await.map(|o| o == WaitOutcome::Cancelled).unwrap_or(false) {
                return Outcome::Cancelled;
            }

            let session = match self.sessions.next(token).await {
                Ok(s) => s,
                Err(_) => return Outcome::Cancelled,
            };

            let started = std::time::Instant::now();
            let outcome = self.execute_once(url, &host, &session).await;
            let duration = started.elapsed();

            match outcome {
                Ok((status, body, final_url, gzip, retry_after_hint, redirects)) => {
                    let meta = FetchMeta {
                        host: host.to_string(),
                        final_url,
                        status,
                        bytes: body.len(),
                        gzip,
                        redirects,
                        duration,
                        session_id: session.id(),
                    };
                    match classify_status(status, retry_after_hint) {
                        ClassifiedStatus::Success => {
                            breaker.record(true);
                            self.sessions.record_outcome(&session, true);
                            return Outcome::Success { body, meta };
                        }
                        ClassifiedStatus::Fatal(kind) => {
                            breaker.record(false);
                            self.sessions.record_outcome(&session, false);
                            return Outcome::Fatal(kind);
                        }
                        ClassifiedStatus::Retryable(kind, retry_after) => {
                            breaker.record(false);
                            self.sessions.record_outcome(&session, false);
                            if attempt + 1 >= self.config.max_attempts {
                                return Outcome::Retryable { kind, retry_after };
                            }
                            let delay = backoff.next_duration_with_hint(retry_after);
                            if yfin_core::cancellation::sleep_or_cancelled(delay, token).await
                                == WaitOutcome::Cancelled
                            {
                                return Outcome::Cancelled;
                            }
                        }
                    }
                }
                Err(ExecuteError::RedirectCapExceeded) => {
                    breaker.record(false);
                    self.sessions.record_outcome(&session, false);
                    return Outcome::Fatal(FatalKind::Decode);
                }
                Err(ExecuteError::Retryable(kind)) => {
                    breaker.record(false);
                    self.sessions.record_outcome(&session, false);
                    if attempt + 1 >= self.config.max_attempts {
                        return Outcome::Retryable { kind, retry_after: None };
                    }
                    let delay = backoff.next_duration();
                    if yfin_core::cancellation::sleep_or_cancelled(delay, token).await == WaitOutcome::Cancelled {
                        return Outcome::Cancelled;
                    }
                }
            }
        }
        Outcome::Retryable { kind: RetryableKind::Transport, retry_after: None }
    }

    async fn execute_once(
        &self,
        url: &Url,
        host: &HostKey,
        session: &crate::session::Session,
    ) -> Result<(u16, Bytes, String, bool, Option<Duration>, u32), ExecuteError> {
        let redirect_count = Arc::new(AtomicUsize::new(0));
        let client =
            self.build_reqwest_client(session, redirect_count.clone()).map_err(|_| ExecuteError::Retryable(RetryableKind::Transport))?;
        debug!(host = %host, session_id = session.id(), "sending request");
        let response = client.get(url.clone()).send().await.map_err(|err| {
            if err.is_redirect() {
                ExecuteError::RedirectCapExceeded
            } else if err.is_timeout() {
                ExecuteError::Retryable(RetryableKind::Timeout)
            } else {
                ExecuteError::Retryable(RetryableKind::Transport)
            }
        })?;
        let status = response.status().as_u16();
        let gzip = response
            .headers()
            .get(reqwest::header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("gzip"));
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let final_url = response.url().to_string();
        let redirects = redirect_count.load(Ordering::SeqCst) as u32;
        let body = response.bytes().await.map_err(|_| ExecuteError::Retryable(RetryableKind::Transport))?;
        Ok((status, body, final_url, gzip, retry_after, redirects))
    }
}

/// The outcome of a single wire-level attempt, before retry/breaker policy is applied.
enum ExecuteError {
    /// A transient failure the caller may retry.
    Retryable(RetryableKind),
    /// The response chain exceeded the configured redirect cap.
    RedirectCapExceeded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_includes_explicit_port() {
        let url = Url::parse("https://example.com:8443/path").unwrap();
        assert_eq!(HostKey::from_url(&url).to_string(), "https://example.com:8443");
    }

    #[test]
    fn host_key_omits_default_port() {
        let url = Url::parse("https://example.com/path").unwrap();
        assert_eq!(HostKey::from_url(&url).to_string(), "https://example.com");
    }
}
