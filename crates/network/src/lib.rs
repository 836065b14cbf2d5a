//! Resilient HTTP transport: a per-host rate limiter, circuit breaker,
//! cookie-isolated session pool, exponential backoff, and the composed
//! [`client::HttpClient`] that ties them together.

pub mod backoff;
pub mod breaker;
pub mod client;
pub mod outcome;
pub mod ratelimiter;
pub mod session;

pub use backoff::ExponentialBackoff;
pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use client::{HostKey, HttpClient, HttpClientConfig};
pub use outcome::{FatalKind, FetchMeta, Outcome, RetryableKind};
pub use ratelimiter::{RateLimiter, quota::Quota};
pub use session::{Session, SessionPool, SessionPoolConfig};
