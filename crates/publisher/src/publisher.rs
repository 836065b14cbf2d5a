//! The publisher: builds envelopes for a canonical record and drives them
//! through a transport with per-attempt circuit breaking and backoff,
//! dead-lettering whatever exhausts its retry budget.

use std::{sync::Arc, time::Duration};

use thiserror::Error;
use yfin_core::cancellation::{CancellationToken, WaitOutcome, sleep_or_cancelled};
use yfin_model::CanonicalRecord;
use yfin_network::{CircuitBreaker, CircuitBreakerConfig, ExponentialBackoff};

use crate::{
    dlq::DlqSink,
    envelope::{EnvelopeError, build_envelopes},
    transport::{PublishTransport, TransportError},
};

/// Configuration for a [`Publisher`].
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Maximum payload bytes per envelope before chunking.
    pub max_chunk_bytes: usize,
    /// Maximum publish attempts per envelope.
    pub max_attempts: u32,
    /// Initial backoff delay between attempts.
    pub backoff_base: Duration,
    /// Maximum backoff delay between attempts.
    pub backoff_max: Duration,
    /// Backoff growth factor.
    pub backoff_factor: f64,
    /// Maximum jitter applied to a computed delay.
    pub backoff_jitter_ms: u64,
    /// Circuit breaker configuration guarding the transport.
    pub breaker: CircuitBreakerConfig,
    /// When `true`, envelopes are built and measured but never transmitted.
    pub preview: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 1 << 20,
            max_attempts: 3,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_secs(5),
            backoff_factor: 2.0,
            backoff_jitter_ms: 50,
            breaker: CircuitBreakerConfig::default(),
            preview: false,
        }
    }
}

/// Errors raised while publishing a canonical record.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The record could not be serialized into envelopes.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    /// The transport's circuit is open; the envelope was dead-lettered.
    #[error("circuit open, envelope dead-lettered")]
    CircuitOpen,
    /// The publish was cancelled before completing.
    #[error("cancelled")]
    Cancelled,
    /// The retry budget was exhausted; the envelope was dead-lettered.
    #[error("retries exhausted: {0}")]
    Exhausted(TransportError),
    /// The backoff policy itself was misconfigured.
    #[error("invalid backoff configuration: {0}")]
    InvalidBackoff(String),
}

/// Outcome of a successful (possibly preview) publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Number of chunks the record was split into.
    pub chunks: usize,
    /// Total serialized payload bytes across all chunks.
    pub bytes: usize,
    /// `true` if this report describes a preview (no transmission occurred).
    pub previewed: bool,
}

/// Publishes canonical records: builds envelopes, then drives each chunk
/// through the transport in order, retrying transient failures and
/// dead-lettering exhausted ones.
pub struct Publisher {
    config: PublisherConfig,
    transport: Arc<dyn PublishTransport>,
    dlq: Arc<dyn DlqSink>,
    breaker: CircuitBreaker,
}

impl Publisher {
    /// Builds a publisher from its collaborators.
    #[must_use]
    pub fn new(config: PublisherConfig, transport: Arc<dyn PublishTransport>, dlq: Arc<dyn DlqSink>) -> Self {
        let breaker = CircuitBreaker::new(config.breaker);
        Self { config, transport, dlq, breaker }
    }

    /// Builds envelopes for `record` and publishes them in chunk order.
    /// Partial delivery can occur: earlier chunks may have been transmitted
    /// before a later chunk exhausts its retry budget and is dead-lettered.
    pub async fn publish_record(
        &self,
        record: &CanonicalRecord,
        topic: impl Into<String>,
        trace_id: Option<String>,
        token: &CancellationToken,
    ) -> Result<PublishReport, PublishError> {
        let envelopes = build_envelopes(record, topic, trace_id, self.config.max_chunk_bytes)?;
        let total_bytes: usize = envelopes.iter().map(crate::envelope::Envelope::payload_len).sum();

        if self.config.preview {
            return Ok(PublishReport { chunks: envelopes.len(), bytes: total_bytes, previewed: true });
        }

        for envelope in &envelopes {
            self.publish_one(envelope, token).await?;
        }
        Ok(PublishReport { chunks: envelopes.len(), bytes: total_bytes, previewed: false })
    }

    async fn publish_one(&self, envelope: &crate::envelope::Envelope, token: &CancellationToken) -> Result<(), PublishError> {
        let mut backoff = ExponentialBackoff::new(
            self.config.backoff_base,
            self.config.backoff_max,
            self.config.backoff_factor,
            self.config.backoff_jitter_ms,
            false,
        )
        .map_err(|err| PublishError::InvalidBackoff(err.to_string()))?;

        for attempt in 0..self.config.max_attempts {
            if !self.breaker.allow() {
                self.dlq.send(envelope.clone(), "circuit open".to_string()).await;
                return Err(PublishError::CircuitOpen);
            }

            match self.transport.publish(envelope).await {
                Ok(()) => {
                    self.breaker.record(true);
                    return Ok(());
                }
                Err(err) => {
                    self.breaker.record(false);
                    if attempt + 1 >= self.config.max_attempts {
                        self.dlq.send(envelope.clone(), err.to_string()).await;
                        return Err(PublishError::Exhausted(err));
                    }
                    let delay = backoff.next_duration();
                    if sleep_or_cancelled(delay, token).await == WaitOutcome::Cancelled {
                        return Err(PublishError::Cancelled);
                    }
                }
            }
        }
        unreachable!("loop always returns before exhausting max_attempts iterations")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use yfin_model::{Bar, Meta, Mic, Scaled, Security};

    use super::*;
    use crate::{dlq::InMemoryDlq, transport::InMemoryTransport};

    fn sample_record() -> CanonicalRecord {
        CanonicalRecord::Bars {
            security: Security::new("AAPL", Mic::empty()),
            bars: vec![Bar {
                event_time: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
                open: Scaled::new(1, 0).unwrap(),
                high: Scaled::new(1, 0).unwrap(),
                low: Scaled::new(1, 0).unwrap(),
                close: Scaled::new(1, 0).unwrap(),
                volume: Scaled::new(1, 0).unwrap(),
            }],
            meta: Meta { run_id: "run-1".into(), source: "yahoo".into(), producer: "yfin".into(), schema_version: 1 },
        }
    }

    #[tokio::test]
    async fn publishes_to_transport() {
        let transport = Arc::new(InMemoryTransport::new());
        let dlq = Arc::new(InMemoryDlq::new());
        let publisher = Publisher::new(PublisherConfig::default(), transport.clone(), dlq.clone());
        let token = CancellationToken::new();

        let report = publisher.publish_record(&sample_record(), "yfin.bars", None, &token).await.unwrap();
        assert!(!report.previewed);
        assert_eq!(transport.sent().len(), report.chunks);
        assert!(dlq.entries().is_empty());
    }

    #[tokio::test]
    async fn preview_mode_never_transmits() {
        let transport = Arc::new(InMemoryTransport::new());
        let dlq = Arc::new(InMemoryDlq::new());
        let config = PublisherConfig { preview: true, ..PublisherConfig::default() };
        let publisher = Publisher::new(config, transport.clone(), dlq.clone());
        let token = CancellationToken::new();

        let report = publisher.publish_record(&sample_record(), "yfin.bars", None, &token).await.unwrap();
        assert!(report.previewed);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn exhausted_retries_dead_letter_the_envelope() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.close().await;
        let dlq = Arc::new(InMemoryDlq::new());
        let config = PublisherConfig {
            max_attempts: 2,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
            backoff_jitter_ms: 0,
            ..PublisherConfig::default()
        };
        let publisher = Publisher::new(config, transport, dlq.clone());
        let token = CancellationToken::new();

        let result = publisher.publish_record(&sample_record(), "yfin.bars", None, &token).await;
        assert!(matches!(result, Err(PublishError::Exhausted(_))));
        assert_eq!(dlq.entries().len(), 1);
    }
}
