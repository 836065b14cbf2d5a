//! Dead-letter sink: where envelopes go once their publish retry budget is
//! exhausted, so the run can finish without losing the failed record.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::envelope::Envelope;

/// Destination for envelopes that could not be published.
#[async_trait]
pub trait DlqSink: Send + Sync {
    /// Records `envelope` as dead-lettered, with a human-readable `reason`.
    async fn send(&self, envelope: Envelope, reason: String);
}

/// A dead-lettered envelope paired with the reason it was rejected.
#[derive(Debug, Clone)]
pub struct DeadLetter {
    /// The envelope that could not be published.
    pub envelope: Envelope,
    /// Why it was dead-lettered.
    pub reason: String,
}

/// An in-memory [`DlqSink`], for tests and for runs without an external DLQ
/// configured.
#[derive(Default)]
pub struct InMemoryDlq {
    entries: Mutex<Vec<DeadLetter>>,
}

impl InMemoryDlq {
    /// Builds an empty DLQ.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every dead-lettered envelope so far.
    #[must_use]
    pub fn entries(&self) -> Vec<DeadLetter> {
        self.entries.lock().expect("in-memory dlq mutex poisoned").clone()
    }
}

#[async_trait]
impl DlqSink for InMemoryDlq {
    async fn send(&self, envelope: Envelope, reason: String) {
        tracing::warn!(topic = %envelope.topic, partition_key = %envelope.partition_key, reason = %reason, "dead-lettering envelope");
        self.entries.lock().expect("in-memory dlq mutex poisoned").push(DeadLetter { envelope, reason });
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn sample_envelope() -> Envelope {
        Envelope {
            message_id: Uuid::new_v4(),
            topic: "yfin.bars".into(),
            schema: "canonical_record".into(),
            schema_version: 1,
            produced_at: Utc::now(),
            producer: "yfin".into(),
            source: "yahoo".into(),
            run_id: "run-1".into(),
            trace_id: None,
            partition_key: "AAPL".into(),
            payload: bytes::Bytes::from_static(b"{}"),
            chunk_index: 0,
            chunk_count: 1,
        }
    }

    #[tokio::test]
    async fn dead_lettered_envelopes_are_retained() {
        let dlq = InMemoryDlq::new();
        dlq.send(sample_envelope(), "exhausted retries".into()).await;
        let entries = dlq.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, "exhausted retries");
    }
}
