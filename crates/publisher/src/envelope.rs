//! Envelope construction: wraps a serialized canonical record with routing
//! and provenance metadata, splitting oversized payloads into ordered chunks
//! that share a partition key.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use yfin_model::CanonicalRecord;

/// Errors raised while building an envelope from a canonical record.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The record could not be serialized to its wire representation.
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A single publishable unit: a serialized record chunk plus routing and
/// provenance metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    /// Identifies the logical message; shared across all chunks of one record.
    pub message_id: Uuid,
    /// The publish topic, e.g. `"yfin.bars"`.
    pub topic: String,
    /// Name of the payload schema, e.g. `"canonical_record"`.
    pub schema: String,
    /// Version of the payload schema.
    pub schema_version: u32,
    /// When this envelope was produced, UTC.
    pub produced_at: DateTime<Utc>,
    /// The producing component.
    pub producer: String,
    /// The upstream data source.
    pub source: String,
    /// Identifies the scrape run that produced the underlying record.
    pub run_id: String,
    /// Optional distributed tracing correlation id.
    pub trace_id: Option<String>,
    /// Ordering and co-location key, e.g. `"XNAS.AAPL"`.
    pub partition_key: String,
    /// This chunk's payload bytes.
    pub payload: Bytes,
    /// Zero-based index of this chunk within the logical message.
    pub chunk_index: u32,
    /// Total number of chunks in the logical message.
    pub chunk_count: u32,
}

impl Envelope {
    /// The total encoded size of this envelope's payload, in bytes.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Splits `payload` into contiguous chunks no larger than `max_chunk_bytes`.
/// Always yields at least one chunk, even for an empty payload.
#[must_use]
pub fn chunk_payload(payload: &Bytes, max_chunk_bytes: usize) -> Vec<Bytes> {
    if max_chunk_bytes == 0 || payload.len() <= max_chunk_bytes {
        return vec![payload.clone()];
    }
    payload.chunks(max_chunk_bytes).map(Bytes::copy_from_slice).collect()
}

/// Builds the ordered sequence of envelopes for a canonical record, chunking
/// the serialized payload if it exceeds `max_chunk_bytes`.
pub fn build_envelopes(
    record: &CanonicalRecord,
    topic: impl Into<String>,
    trace_id: Option<String>,
    max_chunk_bytes: usize,
) -> Result<Vec<Envelope>, EnvelopeError> {
    let payload = Bytes::from(serde_json::to_vec(record)?);
    let chunks = chunk_payload(&payload, max_chunk_bytes);
    let message_id = Uuid::new_v4();
    let meta = record.meta();
    let partition_key = record.partition_key();
    let topic = topic.into();
    let chunk_count = chunks.len() as u32;

    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| Envelope {
            message_id,
            topic: topic.clone(),
            schema: "canonical_record".to_string(),
            schema_version: meta.schema_version,
            produced_at: Utc::now(),
            producer: meta.producer.clone(),
            source: meta.source.clone(),
            run_id: meta.run_id.clone(),
            trace_id: trace_id.clone(),
            partition_key: partition_key.clone(),
            payload: chunk,
            chunk_index: index as u32,
            chunk_count,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use yfin_model::{Bar, Meta, Mic, Scaled, Security};

    use super::*;

    fn sample_record() -> CanonicalRecord {
        CanonicalRecord::Bars {
            security: Security::new("AAPL", Mic::empty()),
            bars: vec![Bar {
                event_time: Utc::now(),
                open: Scaled::new(1, 0).unwrap(),
                high: Scaled::new(1, 0).unwrap(),
                low: Scaled::new(1, 0).unwrap(),
                close: Scaled::new(1, 0).unwrap(),
                volume: Scaled::new(1, 0).unwrap(),
            }],
            meta: Meta { run_id: "run-1".into(), source: "yahoo".into(), producer: "yfin".into(), schema_version: 1 },
        }
    }

    #[test]
    fn chunking_splits_oversized_payload() {
        let payload = Bytes::from(vec![7u8; 100]);
        let chunks = chunk_payload(&payload, 30);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), 100);
    }

    #[test]
    fn chunking_is_a_noop_under_the_limit() {
        let payload = Bytes::from(vec![1u8; 10]);
        assert_eq!(chunk_payload(&payload, 1024).len(), 1);
    }

    #[test]
    fn envelopes_share_message_id_and_partition_key() {
        let record = sample_record();
        let envelopes = build_envelopes(&record, "yfin.bars", None, 16).unwrap();
        assert!(envelopes.len() > 1);
        let first_id = envelopes[0].message_id;
        for (i, envelope) in envelopes.iter().enumerate() {
            assert_eq!(envelope.message_id, first_id);
            assert_eq!(envelope.partition_key, "AAPL");
            assert_eq!(envelope.chunk_index, i as u32);
            assert_eq!(envelope.chunk_count, envelopes.len() as u32);
        }
    }
}
