//! The publish transport seam: a narrow facade any downstream message bus,
//! queue, or database can sit behind.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use thiserror::Error;

use crate::envelope::Envelope;

/// Errors a [`PublishTransport`] may raise.
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    /// The transport has been closed and no longer accepts publishes.
    #[error("transport is closed")]
    Closed,
    /// The underlying sink rejected or failed to deliver the envelope.
    #[error("transport send failed: {0}")]
    Send(String),
}

/// A generic publish-side facade. The main operation takes a fully built
/// [`Envelope`], leaving wire encoding and destination details to the
/// implementation.
#[async_trait]
pub trait PublishTransport: Send + Sync {
    /// Sends `envelope` to the underlying sink.
    async fn publish(&self, envelope: &Envelope) -> Result<(), TransportError>;
    /// Whether the transport has been closed.
    fn is_closed(&self) -> bool;
    /// Closes the transport; subsequent publishes fail with [`TransportError::Closed`].
    async fn close(&self);
}

/// An in-memory transport that records every published envelope. Useful for
/// tests and for dry runs ahead of wiring a real sink.
#[derive(Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<Envelope>>,
    closed: AtomicBool,
}

impl InMemoryTransport {
    /// Builds an empty, open transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every envelope published so far, in publish order.
    #[must_use]
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.lock().expect("in-memory transport mutex poisoned").clone()
    }
}

#[async_trait]
impl PublishTransport for InMemoryTransport {
    async fn publish(&self, envelope: &Envelope) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.sent.lock().expect("in-memory transport mutex poisoned").push(envelope.clone());
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Release);
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
    async fn publishes_are_recorded_in_order() {
        let transport = InMemoryTransport::new();
        transport.publish(&sample_envelope()).await.unwrap();
        transport.publish(&sample_envelope()).await.unwrap();
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn closed_transport_rejects_publishes() {
        let transport = InMemoryTransport::new();
        transport.close().await;
        assert!(matches!(transport.publish(&sample_envelope()).await, Err(TransportError::Closed)));
    }
}
