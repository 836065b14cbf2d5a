//! Canonical record publishing: envelope construction and chunking, a
//! transport seam any message bus can implement, retry with circuit
//! breaking, and a dead-letter sink for exhausted envelopes.

pub mod dlq;
pub mod envelope;
pub mod publisher;
pub mod transport;

pub use dlq::{DeadLetter, DlqSink, InMemoryDlq};
pub use envelope::{Envelope, EnvelopeError, build_envelopes, chunk_payload};
pub use publisher::{PublishError, PublishReport, Publisher, PublisherConfig};
pub use transport::{InMemoryTransport, PublishTransport, TransportError};
