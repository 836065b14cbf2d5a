//! Error taxonomy for the scrape orchestrator and its extractors.

use thiserror::Error;
use yfin_network::{FatalKind, RetryableKind};

/// Errors raised while extracting a typed DTO out of a raw response body.
///
/// Extraction errors never carry retry semantics; a malformed payload will
/// not be fixed by retrying the same request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// A required field was absent from the payload.
    #[error("missing field '{0}'")]
    MissingField(String),
    /// A field existed but had an unexpected shape or type.
    #[error("schema drift on field '{field}': {detail}")]
    SchemaDrift {
        /// The field whose shape no longer matches the extractor's expectations.
        field: String,
        /// What about the field's shape was unexpected.
        detail: String,
    },
    /// The payload was not valid JSON, or was valid JSON of the wrong top-level shape.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

/// Errors surfaced by the scrape orchestrator for a single logical fetch.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The robots/ToS policy gate denied the request.
    #[error("robots policy denied: {0}")]
    RobotsDenied(String),
    /// The circuit for the target host is open.
    #[error("circuit open for this host")]
    CircuitOpen,
    /// The operation was cancelled before completing.
    #[error("cancelled")]
    Cancelled,
    /// The transport exhausted its retry budget without succeeding.
    #[error("retries exhausted: {0:?}")]
    RetriesExhausted(RetryableKind),
    /// The transport classified the response as non-retryable.
    #[error("fatal transport response: {0:?}")]
    Fatal(FatalKind),
    /// Extraction of a typed DTO from the response body failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// No extractor is registered for the requested endpoint.
    #[error("no extractor registered for endpoint '{0}'")]
    UnknownEndpoint(String),
    /// The constructed request URL was invalid.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}
