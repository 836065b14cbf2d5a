//! Request outcomes and fetch metadata.

use std::time::Duration;

use bytes::Bytes;

/// Transient failure kinds: retried locally by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableKind {
    /// HTTP 429.
    TooManyRequests,
    /// HTTP 5xx.
    ServerUnavailable,
    /// A lower-level transport error (connect, read, DNS).
    Transport,
    /// The request deadline elapsed.
    Timeout,
}

/// Fatal-for-request failure kinds: surfaced immediately, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalKind {
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    Forbidden,
    /// HTTP 404.
    NotFound,
    /// HTTP 422.
    Unprocessable,
    /// Response body could not be decoded, or the redirect cap was exceeded.
    Decode,
    /// The client was misconfigured (e.g. an invalid URL).
    ClientConfig,
}

/// Metadata describing a completed attempt.
#[derive(Debug, Clone)]
pub struct FetchMeta {
    /// The normalized host the request was sent to.
    pub host: String,
    /// The final URL after following redirects.
    pub final_url: String,
    /// The HTTP status code.
    pub status: u16,
    /// The number of body bytes received.
    pub bytes: usize,
    /// Whether the response was gzip-encoded on the wire.
    pub gzip: bool,
    /// The number of redirects followed.
    pub redirects: u32,
    /// Wall-clock duration of the attempt.
    pub duration: Duration,
    /// The id of the session the attempt was bound to.
    pub session_id: usize,
}

/// The result of a single logical fetch.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The request succeeded.
    Success {
        /// Response body.
        body: Bytes,
        /// Attempt metadata.
        meta: FetchMeta,
    },
    /// A transient failure; the client may retry.
    Retryable {
        /// The kind of transient failure.
        kind: RetryableKind,
        /// A server-supplied retry hint, if any.
        retry_after: Option<Duration>,
    },
    /// A fatal failure; the client will not retry.
    Fatal(FatalKind),
    /// The circuit breaker denied the request outright.
    CircuitOpen,
    /// The caller's cancellation token fired before completion.
    Cancelled,
}

/// Classifies an HTTP status code into an [`Outcome`] shape, independent of
/// the response body.
#[must_use]
pub fn classify_status(status: u16, retry_after: Option<Duration>) -> ClassifiedStatus {
    match status {
        200..=299 => ClassifiedStatus::Success,
        400 => ClassifiedStatus::Fatal(FatalKind::BadRequest),
        401 => ClassifiedStatus::Fatal(FatalKind::Unauthorized),
        403 => ClassifiedStatus::Fatal(FatalKind::Forbidden),
        404 => ClassifiedStatus::Fatal(FatalKind::NotFound),
        422 => ClassifiedStatus::Fatal(FatalKind::Unprocessable),
        429 => ClassifiedStatus::Retryable(RetryableKind::TooManyRequests, retry_after),
        500..=599 => ClassifiedStatus::Retryable(RetryableKind::ServerUnavailable, retry_after),
        _ => ClassifiedStatus::Fatal(FatalKind::Decode),
    }
}

/// The classification of an HTTP status code, before a body has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedStatus {
    /// 2xx.
    Success,
    /// Transient, with an optional retry hint.
    Retryable(RetryableKind, Option<Duration>),
    /// Terminal for this request.
    Fatal(FatalKind),
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(200, ClassifiedStatus::Success)]
    #[case(201, ClassifiedStatus::Success)]
    #[case(400, ClassifiedStatus::Fatal(FatalKind::BadRequest))]
    #[case(401, ClassifiedStatus::Fatal(FatalKind::Unauthorized))]
    #[case(403, ClassifiedStatus::Fatal(FatalKind::Forbidden))]
    #[case(404, ClassifiedStatus::Fatal(FatalKind::NotFound))]
    #[case(422, ClassifiedStatus::Fatal(FatalKind::Unprocessable))]
    #[case(429, ClassifiedStatus::Retryable(RetryableKind::TooManyRequests, None))]
    #[case(500, ClassifiedStatus::Retryable(RetryableKind::ServerUnavailable, None))]
    #[case(503, ClassifiedStatus::Retryable(RetryableKind::ServerUnavailable, None))]
    #[case(999, ClassifiedStatus::Fatal(FatalKind::Decode))]
    fn classifies_status_codes(#[case] status: u16, #[case] expected: ClassifiedStatus) {
        assert_eq!(classify_status(status, None), expected);
    }
}
