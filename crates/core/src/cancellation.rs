//! Cancellation-aware suspension helpers.
//!
//! Every suspension point in the fetch pipeline (limiter wait, backoff sleep,
//! network I/O) accepts a [`CancellationToken`] so a caller can unwind a logical
//! request without the operation degrading into a detached background task.

use std::time::Duration;

pub use tokio_util::sync::CancellationToken;

/// The outcome of a cancellation-aware wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The wait completed normally.
    Completed,
    /// The token was cancelled before the wait completed.
    Cancelled,
}

/// Sleeps for `duration`, or returns early with [`WaitOutcome::Cancelled`] if
/// `token` is cancelled first.
pub async fn sleep_or_cancelled(duration: Duration, token: &CancellationToken) -> WaitOutcome {
    tokio::select! {
        () = tokio::time::sleep(duration) => WaitOutcome::Completed,
        () = token.cancelled() => WaitOutcome::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_when_not_cancelled() {
        let token = CancellationToken::new();
        let outcome = sleep_or_cancelled(Duration::from_millis(1), &token).await;
        assert_eq!(outcome, WaitOutcome::Completed);
    }

    #[tokio::test]
    async fn cancels_immediately_when_token_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let outcome = sleep_or_cancelled(Duration::from_secs(60), &token).await;
        assert_eq!(outcome, WaitOutcome::Cancelled);
    }
}
