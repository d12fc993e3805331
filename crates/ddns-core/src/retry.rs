//! Retry executor
//!
//! The one retry mechanism in the system. Every remote call the engine makes
//! (IP lookup, zone lookup, every record-set call) goes through
//! [`RetryExecutor::execute`]; providers and resolvers never retry on their
//! own.
//!
//! ## Policy
//!
//! - up to `attempts` tries (at least one)
//! - every try bounded by the per-call timeout
//! - after a retryable failure, wait `base_delay`, doubling per failure,
//!   capped at `max_delay`
//! - non-retryable errors end the loop at once
//! - the cancellation token is observed before each try and during each
//!   wait; a call already in flight is never interrupted by it

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Doubling delay sequence capped at a maximum
///
/// `Backoff::new(500ms, 5s)` yields 500ms, 1s, 2s, 4s, 5s, 5s, ...
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a sequence starting at `base` and capped at `max`
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { next: base, max }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        self.next = self.next.saturating_mul(2).min(self.max);
        Some(current)
    }
}

/// Runs fallible async operations under the retry policy
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    attempt_timeout: Duration,
    cancel: CancellationToken,
}

impl RetryExecutor {
    /// Create an executor
    ///
    /// # Parameters
    ///
    /// - `policy`: attempts and backoff bounds
    /// - `attempt_timeout`: deadline for each individual try
    /// - `cancel`: shared cancellation signal
    pub fn new(policy: &RetryConfig, attempt_timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            attempts: policy.attempts.max(1),
            base_delay: policy.base_delay,
            max_delay: policy.max_delay,
            attempt_timeout,
            cancel,
        }
    }

    /// Maximum number of tries per call
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Execute `operation` until it succeeds, fails permanently, runs out of
    /// attempts, or the cancellation token fires.
    ///
    /// `operation` receives the 1-based attempt number. On exhaustion the last
    /// error is returned unchanged; on cancellation the result is
    /// [`Error::Cancelled`] regardless of earlier failures.
    pub async fn execute<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut backoff = Backoff::new(self.base_delay, self.max_delay);
        let mut attempt = 1;

        loop {
            if self.cancel.is_cancelled() {
                debug!(op = label, attempt, "Cancelled before attempt");
                return Err(Error::Cancelled);
            }

            let result = match tokio::time::timeout(self.attempt_timeout, operation(attempt)).await
            {
                Ok(result) => result,
                Err(_) => Err(Error::Timeout(self.attempt_timeout)),
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if err.is_cancelled() {
                return Err(err);
            }

            warn!(op = label, attempt, max_attempts = self.attempts, error = %err, "Operation failed");

            if attempt >= self.attempts || !err.is_retryable() {
                return Err(err);
            }

            let delay = backoff.next().unwrap_or(self.max_delay);
            debug!(op = label, attempt, delay = ?delay, "Waiting before retry");

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(op = label, attempt, "Cancelled during backoff");
                    return Err(Error::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}
