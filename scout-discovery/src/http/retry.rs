//! Retry with exponential backoff for outbound HTTP calls
//!
//! **Algorithm:**
//! 1. Attempt the operation
//! 2. On success, return the result
//! 3. On a transient failure with attempts remaining: log WARN, back off, retry
//! 4. On any other failure, or once attempts are exhausted: return the error
//!
//! **Backoff:** `base_delay * 2^(attempt-1)` plus 0-100ms of jitter.

use super::{sleep_or_cancel, HttpError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY_MS: u64 = 2000;
const JITTER_MAX_MS: u64 = 100;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        let jitter = rand::thread_rng().gen_range(0..JITTER_MAX_MS);
        backoff + Duration::from_millis(jitter)
    }

    /// Run `operation` until it succeeds, fails permanently, or attempts run out
    ///
    /// Cancellation aborts both an in-flight attempt and a pending backoff wait.
    pub async fn execute<F, Fut, T>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, HttpError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HttpError>>,
    {
        let mut attempt = 0;

        loop {
            attempt += 1;

            if cancel.is_cancelled() {
                return Err(HttpError::Cancelled);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(HttpError::Cancelled),
                result = operation() => result,
            };

            let err = match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(operation = label, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if !err.is_transient() || attempt >= self.max_attempts {
                return Err(err);
            }

            let delay = self.backoff_delay(attempt);
            tracing::warn!(
                operation = label,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Transient network error, retrying"
            );

            sleep_or_cancel(delay, cancel).await?;
        }
    }
}
