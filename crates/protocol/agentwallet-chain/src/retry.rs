//! Retry logic with exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{ChainError, ChainResult};

/// Retry policy with exponential backoff and jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt)
    max_attempts: u32,
    /// Base delay between retries
    base_delay: Duration,
    /// Maximum delay between retries
    max_delay: Duration,
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Create from retry config.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay, config.max_delay)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Calculate the delay before a given attempt (0-indexed).
    ///
    /// `min(base * 2^(attempt-1), max)` with +-30% jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        // Exponential backoff: base_delay * 2^(attempt-1)
        let multiplier = 2u32.saturating_pow(attempt - 1);
        let base = self.base_delay.saturating_mul(multiplier);
        let capped = std::cmp::min(base, self.max_delay);

        // +-30% jitter
        let capped_ms = capped.as_millis() as u64;
        let jitter_range = capped_ms * 3 / 10;
        if jitter_range == 0 {
            return capped;
        }
        let jitter = rand::random::<u64>() % (jitter_range * 2 + 1);
        Duration::from_millis(capped_ms - jitter_range + jitter)
    }

    /// Execute an async operation with retry logic.
    ///
    /// Only retryable errors (transport, timeout, RPC error objects, missing
    /// results) are retried. Anything else is returned immediately. When the
    /// attempts run out the last error is wrapped in
    /// [`ChainError::RetryExhausted`].
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> ChainResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ChainResult<T>>,
    {
        let mut attempt = 0;
        loop {
            let delay = self.delay_for_attempt(attempt);
            if !delay.is_zero() {
                debug!(attempt, ?delay, "Retrying after delay");
                sleep(delay).await;
            }

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        return Err(ChainError::RetryExhausted {
                            attempts: attempt,
                            last_error: Box::new(e),
                        });
                    }
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Retryable error, will retry"
                    );
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
