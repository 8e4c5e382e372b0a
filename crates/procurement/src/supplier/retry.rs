//! Retry policy for supplier calls.
//!
//! Uses `backon` for exponential backoff. Only transport failures are
//! retried; any answer from the supplier ends the call.

use std::future::Future;
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

use super::SupplierError;

/// How a supplier call is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: usize,
    /// The delay before retry `n` is `base_delay * 2^n`.
    pub base_delay: Duration,
    /// Bound on a single attempt. Elapsing counts as a transport failure.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Policy with no waiting between attempts, for tests.
    pub fn immediate(max_attempts: usize) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            attempt_timeout: Duration::from_secs(5),
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }

    /// Backoff schedule: no jitter, doubling from `base_delay * 2`.
    pub fn backoff(&self) -> ExponentialBuilder {
        let retries = self.max_attempts.saturating_sub(1);
        ExponentialBuilder::default()
            .with_min_delay(self.delay_before_retry(1))
            .with_max_delay(self.delay_before_retry(retries.max(1) as u32))
            .with_factor(2.0)
            .with_max_times(retries)
    }

    /// Runs `call` under this policy.
    ///
    /// Every attempt is bounded by `attempt_timeout`. Retryable errors are
    /// retried until the attempt budget is spent; the last error is returned.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T, SupplierError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SupplierError>>,
    {
        let call = &call;
        let timeout = self.attempt_timeout;

        (|| async move {
            match tokio::time::timeout(timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(SupplierError::Timeout(timeout)),
            }
        })
        .retry(self.backoff())
        .when(SupplierError::is_retryable)
        .notify(|err: &SupplierError, delay: Duration| {
            metrics::counter!("supplier_submission_retries_total", "operation" => operation)
                .increment(1);
            tracing::warn!(
                operation,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "supplier call failed, retrying"
            );
        })
        .await
    }
}
