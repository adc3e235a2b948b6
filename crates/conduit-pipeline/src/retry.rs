//! Retry logic with configurable backoff policies for operation invocations.

use std::time::Duration;

use conduit_types::{ConduitError, Result};

/// Backoff policy controlling the delay between retry attempts.
#[derive(Debug, Clone)]
pub enum BackoffPolicy {
    /// Fixed delay between retries.
    Fixed(Duration),
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
    /// No delay between retries.
    None,
}

impl BackoffPolicy {
    /// Compute the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        match self {
            BackoffPolicy::Fixed(d) => *d,
            BackoffPolicy::Exponential { base, max } => {
                let millis = (base.as_millis() as u64)
                    .saturating_mul(2u64.saturating_pow(attempt as u32));
                Duration::from_millis(millis).min(*max)
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }

    /// Exponential policy starting at `base_ms`, capped at 30s. Zero means no delay.
    pub fn from_millis(base_ms: u64) -> Self {
        if base_ms == 0 {
            BackoffPolicy::None
        } else {
            BackoffPolicy::Exponential {
                base: Duration::from_millis(base_ms),
                max: Duration::from_secs(30),
            }
        }
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

/// Execute an operation with retry logic.
///
/// The closure `f` is called up to `max_retries + 1` times. Only errors that
/// satisfy [`ConduitError::is_retryable`] are retried; anything else is
/// returned immediately. Between retries, the function sleeps for the
/// duration dictated by `policy`. When every retry fails with a retryable
/// error the result is [`ConduitError::RetriesExhausted`] wrapping the last
/// one; with `max_retries == 0` the single error is returned as-is.
pub async fn execute_with_retry<F, Fut, T>(
    f: F,
    max_retries: usize,
    policy: &BackoffPolicy,
    operation: &str,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        let err = match f().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_retryable() || max_retries == 0 => return Err(e),
            Err(e) => e,
        };
        if attempt == max_retries {
            return Err(ConduitError::RetriesExhausted {
                operation: operation.to_string(),
                attempts: attempt + 1,
                last: Box::new(err),
            });
        }
        let delay = policy.delay_for_attempt(attempt);
        tracing::warn!(
            operation = %operation,
            attempt,
            delay_ms = %delay.as_millis(),
            error = %err,
            "Retryable error, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
