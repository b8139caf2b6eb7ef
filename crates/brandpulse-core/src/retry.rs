//! Bounded retry with exponential back-off and jitter for external calls.
//!
//! Both the content-API clients and the classification backend wrap their
//! requests in [`retry_with_backoff`], each supplying its own notion of which
//! errors are transient.

use std::future::Future;
use std::time::Duration;

const MAX_DELAY_MS: u64 = 30_000;

/// Retry budget for one external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first try.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// A policy that never sleeps; used by tests.
    #[must_use]
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff_base_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (1-based), before jitter.
    ///
    /// | Attempt | Delay (base = 500 ms) |
    /// |---------|-----------------------|
    /// | 1       | 500 ms                |
    /// | 2       | 1 000 ms              |
    /// | 3       | 2 000 ms              |
    ///
    /// Capped at 30 s.
    #[must_use]
    pub fn base_delay_ms(&self, attempt: u32) -> u64 {
        let shift = attempt.saturating_sub(1).min(10);
        self.backoff_base_ms
            .saturating_mul(1u64 << shift)
            .min(MAX_DELAY_MS)
    }
}

/// Runs `operation`, retrying up to `policy.max_retries` times while
/// `is_retriable` returns `true` for the error.
///
/// Each sleep is the policy's base delay ± 25 % jitter. Non-retriable errors
/// and the error from the final attempt are returned unchanged.
///
/// # Errors
///
/// Returns the last error produced by `operation`.
pub async fn retry_with_backoff<T, E, F, Fut, R>(
    policy: RetryPolicy,
    operation_name: &str,
    is_retriable: R,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = policy.base_delay_ms(attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
