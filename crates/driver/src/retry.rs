//! Bounded retry with a fixed delay.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Default number of additional attempts after the first one.
pub const DEFAULT_RETRIES: u32 = 5;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Errors that can tell transient failures from permanent ones.
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// How often and how patiently to retry an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first (total = `retries + 1`).
    pub retries: u32,
    /// Fixed pause between consecutive attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or the policy is exhausted.
///
/// Only errors reporting [`Retryable::is_transient`] are retried. The delay
/// is slept between attempts only, so the last failure is returned without
/// a trailing pause.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if !e.is_transient() => {
                debug!(attempt, error = %e, "permanent failure, not retrying");
                return Err(e);
            }
            Err(e) if attempt >= policy.retries => {
                warn!(attempt, error = %e, "retry limit reached");
                return Err(e);
            }
            Err(e) => {
                attempt += 1;
                debug!(
                    attempt,
                    retries = policy.retries,
                    error = %e,
                    "attempt failed, retrying in {:?}",
                    policy.delay
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
