//! Bounded retry for retryable failures, applied at the call site.

use std::future::Future;
use std::time::Duration;

use log::warn;
use tokio::time::sleep;

use crate::error::ResolveError;

/// How many attempts to make and how long to wait between them. The delay
/// grows linearly with the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 3,
            delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no waiting. Used where the caller must not retry.
    pub fn none() -> Self {
        RetryPolicy {
            attempts: 1,
            delay: Duration::ZERO,
        }
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget runs out. Only errors whose kind is retryable (see
/// [`ResolveError::is_retryable`]) trigger another attempt; quota exhaustion
/// in particular never does.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, label: &str, op: F) -> Result<T, ResolveError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ResolveError>>,
{
    let mut last_err = None;

    for attempt in 1..=policy.attempts.max(1) {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() && attempt < policy.attempts => {
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    label, attempt, policy.attempts, err
                );
                last_err = Some(err);
                sleep(policy.delay * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }

    // Unreachable unless attempts == 0; keep the typed error either way.
    Err(last_err.unwrap_or_else(|| ResolveError::SourceUnavailable(label.to_string())))
}
