//! Central retry wrapper for orchestrator work.
//!
//! Only errors the store classifies as retryable are retried, with
//! exponential backoff. Everything else, including a mid-transaction
//! deadline, fails the call on the first occurrence.

use std::future::Future;
use std::time::Duration;

use fintra_core::ledger::error::LedgerError;
use fintra_shared::config::LedgerConfig;

/// Retry policy derived from configuration.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per retry.
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    /// Builds the policy from ledger configuration.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            initial_backoff: Duration::from_millis(config.backoff_initial_ms),
        }
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    /// The successful value.
    pub value: T,
    /// Attempts consumed, 1 when the first try succeeded.
    pub attempts: u32,
}

/// Runs `operation` under the policy; retries only
/// [`LedgerError::is_retryable`] failures.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-retryable error immediately.
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<RetryOutcome<T>, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(RetryOutcome { value, attempts: attempt }),
            Err(err) if err.is_retryable() && attempt < policy.max_attempts => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "retryable failure, backing off"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_first_try_success() {
        let outcome = with_retry(policy(), "op", || async { Ok::<_, LedgerError>(42) })
            .await
            .unwrap();
        assert_eq!(outcome.value, 42);
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let outcome = with_retry(policy(), "op", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LedgerError::Transient("deadlock".to_string()))
                } else {
                    Ok(7)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome.value, 7);
        assert_eq!(outcome.attempts, 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<RetryOutcome<()>, _> = with_retry(policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::Transient("serialization failure".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<RetryOutcome<()>, _> = with_retry(policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(LedgerError::InvalidInput("bad amount".to_string()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<RetryOutcome<()>, _> = with_retry(policy(), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LedgerError::DeadlineExceeded) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
