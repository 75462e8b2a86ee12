//! Bounded retry with exponential backoff for external calls.

use crate::services::ServiceError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy for a single logical external call.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles per retry.
    pub backoff_base: Duration,
    /// Per-attempt timeout.
    pub call_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Run `call` until it succeeds, fails permanently, or attempts run out.
///
/// A timed-out attempt counts as transient. The backoff doubles after
/// each failed attempt (500ms, 1s, 2s, ...).
pub async fn retry_with_backoff<T, F, Fut>(
    config: &RetryConfig,
    operation: &str,
    mut call: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut backoff = config.backoff_base;
    let mut attempt = 1;
    loop {
        let outcome = match tokio::time::timeout(config.call_timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Transient(format!(
                "{operation} timed out after {:?}",
                config.call_timeout
            ))),
        };
        match outcome {
            Ok(value) => return Ok(value),
            Err(err @ ServiceError::Permanent(_)) => return Err(err),
            Err(err) if attempt >= config.max_attempts => {
                warn!(operation, attempt, error = %err, "giving up after retries");
                return Err(err);
            }
            Err(err) => {
                warn!(operation, attempt, error = %err, backoff_ms = backoff.as_millis() as u64, "retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
            call_timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(&fast_config(), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ServiceError::Transient("flaky".into()))
                } else {
                    Ok(7u64)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&fast_config(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::Permanent("nope".into())) }
        })
        .await;
        assert!(matches!(result, Err(ServiceError::Permanent(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_with_backoff(&fast_config(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ServiceError::Transient("still flaky".into())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
