//! Retry handler for chain requests

use std::future::Future;
use tokio::time::{sleep, Duration};

use super::error::ChainError;
use crate::utils::logging;

/// Retries transient chain failures a fixed number of times with a fixed delay
#[derive(Debug, Clone)]
pub struct RetryHandler {
    max_retries: u32,
    delay_ms: u64,
}

impl RetryHandler {
    pub fn new() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 1000,
        }
    }

    pub fn with_config(max_retries: u32, delay_ms: u64) -> Self {
        Self {
            max_retries,
            delay_ms,
        }
    }

    /// Execute an operation, retrying while the error is retryable.
    /// The operation runs at most `max_retries + 1` times.
    pub async fn execute_with_retry_and_logging<F, Fut, T>(
        &self,
        operation: F,
        operation_name: &str,
    ) -> Result<T, ChainError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        let mut retry_count = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if retry_count > 0 {
                        logging::log_info(&format!(
                            "[TON] {} succeeded after {} retries",
                            operation_name, retry_count
                        ));
                    }
                    return Ok(result);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if retry_count >= self.max_retries {
                        logging::log_error(&format!(
                            "[TON] {} failed after {} attempts: {}",
                            operation_name,
                            retry_count + 1,
                            e
                        ));
                        return Err(e);
                    }
                    retry_count += 1;

                    logging::log_warning(&format!(
                        "[TON] {} failed (retry {}/{}): {}. Retrying in {}ms",
                        operation_name, retry_count, self.max_retries, e, self.delay_ms
                    ));

                    sleep(Duration::from_millis(self.delay_ms)).await;
                }
            }
        }
    }
}

impl Default for RetryHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_retries_transient_errors_then_gives_up() {
        let handler = RetryHandler::with_config(3, 0);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), ChainError> = handler
            .execute_with_retry_and_logging(
                || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(ChainError::Network("timeout".to_string()))
                    }
                },
                "get_account_state",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_does_not_retry_unknown_transaction() {
        let handler = RetryHandler::with_config(3, 0);
        let calls = Arc::new(AtomicU32::new(0));

        let result: Result<(), ChainError> = handler
            .execute_with_retry_and_logging(
                || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Err(ChainError::Http {
                            status: 500,
                            body: "LITE_SERVER_UNKNOWN".to_string(),
                        })
                    }
                },
                "get_transaction",
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_error() {
        let handler = RetryHandler::with_config(3, 0);
        let calls = Arc::new(AtomicU32::new(0));

        let result = handler
            .execute_with_retry_and_logging(
                || {
                    let calls = calls.clone();
                    async move {
                        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                            Err(ChainError::Network("reset".to_string()))
                        } else {
                            Ok(7)
                        }
                    }
                },
                "run_get_method",
            )
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
