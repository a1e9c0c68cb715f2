//! Automatic retry logic with error recovery guidance
//!
//! Provides the attempt loop behind every command: repeat while the error is
//! retriable and budget remains, sleeping according to the error's backoff
//! strategy.

use crate::error::{EngineError, ErrorRecovery};
use std::future::Future;
use tracing::{debug, warn};

/// Result type for retry operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Retry an operation with automatic backoff based on error recovery guidance
///
/// This function will retry the operation if:
/// 1. The error's `is_retriable()` returns true
/// 2. The number of attempts hasn't reached `max_attempts`, or the error's
///    own `max_retries()` when `max_attempts` is `None`
/// 3. A backoff strategy is defined
///
/// The operation receives the 1-indexed attempt number. The error from the
/// final attempt is returned unchanged.
///
/// # Example
///
/// ```no_run
/// # use robodriver::retry::retry_with_recovery;
/// # use robodriver::error::{EngineError, Result};
/// # async fn example() -> Result<String> {
/// async fn poll(attempt: u32) -> Result<String> {
///     Ok(format!("answered on attempt {attempt}"))
/// }
///
/// let reply = retry_with_recovery(poll, Some(3)).await?; // max 3 attempts
/// # Ok(reply)
/// # }
/// ```
pub async fn retry_with_recovery<T, F, Fut>(mut operation: F, max_attempts: Option<u32>) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(result) => return Ok(result),
            Err(err) => {
                let max_attempts = max_attempts
                    .or_else(|| err.max_retries())
                    .unwrap_or(1)
                    .max(1);
                if !err.is_retriable() || attempt >= max_attempts {
                    return Err(err);
                }

                warn!(attempt, max_attempts, error = %err, "attempt failed");
                debug!(action = err.suggested_action(), "recovery");

                match err.backoff_strategy().delay_for_attempt(attempt) {
                    Some(delay) if delay.is_zero() => {}
                    Some(delay) => {
                        debug!(?delay, "waiting before retry");
                        tokio::time::sleep(delay).await;
                    }
                    // No backoff strategy means don't retry
                    None => return Err(err),
                }
            }
        }
    }
}
