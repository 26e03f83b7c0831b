//! Retry utilities for resilient remote operations
//!
//! Every remote call the engine makes (authorize, character enumeration,
//! attendance submission) goes through the same policy: a fixed attempt
//! budget with a fixed inter-attempt delay. There is no backoff and no
//! jitter; a failed attempt is simply tried again until the budget runs out,
//! and the last error is handed back to the caller unchanged.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total number of attempts (initial try included)
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with a custom attempt budget
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Create a retry configuration with custom attempts and delay
    pub fn with_delay(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts,
            delay_ms,
        }
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Execute an operation, retrying every failure up to the attempt budget.
///
/// Returns `Ok(T)` on the first success, or the final error once the budget
/// is exhausted. Every failure is retried uniformly; callers that need to
/// exclude certain errors from retry use [`with_retry_if`].
pub async fn with_retry<T, E, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(config, operation, |_| true).await
}

/// Execute an operation with a retry predicate.
///
/// `should_retry` decides, per error, whether another attempt is warranted;
/// a non-retryable error is returned immediately. This is the extension
/// point for excluding conditions that must not be blindly re-submitted.
pub async fn with_retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation: F,
    should_retry: P,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = config.max_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        if attempt > 1 {
            debug!(
                attempt = attempt,
                delay_ms = config.delay_ms,
                "retrying operation after delay"
            );
            tokio::time::sleep(config.delay()).await;
        }

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(attempt = attempt, "operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) => {
                if !should_retry(&e) {
                    warn!(error = %e, "non-retryable error encountered");
                    return Err(e);
                }

                warn!(
                    attempt = attempt,
                    max_attempts = attempts,
                    error = %e,
                    "operation failed"
                );
                last_error = Some(e);
            }
        }
    }

    // attempts >= 1, so at least one error was recorded
    Err(last_error.expect("retry loop ran at least once"))
}
