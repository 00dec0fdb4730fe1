//! Generic retry policy with exponential backoff.
//!
//! Replaces ad-hoc sleep-and-retry loops at call sites: the caller supplies
//! the operation and a classifier saying which errors are worth retrying.

use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;

/// Retry policy: bounded attempts with doubling backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            // At least one attempt, or nothing would ever run.
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    pub fn from_config(cfg: &RetryConfig) -> Self {
        Self::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.initial_backoff_ms),
        )
    }

    /// Run `op`, retrying on errors the classifier marks retryable.
    ///
    /// Non-retryable errors and the final attempt's error are returned as-is.
    pub async fn run<T, E, F, Fut>(
        &self,
        mut op: F,
        retryable: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        E: std::fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "retryable error, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
