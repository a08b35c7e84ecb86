//! Bounded-duration retry policy for Graph API calls.
//!
//! Every lifecycle operation wraps its fetch (and create its mutate) in the
//! same policy: keep retrying transient failures until a wall-clock deadline,
//! abort immediately on terminal ones, and pause briefly before surfacing
//! any failure as a rate-limit courtesy to the API.

use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{O365Error, Result};

/// Total retry deadline in seconds.
const DEFAULT_DEADLINE_SECS: u64 = 120;

/// Base delay between attempts in milliseconds; grows linearly per attempt.
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Pause before surfacing a failure, in seconds.
const DEFAULT_COOLDOWN_SECS: u64 = 2;

/// Retry policy: deadline, backoff, and failure cooldown.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Wall-clock ceiling for the whole retry loop.
    deadline: Duration,
    /// Base sleep between attempts; multiplied by the attempt number unless
    /// the error carries its own retry hint.
    base_delay: Duration,
    /// Pause before surfacing any failure.
    cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(DEFAULT_DEADLINE_SECS),
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given deadline, keeping default backoff and
    /// cooldown.
    #[must_use]
    pub fn new(deadline: Duration) -> Self {
        Self {
            deadline,
            ..Self::default()
        }
    }

    /// Sets the base delay between attempts.
    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Sets the pause applied before surfacing a failure.
    #[must_use]
    pub const fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Runs an operation under this policy.
    ///
    /// Retryable errors keep the loop going until the deadline; terminal
    /// errors abort it immediately. Either way the cooldown is applied
    /// before the error is surfaced, so callers can inspect it (e.g. for
    /// not-found handling) without racing the API.
    ///
    /// # Errors
    ///
    /// Returns the last error observed when the operation never succeeds.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !error.is_retryable() {
                debug!("Attempt {attempt} failed with terminal error: {error}");
                return self.fail(error).await;
            }

            let delay = error
                .retry_delay_secs()
                .map_or_else(|| self.base_delay * attempt, Duration::from_secs);

            if started.elapsed() + delay >= self.deadline {
                warn!("Retry deadline exhausted after {attempt} attempt(s): {error}");
                return self.fail(error).await;
            }

            debug!("Attempt {attempt} failed ({error}), retrying in {delay:?}");
            tokio::time::sleep(delay).await;
        }
    }

    /// Applies the cooldown and returns the error.
    async fn fail<T>(&self, error: O365Error) -> Result<T> {
        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GraphError, O365Error};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(50))
            .with_base_delay(Duration::from_millis(1))
            .with_cooldown(Duration::ZERO)
    }

    fn transient() -> O365Error {
        // 502 is retryable but carries no retry hint, so tests stay on the
        // millisecond base delay.
        O365Error::Graph(GraphError::api_error(502, "bad gateway"))
    }

    fn terminal() -> O365Error {
        O365Error::Graph(GraphError::api_error(400, "bad request"))
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy();

        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transient())
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_aborts_immediately() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy();

        let result: Result<()> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(terminal()) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_deadline_bounds_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(Duration::from_millis(20))
            .with_base_delay(Duration::from_millis(10))
            .with_cooldown(Duration::ZERO);

        let result: Result<()> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(result.is_err());
        // 10ms, then 20ms would cross the 20ms deadline
        assert!(calls.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_error_is_preserved_through_cooldown() {
        let policy = fast_policy();

        let result: Result<()> = policy
            .run(|| async {
                Err(O365Error::Graph(GraphError::ResourceNotFound {
                    code: String::from("Request_ResourceNotFound"),
                    message: String::from("gone"),
                }))
            })
            .await;

        assert!(result.unwrap_err().is_not_found());
    }
}
