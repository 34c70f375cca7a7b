//! Bounded fixed-interval retry for async-task-style remote operations.
//!
//! Remote services that answer with a task handle are polled on a fixed
//! cadence until they report a terminal state or the attempt budget runs
//! out. Exhausting the budget is a timeout error, never an infinite loop.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Errors from driving a retry loop to completion.
#[derive(Debug, Error)]
pub enum RetryError {
    #[error("operation failed: {0}")]
    Failed(String),

    #[error("timed out after {0} attempts")]
    TimedOut(u32),
}

/// Result of a single polling attempt.
#[derive(Debug)]
pub enum PollOutcome<T> {
    /// Terminal success.
    Ready(T),
    /// Not done yet; try again after the interval.
    Pending,
    /// Terminal failure; stop polling.
    Failed(String),
}

/// A fixed-interval, bounded-attempt retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Drive `attempt` until it is terminal or attempts are exhausted.
    ///
    /// Waits one interval before the first attempt: callers poll tasks that
    /// were just submitted and cannot be ready immediately.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> Result<T, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PollOutcome<T>>,
    {
        for _ in 0..self.max_attempts {
            tokio::time::sleep(self.interval).await;

            match attempt().await {
                PollOutcome::Ready(value) => return Ok(value),
                PollOutcome::Pending => {}
                PollOutcome::Failed(message) => return Err(RetryError::Failed(message)),
            }
        }

        Err(RetryError::TimedOut(self.max_attempts))
    }
}
