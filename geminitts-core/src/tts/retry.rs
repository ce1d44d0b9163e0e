use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Fixed-delay retry loop. The delay is only applied between attempts,
/// never after the final one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Returned when the policy stops: either the attempt budget ran out or the
/// classifier declared the error final.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

/// Passed to the failure callback for every failed attempt.
#[derive(Debug, Clone, Copy)]
pub struct FailedAttempt {
    /// 1-based number of the attempt that failed.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Delay before the next attempt, `None` when no attempt follows.
    pub next_delay: Option<Duration>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Runs `operation` until it succeeds, the classifier rejects the error,
    /// or `max_attempts` is reached. `operation` receives the 1-based attempt
    /// number and must build a fresh request every time.
    pub async fn run<T, E, Op, Fut, Classify, OnFailure>(
        &self,
        mut operation: Op,
        should_retry: Classify,
        mut on_failure: OnFailure,
    ) -> Result<T, RetryExhausted<E>>
    where
        Op: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classify: Fn(&E) -> bool,
        OnFailure: FnMut(FailedAttempt, &E),
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        info!("Request succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(error) => {
                    let retry = should_retry(&error) && attempt < max_attempts;
                    let next_delay = retry.then_some(self.delay);

                    on_failure(
                        FailedAttempt {
                            attempt,
                            max_attempts,
                            next_delay,
                        },
                        &error,
                    );

                    if !retry {
                        warn!(
                            attempt,
                            max_attempts, "Request failed after {} attempts: {}", attempt, error
                        );
                        return Err(RetryExhausted {
                            attempts: attempt,
                            last_error: error,
                        });
                    }

                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        error = %error,
                        "Request failed, retrying after delay"
                    );

                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
