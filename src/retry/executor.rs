use super::classifier::{ErrorKind, FailureInfo, RetryableError};
use super::error::RetryError;
use super::policy::RetryPolicy;
use crate::common::CancellationToken;
use log::{debug, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Upper bound used when a delay does not fit in an `Instant`
const MAX_SINGLE_SLEEP: Duration = Duration::from_secs(24 * 60 * 60);

/// Blocking wait between attempts.
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`. Returns `false` if the wait was cut short by cancellation.
    fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> bool;
}

/// Sleeps on the calling thread in short slices so cancellation is noticed promptly.
#[derive(Debug, Clone, Copy)]
pub struct ThreadSleeper {
    slice: Duration,
}

impl ThreadSleeper {
    pub fn with_slice(slice: Duration) -> Self {
        Self { slice }
    }
}

impl Default for ThreadSleeper {
    fn default() -> Self {
        Self::with_slice(Duration::from_millis(100))
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        let start = Instant::now();
        let deadline = start
            .checked_add(duration)
            .unwrap_or_else(|| start + MAX_SINGLE_SLEEP);
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(self.slice));
        }
    }
}

/// Runs an operation under a [`RetryPolicy`].
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(ThreadSleeper::default()))
    }

    pub fn with_sleeper(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { policy, sleeper }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `operation` until it succeeds, fails fatally, or runs out of attempts.
    pub fn execute<T, E, F>(
        &self,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        E: RetryableError + 'static,
    {
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled {
                    attempts: attempt,
                    last: None,
                });
            }
            attempt += 1;

            let error = match operation() {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded on attempt {}/{}", attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            let failure = FailureInfo::from_error(&error);
            let kind = self.policy.classify(&failure);

            if kind == ErrorKind::Fatal {
                debug!(
                    "Attempt {} failed with a non-retryable error: {}",
                    attempt, failure.message
                );
                return Err(RetryError::Fatal {
                    attempts: attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                warn!(
                    "Giving up after {} attempt(s); last failure was {}: {}",
                    attempt, kind, failure.message
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    kind,
                    source: error,
                });
            }

            let delay = self.policy.delay_for(kind, attempt).unwrap_or_default();
            warn!(
                "Attempt {}/{} failed ({}): {} - retrying in {:.1}s",
                attempt,
                max_attempts,
                kind,
                failure.message,
                delay.as_secs_f64()
            );

            if !self.sleeper.sleep(delay, cancel) {
                return Err(RetryError::Cancelled {
                    attempts: attempt,
                    last: Some(error),
                });
            }
        }
    }
}
