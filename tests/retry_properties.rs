use std::cell::Cell;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use proptest::prelude::*;
use thiserror::Error;

use azgov_audit::common::CancellationToken;
use azgov_audit::retry::{
    ErrorKind, PatternClassifier, RetryError, RetryExecutor, RetryPolicy, RetryableError, Sleeper,
};

#[derive(Debug, Error)]
#[error("{message} (attempt {attempt})")]
struct FakeError {
    message: &'static str,
    attempt: u32,
}

impl RetryableError for FakeError {}

#[derive(Default)]
struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration, _cancel: &CancellationToken) -> bool {
        self.delays.lock().unwrap().push(duration);
        true
    }
}

fn executor(max_attempts: u32, base_ms: u64) -> (RetryExecutor, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::default());
    let policy = RetryPolicy::new(
        max_attempts,
        Duration::from_millis(base_ms),
        Arc::new(PatternClassifier::azure_defaults().unwrap()),
    );
    (RetryExecutor::with_sleeper(policy, sleeper.clone()), sleeper)
}

/// Run an operation that always fails with `message`, numbering each attempt
fn always_failing(
    executor: &RetryExecutor,
    message: &'static str,
) -> (Result<(), RetryError<FakeError>>, u32) {
    let calls = Cell::new(0);
    let result = executor.execute(&CancellationToken::new(), || {
        calls.set(calls.get() + 1);
        Err::<(), _>(FakeError {
            message,
            attempt: calls.get(),
        })
    });
    (result, calls.get())
}

proptest! {
    #[test]
    fn fatal_errors_are_attempted_once(max_attempts in 1u32..10, base_ms in 0u64..5000) {
        let (executor, sleeper) = executor(max_attempts, base_ms);
        let (result, calls) = always_failing(&executor, "invalid query syntax");

        prop_assert_eq!(calls, 1);
        prop_assert!(matches!(result, Err(RetryError::Fatal { attempts: 1, .. })), "expected Fatal with attempts == 1");
        prop_assert!(sleeper.delays.lock().unwrap().is_empty());
    }

    #[test]
    fn rate_limited_delays_double(max_attempts in 1u32..8, base_ms in 1u64..5000) {
        let (executor, sleeper) = executor(max_attempts, base_ms);
        let (_, calls) = always_failing(&executor, "429 TooManyRequests");

        prop_assert_eq!(calls, max_attempts);
        let expected: Vec<Duration> = (2..=max_attempts)
            .map(|k| Duration::from_millis(base_ms * 2u64.pow(k - 2)))
            .collect();
        prop_assert_eq!(sleeper.delays.lock().unwrap().clone(), expected);
    }

    #[test]
    fn transient_delays_grow_linearly(max_attempts in 1u32..8, base_ms in 1u64..5000) {
        let (executor, sleeper) = executor(max_attempts, base_ms);
        let (_, calls) = always_failing(&executor, "503 ServiceUnavailable");

        prop_assert_eq!(calls, max_attempts);
        let expected: Vec<Duration> = (2..=max_attempts)
            .map(|k| Duration::from_millis(base_ms * u64::from(k - 1)))
            .collect();
        prop_assert_eq!(sleeper.delays.lock().unwrap().clone(), expected);
    }

    #[test]
    fn exhaustion_returns_the_last_error(max_attempts in 1u32..8) {
        let (executor, _) = executor(max_attempts, 0);
        let (result, _) = always_failing(&executor, "connection reset by peer");

        match result {
            Err(RetryError::Exhausted { attempts, kind, source }) => {
                prop_assert_eq!(attempts, max_attempts);
                prop_assert_eq!(kind, ErrorKind::Transient);
                prop_assert_eq!(source.attempt, max_attempts);
            }
            other => prop_assert!(false, "unexpected result: {:?}", other),
        }
    }

    #[test]
    fn success_after_failures_is_returned(failures in 0u32..3) {
        let (executor, sleeper) = executor(3, 10);
        let calls = Cell::new(0);
        let result = executor.execute(&CancellationToken::new(), || {
            calls.set(calls.get() + 1);
            if calls.get() <= failures {
                Err(FakeError { message: "operation timed out", attempt: calls.get() })
            } else {
                Ok(calls.get())
            }
        });

        prop_assert_eq!(result.ok(), Some(failures + 1));
        prop_assert_eq!(sleeper.delays.lock().unwrap().len(), failures as usize);
    }
}

#[test]
fn cancelled_sleep_returns_last_error() {
    struct CancellingSleeper;
    impl Sleeper for CancellingSleeper {
        fn sleep(&self, _duration: Duration, cancel: &CancellationToken) -> bool {
            cancel.cancel();
            false
        }
    }

    let policy = RetryPolicy::new(
        5,
        Duration::from_secs(1),
        Arc::new(PatternClassifier::azure_defaults().unwrap()),
    );
    let executor = RetryExecutor::with_sleeper(policy, Arc::new(CancellingSleeper));
    let result = executor.execute(&CancellationToken::new(), || {
        Err::<(), _>(FakeError { message: "throttled", attempt: 1 })
    });

    match result {
        Err(RetryError::Cancelled { attempts, last }) => {
            assert_eq!(attempts, 1);
            assert!(last.is_some());
        }
        other => panic!("unexpected result: {:?}", other),
    }
}
