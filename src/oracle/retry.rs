//! Retry policy for oracle calls.
//!
//! The policy is plain data: an ordered list of waits and a predicate naming
//! the retryable failures. Waiting goes through a [`Sleeper`] so tests can
//! record the schedule instead of blocking on it.

use std::sync::Mutex;
use std::time::Duration;

use crate::oracle::error::OracleError;

/// Waits between attempts after a rate-limit failure: 60s, 120s, 180s.
pub const RATE_LIMIT_BACKOFF_SECS: [u64; 3] = [60, 120, 180];

/// Blocking wait capability.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested waits without sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far, in order.
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

/// Which failures the retry schedule applies to.
pub type RetryPredicate = fn(&OracleError) -> bool;

/// An explicit backoff schedule plus a retryable-failure predicate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    schedule: Vec<Duration>,
    retryable: RetryPredicate,
}

impl RetryPolicy {
    pub fn new(schedule: Vec<Duration>, retryable: RetryPredicate) -> Self {
        Self {
            schedule,
            retryable,
        }
    }

    /// Retry only rate limits, waiting 60s, 120s, then 180s.
    pub fn rate_limit() -> Self {
        Self::new(
            RATE_LIMIT_BACKOFF_SECS
                .iter()
                .map(|s| Duration::from_secs(*s))
                .collect(),
            OracleError::is_retryable,
        )
    }

    pub fn schedule(&self) -> &[Duration] {
        &self.schedule
    }

    /// Upper bound on attempts, the first one included.
    pub fn max_attempts(&self) -> usize {
        self.schedule.len() + 1
    }

    pub fn is_retryable(&self, err: &OracleError) -> bool {
        (self.retryable)(err)
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// schedule runs out.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// once retries are exhausted.
    pub fn run<T, F>(&self, sleeper: &dyn Sleeper, mut op: F) -> Result<T, OracleError>
    where
        F: FnMut(usize) -> Result<T, OracleError>,
    {
        let mut attempt = 1;
        loop {
            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !self.is_retryable(&err) {
                return Err(err);
            }

            let Some(wait) = self.schedule.get(attempt - 1) else {
                tracing::error!(
                    attempts = attempt,
                    error = %err,
                    "max retries exceeded due to rate limiting"
                );
                return Err(err);
            };

            tracing::warn!(
                wait_secs = wait.as_secs(),
                retry = attempt,
                max_retries = self.schedule.len(),
                "rate limited, waiting before retry"
            );
            sleeper.sleep(*wait);
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::rate_limit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(list: &[u64]) -> Vec<Duration> {
        list.iter().map(|s| Duration::from_secs(*s)).collect()
    }

    #[test]
    fn test_rate_limit_schedule_is_explicit() {
        let policy = RetryPolicy::rate_limit();
        assert_eq!(policy.schedule(), secs(&[60, 120, 180]).as_slice());
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_only_rate_limits_are_retryable() {
        let policy = RetryPolicy::rate_limit();
        assert!(policy.is_retryable(&OracleError::rate_limited("429")));
        assert!(!policy.is_retryable(&OracleError::transport("reset")));
        assert!(!policy.is_retryable(&OracleError::invalid_response("empty")));
    }

    #[test]
    fn test_success_after_three_rate_limits() {
        let sleeper = RecordingSleeper::new();
        let policy = RetryPolicy::rate_limit();

        let result = policy.run(&sleeper, |attempt| {
            if attempt < 4 {
                Err(OracleError::rate_limited("429"))
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 4);
        assert_eq!(sleeper.waits(), secs(&[60, 120, 180]));
        assert_eq!(sleeper.total(), Duration::from_secs(360));
    }

    #[test]
    fn test_fourth_rate_limit_propagates() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;

        let result: Result<(), _> = RetryPolicy::rate_limit().run(&sleeper, |attempt| {
            calls += 1;
            Err(OracleError::rate_limited(format!("attempt {}", attempt)))
        });

        let err = result.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.message, "attempt 4");
        assert_eq!(calls, 4);
        assert_eq!(sleeper.waits().len(), 3);
    }

    #[test]
    fn test_non_retryable_fails_immediately() {
        let sleeper = RecordingSleeper::new();
        let mut calls = 0;

        let result: Result<(), _> = RetryPolicy::rate_limit().run(&sleeper, |_| {
            calls += 1;
            Err(OracleError::transport("connection refused"))
        });

        assert!(result.is_err());
        assert_eq!(calls, 1);
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn test_thread_sleeper_runs_schedule() {
        let policy = RetryPolicy::new(vec![Duration::ZERO; 2], OracleError::is_retryable);
        let mut calls = 0;

        let result = policy.run(&ThreadSleeper, |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(OracleError::rate_limited("429"))
            } else {
                Ok(attempt)
            }
        });

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }
}
