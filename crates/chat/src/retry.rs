//! Bounded retry with backoff for remote calls
//!
//! Exhausting the retry budget is not a panic or an abort; it surfaces as a
//! failed [`RetryResult`] carrying the last error, so the caller decides
//! whether that is fatal.

use std::time::Duration;

use log::{debug, warn};

/// Retry budget and backoff base for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (3 means up to 4 invocations)
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each failure
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Outcome of a retried operation
#[derive(Debug)]
pub struct RetryResult<T, E> {
    /// Total invocations performed, including the initial attempt
    pub attempts: u32,
    pub outcome: Result<T, E>,
}

impl<T, E> RetryResult<T, E> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_result(self) -> Result<T, E> {
        self.outcome
    }
}

/// Run `op`, retrying every failure up to the policy's budget
pub fn with_retry<T, E, F>(policy: RetryPolicy, context: &str, op: F) -> RetryResult<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
{
    with_retry_if(policy, context, op, |_| true)
}

/// Run `op`, retrying only failures for which `retryable` returns true
///
/// Non-retryable failures short-circuit without consuming backoff time, so
/// deterministic rejections (such as the takeout fallback signals) surface
/// on the first attempt.
pub fn with_retry_if<T, E, F, P>(
    policy: RetryPolicy,
    context: &str,
    mut op: F,
    mut retryable: P,
) -> RetryResult<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Display,
    P: FnMut(&E) -> bool,
{
    let mut delay = policy.initial_delay;
    let mut attempts = 0;
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        attempts += 1;
        debug!("{context}: attempt {}", attempt + 1);

        match op() {
            Ok(value) => {
                return RetryResult {
                    attempts,
                    outcome: Ok(value),
                };
            }
            Err(error) => {
                warn!("{context}: attempt {} failed: {error}", attempt + 1);
                let retry = attempt < policy.max_retries && retryable(&error);
                last_error = Some(error);
                if !retry {
                    break;
                }
                // Jitter keeps concurrent sessions from retrying in lockstep
                std::thread::sleep(delay + Duration::from_millis(rand_jitter()));
                delay *= 2;
            }
        }
    }

    RetryResult {
        attempts,
        outcome: Err(last_error.unwrap()),
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
