//! Retry policy for fallible operations
//!
//! The harvester only retries saves. Fetches and existence checks run once.

use crate::config::{BackoffKind, HarvestConfig};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Upper bound for any single exponential delay
const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(60);

/// How the delay between attempts evolves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same delay before every retry
    Fixed,

    /// `delay * multiplier^(retry - 1)`, capped at `max_delay`
    Exponential { multiplier: f64, max_delay: Duration },
}

/// Bounded retry with an inter-attempt delay
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure
    pub max_retries: u32,

    /// Base delay between attempts
    pub delay: Duration,

    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a policy with a fixed delay
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Builds the policy described by the `[harvest]` section
    pub fn from_config(config: &HarvestConfig) -> Self {
        let backoff = match config.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                multiplier: config.backoff_multiplier,
                max_delay: MAX_BACKOFF_DELAY,
            },
        };

        Self {
            max_retries: config.max_retries,
            delay: config.retry_delay(),
            backoff,
        }
    }

    /// Total number of attempts, first one included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before retry number `retry` (1-indexed)
    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = retry.saturating_sub(1).min(i32::MAX as u32) as i32;
                let secs = self.delay.as_secs_f64() * multiplier.powi(exponent);
                if !secs.is_finite() || secs >= max_delay.as_secs_f64() {
                    max_delay
                } else {
                    Duration::from_secs_f64(secs)
                }
            }
        }
    }
}

/// Terminal failure of a retried operation
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed with a retryable error
    #[error("retries exhausted after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },

    /// The operation failed with an error that retrying cannot fix
    #[error("permanent failure after {attempts} attempts: {source}")]
    Permanent { attempts: u32, source: E },
}

impl<E> RetryError<E> {
    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Permanent { attempts, .. } => *attempts,
        }
    }

    /// The last error observed
    pub fn last_error(&self) -> &E {
        match self {
            Self::Exhausted { source, .. } | Self::Permanent { source, .. } => source,
        }
    }

    pub fn into_inner(self) -> E {
        match self {
            Self::Exhausted { source, .. } | Self::Permanent { source, .. } => source,
        }
    }
}

/// Runs `op` until it succeeds, fails permanently, or the policy runs out
///
/// # Arguments
///
/// * `policy` - Attempt limit and delay
/// * `label` - Identifies the operation in log lines (usually the URL)
/// * `op` - Produces a fresh future for each attempt
/// * `is_retryable` - Decides whether an error is worth another attempt
///
/// # Returns
///
/// * `Ok(T)` - The first successful result
/// * `Err(RetryError::Permanent)` - `is_retryable` rejected the error
/// * `Err(RetryError::Exhausted)` - `policy.max_attempts()` attempts all failed
pub async fn retry<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
    is_retryable: R,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(source) if !is_retryable(&source) => {
                return Err(RetryError::Permanent {
                    attempts: attempt,
                    source,
                });
            }
            Err(source) if attempt >= max_attempts => {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    source,
                });
            }
            Err(source) => {
                tracing::warn!(
                    "Retrying ({}/{}) for {}: {}",
                    attempt,
                    policy.max_retries,
                    label,
                    source
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self)
        }
    }

    fn is_transient(e: &TestError) -> bool {
        *e == TestError::Transient
    }

    #[tokio::test]
    async fn test_first_success_does_not_retry() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let result: Result<u32, RetryError<TestError>> = retry(
            &policy,
            "op",
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            },
            is_transient,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_k_failures() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1));

        let result = retry(
            &policy,
            "op",
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= 2 {
                    Err(TestError::Transient)
                } else {
                    Ok(n)
                }
            },
            is_transient,
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_retries_plus_one() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::fixed(2, Duration::from_millis(1));

        let result: Result<(), _> = retry(
            &policy,
            "op",
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            },
            is_transient,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
        assert_eq!(err.last_error(), &TestError::Transient);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_means_single_attempt() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::fixed(0, Duration::from_millis(1));

        let result: Result<(), _> = retry(
            &policy,
            "op",
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Transient)
            },
            is_transient,
        )
        .await;

        assert_eq!(result.unwrap_err().attempts(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_permanent_error_stops_immediately() {
        let calls = &AtomicU32::new(0);
        let policy = RetryPolicy::fixed(5, Duration::from_millis(1));

        let result: Result<(), _> = retry(
            &policy,
            "op",
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(TestError::Fatal)
            },
            is_transient,
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, RetryError::Permanent { attempts: 1, .. }));
        assert_eq!(err.into_inner(), TestError::Fatal);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sleeps_between_attempts() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(20));
        let start = Instant::now();

        let _: Result<(), _> = retry(
            &policy,
            "op",
            || async { Err(TestError::Transient) },
            is_transient,
        )
        .await;

        // Two retries, two sleeps
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn test_fixed_delay_is_constant() {
        let policy = RetryPolicy::fixed(10, Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(9), Duration::from_millis(100));
        assert_eq!(policy.max_attempts(), 11);
    }

    #[test]
    fn test_exponential_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            delay: Duration::from_millis(100),
            backoff: Backoff::Exponential {
                multiplier: 2.0,
                max_delay: Duration::from_secs(1),
            },
        };

        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(1));
    }

    #[test]
    fn test_from_config() {
        let config = HarvestConfig {
            max_retries: 4,
            retry_delay_ms: 250,
            backoff: BackoffKind::Exponential,
            backoff_multiplier: 3.0,
            ..HarvestConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);

        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.delay, Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(750));
    }
}
