//! Retry policy for write conflicts.
//!
//! A read-modify-write that loses a race (its version guard matched no row,
//! or `SQLite` reported lock contention) is rerun from the start as a fresh
//! transaction. Other errors, `NotFound` included, are returned at once.

use std::future::Future;
use std::time::Duration;

use crate::error::StoreError;

/// Default number of attempts per operation.
const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default delay before the first retry.
const DEFAULT_BASE_DELAY_MS: u64 = 5;

/// How many times to run a conflicting transaction, and how long to wait
/// between runs (linear backoff: `base_delay * attempt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// The policy used when none is configured.
    pub const DEFAULT: Self = Self {
        max_attempts: DEFAULT_MAX_ATTEMPTS,
        base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
    };

    /// Create a policy.
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Run once; report the first conflict as exhausted.
    pub const fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait before attempt `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `op` until it succeeds, fails with a non-conflict error, or the
    /// attempt budget is spent.
    ///
    /// # Errors
    ///
    /// Returns the first non-conflict error unchanged, or
    /// [`StoreError::RetriesExhausted`] wrapping the last conflict.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt: u32 = 1;

        loop {
            match op().await {
                Err(err) if err.is_write_conflict() => {
                    if attempt >= max_attempts {
                        tracing::warn!(operation, attempts = attempt, error = %err, "Retries exhausted");
                        return Err(StoreError::RetriesExhausted {
                            attempts: attempt,
                            source: Box::new(err),
                        });
                    }
                    tracing::warn!(operation, attempt, error = %err, "Write conflict, retrying");
                    tokio::time::sleep(self.delay_for(attempt)).await;
                    attempt = attempt.saturating_add(1);
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use strata_types::PersonId;

    use super::*;

    #[test]
    fn backoff_is_linear() {
        let policy = RetryPolicy::new(4, Duration::from_millis(10));
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(3), Duration::from_millis(30));
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(5, Duration::ZERO);

        let result = policy
            .run("test", move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(StoreError::WriteConflict(PersonId::new(1)))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(5, Duration::ZERO);

        let result: Result<(), _> = policy
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::PersonNotFound(PersonId::new(9)))
            })
            .await;

        assert!(matches!(result, Err(StoreError::PersonNotFound(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_reports_attempt_count() {
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result: Result<(), _> = policy
            .run("test", || async {
                Err(StoreError::WriteConflict(PersonId::new(2)))
            })
            .await;

        assert!(matches!(
            result,
            Err(StoreError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::new(0, Duration::ZERO);

        let result = policy
            .run("test", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StoreError>(())
            })
            .await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
