//! Bounded retry with capped exponential backoff.

use std::future::Future;
use std::time::Duration;

use rand::RngExt;

use crate::error::ApiError;

/// How many times to try a call and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Retry without sleeping. Handy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            min_wait: Duration::ZERO,
            max_wait: Duration::ZERO,
        }
    }

    /// Base delay after the `attempt`-th failure (1-based), before jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_wait.saturating_mul(factor).min(self.max_wait)
    }

    /// Backoff plus up to 25% random jitter, still capped at `max_wait`.
    fn delay(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        let spread = (base.as_millis() / 4) as u64;
        let jitter = if spread == 0 {
            0
        } else {
            rand::rng().random_range(0..=spread)
        };
        (base + Duration::from_millis(jitter)).min(self.max_wait)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// Only [`ApiError::is_transient`] errors are retried. When attempts run
    /// out the last transient error is folded into
    /// [`ApiError::TransientNetwork`].
    pub async fn run<T, F, Fut>(&self, service: &'static str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(service, attempt, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    let wait = self.delay(attempt);
                    tracing::warn!(
                        service,
                        attempt,
                        max_attempts,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(err) if err.is_transient() => {
                    tracing::error!(service, attempts = attempt, error = %err, "retries exhausted");
                    return Err(ApiError::TransientNetwork {
                        service,
                        attempts: attempt,
                        last: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> ApiError {
        ApiError::Server {
            service: "test",
            status: 500,
            detail: "boom".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(5), Duration::from_secs(10));
        assert_eq!(policy.backoff(40), Duration::from_secs(10));
    }

    #[test]
    fn delay_never_exceeds_max_wait() {
        let policy = RetryPolicy::default();
        for attempt in 1..10 {
            assert!(policy.delay(attempt) <= policy.max_wait);
            assert!(policy.delay(attempt) >= policy.backoff(attempt).min(policy.max_wait));
        }
    }

    #[tokio::test]
    async fn succeeds_first_try() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::immediate(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = &AtomicU32::new(0);
        let result = RetryPolicy::immediate(3)
            .run("test", move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(server_error()) } else { Ok(n) }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_become_transient_network() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), ApiError> = RetryPolicy::immediate(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(server_error())
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result.unwrap_err() {
            ApiError::TransientNetwork { attempts, last, .. } => {
                assert_eq!(attempts, 3);
                assert!(last.contains("boom"));
            }
            other => panic!("expected TransientNetwork, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn authentication_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<(), ApiError> = RetryPolicy::immediate(3)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Authentication {
                    service: "test",
                    detail: "bad key".to_string(),
                })
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(ApiError::Authentication { .. })));
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let calls = &AtomicU32::new(0);
        let _ = RetryPolicy::immediate(0)
            .run("test", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>(())
            })
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_attempts() {
        let policy = RetryPolicy {
            max_attempts: 2,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(1),
        };
        let started = tokio::time::Instant::now();
        let _: Result<(), ApiError> = policy.run("test", || async { Err(server_error()) }).await;
        assert!(started.elapsed() >= Duration::from_secs(1));
    }
}
