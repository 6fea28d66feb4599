//! Bounded retries with exponential backoff and jitter.

use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Backoff base; attempt `n` waits `base * 2^n` plus jitter.
    pub base_delay: Duration,
}

impl RetryConfig {
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Retry wrapper around a single provider attempt.
///
/// Only errors classified retryable ([`Error::is_retryable`]) consume
/// further attempts; anything else aborts on first sight.
pub struct RetryPolicy {
    cfg: RetryConfig,
}

impl RetryPolicy {
    pub fn new(cfg: RetryConfig) -> Self {
        Self { cfg }
    }

    /// Run `operation` until it succeeds, exhausting at most
    /// `max_attempts` tries, sleeping between attempts but not after the
    /// last. The last observed error is surfaced on exhaustion.
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error: Option<Error> = None;

        for attempt in 0..self.cfg.max_attempts {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() {
                        return Err(err);
                    }

                    debug!(attempt, error = %err, "retryable attempt failed");
                    last_error = Some(err);

                    if attempt + 1 < self.cfg.max_attempts {
                        let delay = self.backoff(attempt);
                        tokio::select! {
                            _ = cancel.cancelled() => return Err(Error::Cancelled),
                            _ = tokio::time::sleep(delay) => {}
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::runtime("max retries exceeded")))
    }

    /// `base * 2^attempt` plus 0..1000ms of jitter, uncapped.
    fn backoff(&self, attempt: u32) -> Duration {
        let base = self.cfg.base_delay.as_millis() as u64;
        let exponential = base.saturating_mul(1u64.checked_shl(attempt).unwrap_or(u64::MAX));
        let jitter = fastrand::u64(0..1000);
        Duration::from_millis(exponential.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            RetryConfig::new()
                .with_max_attempts(attempts)
                .with_base_delay(Duration::from_millis(1)),
        )
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let policy = fast_policy(3);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result = policy
            .execute(&cancel, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::from_status(429, "slow down"))
                } else {
                    Ok(42u32)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_aborts_on_first_attempt() {
        let policy = fast_policy(3);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .execute(&cancel, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::from_status(404, "missing"))
            })
            .await;

        assert!(matches!(result, Err(Error::Remote { status: 404, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhaustion_surfaces_last_error() {
        let policy = fast_policy(3);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<()> = policy
            .execute(&cancel, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::from_status(503, "down"))
            })
            .await;

        assert!(matches!(result, Err(Error::Transient { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancelled_token_stops_between_attempts() {
        let policy = RetryPolicy::new(
            RetryConfig::new()
                .with_max_attempts(3)
                .with_base_delay(Duration::from_secs(30)),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: Result<()> = policy
            .execute(&cancel, || async { Err(Error::from_status(429, "busy")) })
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn backoff_grows_exponentially() {
        let policy = fast_policy(5);
        // 1ms base: attempt 0 in [1,1001), attempt 3 in [8,1008).
        let d0 = policy.backoff(0).as_millis();
        let d3 = policy.backoff(3).as_millis();
        assert!((1..1001).contains(&d0));
        assert!((8..1008).contains(&d3));
    }
}
