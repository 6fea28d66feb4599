//! Token-bucket admission gate.
//!
//! Every facade call acquires one token before doing anything else. This is
//! purely a delay mechanism: `acquire` never fails on its own, it only
//! suspends (or surfaces cancellation).

use crate::{Error, Result};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum tokens the bucket can hold.
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_per_sec: f64,
}

impl RateLimiterConfig {
    pub fn new() -> Self {
        Self {
            capacity: 100.0,
            refill_per_sec: 10.0,
        }
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = f64::from(capacity).max(1.0);
        self
    }

    pub fn with_refill_rate(mut self, per_sec: f64) -> Self {
        if per_sec.is_finite() && per_sec > 0.0 {
            self.refill_per_sec = per_sec;
        }
        self
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
struct State {
    tokens: f64,
    last_refill: Instant,
}

/// Token-bucket rate limiter shared by every facade of one client.
///
/// Invariant: `0 <= tokens <= capacity`.
pub struct RateLimiter {
    cfg: RateLimiterConfig,
    state: Mutex<State>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimiterConfig) -> Self {
        let tokens = cfg.capacity;
        Self {
            cfg,
            state: Mutex::new(State {
                tokens,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill_locked(cfg: &RateLimiterConfig, st: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(st.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            st.tokens = (st.tokens + elapsed * cfg.refill_per_sec).min(cfg.capacity);
            st.last_refill = now;
        }
    }

    /// Acquire one token, sleeping until the bucket can cover it.
    ///
    /// When the bucket is empty the caller waits out the missing fraction and
    /// then pessimistically leaves the bucket at zero: the waiter consumes
    /// exactly the fractional token it was short of.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        let wait = {
            let mut st = self.state.lock().await;
            Self::refill_locked(&self.cfg, &mut st);
            if st.tokens >= 1.0 {
                st.tokens -= 1.0;
                return Ok(());
            }
            Duration::from_secs_f64((1.0 - st.tokens) / self.cfg.refill_per_sec)
        };

        tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }

        let mut st = self.state.lock().await;
        st.tokens = 0.0;
        Ok(())
    }

    /// Whole tokens currently available, after a refresh.
    pub async fn available_tokens(&self) -> u32 {
        let mut st = self.state.lock().await;
        Self::refill_locked(&self.cfg, &mut st);
        st.tokens.floor() as u32
    }

    /// Restore the bucket to full capacity.
    pub async fn reset(&self) {
        let mut st = self.state.lock().await;
        st.tokens = self.cfg.capacity;
        st.last_refill = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_and_defaults() {
        let cfg = RateLimiterConfig::new();
        assert_eq!(cfg.capacity, 100.0);
        assert_eq!(cfg.refill_per_sec, 10.0);

        let cfg = RateLimiterConfig::new().with_capacity(5).with_refill_rate(2.0);
        assert_eq!(cfg.capacity, 5.0);
        assert_eq!(cfg.refill_per_sec, 2.0);
    }

    #[test]
    fn config_rejects_invalid_refill_rate() {
        let cfg = RateLimiterConfig::new().with_refill_rate(0.0);
        assert_eq!(cfg.refill_per_sec, 10.0);
        let cfg = RateLimiterConfig::new().with_refill_rate(f64::NAN);
        assert_eq!(cfg.refill_per_sec, 10.0);
    }

    #[tokio::test]
    async fn burst_is_immediate() {
        let limiter =
            RateLimiter::new(RateLimiterConfig::new().with_capacity(5).with_refill_rate(1.0));
        let cancel = CancellationToken::new();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire(&cancel).await.unwrap();
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn empty_bucket_waits_one_refill_interval() {
        // 100 tokens/sec: an empty bucket should make the caller wait ~10ms.
        let limiter = RateLimiter::new(
            RateLimiterConfig::new()
                .with_capacity(1)
                .with_refill_rate(100.0),
        );
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        let start = Instant::now();
        limiter.acquire(&cancel).await.unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5), "waited {:?}", elapsed);
        assert!(elapsed < Duration::from_millis(200), "waited {:?}", elapsed);
    }

    #[tokio::test]
    async fn available_tokens_stays_in_bounds() {
        let limiter =
            RateLimiter::new(RateLimiterConfig::new().with_capacity(3).with_refill_rate(1000.0));
        let cancel = CancellationToken::new();
        assert!(limiter.available_tokens().await <= 3);
        for _ in 0..3 {
            limiter.acquire(&cancel).await.unwrap();
        }
        // Never negative, never above capacity even after heavy refill time.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(limiter.available_tokens().await <= 3);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let limiter =
            RateLimiter::new(RateLimiterConfig::new().with_capacity(4).with_refill_rate(1.0));
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();
        limiter.reset().await;
        let once = limiter.available_tokens().await;
        limiter.reset().await;
        assert_eq!(limiter.available_tokens().await, once);
        assert_eq!(once, 4);
    }

    #[tokio::test]
    async fn cancellation_surfaces_during_wait() {
        let limiter = RateLimiter::new(
            RateLimiterConfig::new()
                .with_capacity(1)
                .with_refill_rate(0.001),
        );
        let cancel = CancellationToken::new();
        limiter.acquire(&cancel).await.unwrap();

        cancel.cancel();
        let err = limiter.acquire(&cancel).await.unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }
}
