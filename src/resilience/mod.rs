//! Resilience primitives and their composition.
//!
//! One [`ResilienceStack`] is created per client and shared (`Arc`) into
//! every facade: the token bucket, circuit state and telemetry buffer are
//! process-local, never global, so independent clients coexist in one
//! process.

pub mod circuit_breaker;
pub mod rate_limiter;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState,
};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use retry::{RetryConfig, RetryPolicy};

use crate::telemetry::{TelemetryCollector, TelemetryConfig};
use tokio_util::sync::CancellationToken;

/// Shared resilience state for one client: rate limiter, circuit breaker,
/// retry policy, telemetry and the cooperative cancellation token.
pub struct ResilienceStack {
    pub rate_limiter: RateLimiter,
    pub circuit_breaker: CircuitBreaker,
    pub retry: RetryPolicy,
    pub telemetry: TelemetryCollector,
    cancel: CancellationToken,
}

impl ResilienceStack {
    pub fn new(
        retry: RetryConfig,
        circuit: CircuitBreakerConfig,
        rate: RateLimiterConfig,
        telemetry: TelemetryConfig,
    ) -> Self {
        Self {
            rate_limiter: RateLimiter::new(rate),
            circuit_breaker: CircuitBreaker::new(circuit),
            retry: RetryPolicy::new(retry),
            telemetry: TelemetryCollector::new(telemetry),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel every in-flight and future suspension point. In-flight
    /// attempts are abandoned and surface [`crate::Error::Cancelled`].
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Clear circuit, rate-limiter and telemetry state.
    pub async fn reset(&self) {
        self.circuit_breaker.reset();
        self.rate_limiter.reset().await;
        self.telemetry.reset();
    }
}

impl Default for ResilienceStack {
    fn default() -> Self {
        Self::new(
            RetryConfig::default(),
            CircuitBreakerConfig::default(),
            RateLimiterConfig::default(),
            TelemetryConfig::default(),
        )
    }
}
