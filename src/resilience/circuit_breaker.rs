//! Three-state circuit breaker isolating a failing provider.

use crate::{Error, Result};
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before probing.
    pub reset_timeout: Duration,
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self {
            failure_threshold: 5,
            reset_timeout: Duration::from_millis(60_000),
        }
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub reset_timeout_ms: u64,
}

#[derive(Debug)]
struct State {
    circuit: CircuitState,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
}

/// Failure-isolation gate wrapping the retrying provider call.
///
/// Closed → (threshold consecutive failures) → Open → (reset timeout
/// elapses, next call) → HalfOpen → Closed on success, back to Open on
/// failure.
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State {
                circuit: CircuitState::Closed,
                consecutive_failures: 0,
                last_failure: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `operation` under the breaker. Raises [`Error::CircuitOpen`]
    /// without invoking the operation while the circuit is open and the
    /// reset timeout has not elapsed.
    pub async fn execute<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.check_permit()?;
        match operation().await {
            Ok(value) => {
                self.on_success();
                Ok(value)
            }
            Err(err) => {
                if err.counts_against_breaker() {
                    self.on_failure();
                }
                Err(err)
            }
        }
    }

    fn check_permit(&self) -> Result<()> {
        let mut st = self.lock();
        if st.circuit == CircuitState::Open {
            let since_failure = st.last_failure.map(|t| t.elapsed());
            match since_failure {
                Some(elapsed) if elapsed < self.cfg.reset_timeout => {
                    let remaining = self.cfg.reset_timeout - elapsed;
                    return Err(Error::CircuitOpen {
                        open_remaining_ms: remaining.as_millis() as u64,
                    });
                }
                _ => {
                    // Cooldown elapsed, allow a probe.
                    st.circuit = CircuitState::HalfOpen;
                }
            }
        }
        Ok(())
    }

    fn on_success(&self) {
        let mut st = self.lock();
        st.consecutive_failures = 0;
        if st.circuit == CircuitState::HalfOpen {
            st.circuit = CircuitState::Closed;
        }
    }

    fn on_failure(&self) {
        let mut st = self.lock();
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        st.last_failure = Some(Instant::now());
        if st.consecutive_failures >= self.cfg.failure_threshold
            || st.circuit == CircuitState::HalfOpen
        {
            st.circuit = CircuitState::Open;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().circuit
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let st = self.lock();
        CircuitBreakerSnapshot {
            state: st.circuit,
            consecutive_failures: st.consecutive_failures,
            failure_threshold: self.cfg.failure_threshold,
            reset_timeout_ms: self.cfg.reset_timeout.as_millis() as u64,
        }
    }

    pub fn reset(&self) {
        let mut st = self.lock();
        st.circuit = CircuitState::Closed;
        st.consecutive_failures = 0;
        st.last_failure = None;
    }
}
