//! Bounded in-memory telemetry: one outcome record per logical call, with
//! on-demand aggregate statistics.

use crate::provider::ProviderKind;
use crate::Error;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub enabled: bool,
    /// Oldest records are evicted once the buffer exceeds this cap.
    pub capacity: usize,
}

impl TelemetryConfig {
    pub fn new() -> Self {
        Self {
            enabled: true,
            capacity: 1000,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One logged call outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOutcome {
    pub operation: String,
    pub succeeded: bool,
    pub duration_ms: u64,
    pub transport: String,
    pub fallback_used: bool,
}

/// Aggregates over the current buffer.
///
/// Totals and the mean are computed over every record, including failures
/// (which carry duration 0); p95/p99 are computed over the successful subset
/// only, sorted ascending and indexed at `floor(n * 0.95)` / `floor(n * 0.99)`.
#[derive(Debug, Clone, Default)]
pub struct TelemetryMetrics {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub total_duration_ms: u64,
    pub average_duration_ms: f64,
    pub p95_duration_ms: u64,
    pub p99_duration_ms: u64,
    pub by_operation: HashMap<String, usize>,
    pub by_transport: HashMap<String, usize>,
}

/// Append-only, size-capped outcome log owned by one client.
pub struct TelemetryCollector {
    capacity: usize,
    enabled: AtomicBool,
    records: Mutex<VecDeque<RequestOutcome>>,
}

impl TelemetryCollector {
    pub fn new(cfg: TelemetryConfig) -> Self {
        Self {
            capacity: cfg.capacity,
            enabled: AtomicBool::new(cfg.enabled),
            records: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<RequestOutcome>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an outcome, evicting the oldest entries past the cap.
    pub fn record_request(&self, outcome: RequestOutcome) {
        if !self.is_enabled() {
            return;
        }
        let mut records = self.lock();
        records.push_back(outcome);
        while records.len() > self.capacity {
            records.pop_front();
        }
    }

    /// Record a failed outcome synthesized from an error. Duration is 0 by
    /// convention; the error itself has already been logged by the caller.
    pub fn record_error(&self, _error: &Error, operation: &str, transport: ProviderKind) {
        self.record_request(RequestOutcome {
            operation: operation.to_string(),
            succeeded: false,
            duration_ms: 0,
            transport: transport.as_str().to_string(),
            fallback_used: false,
        });
    }

    pub fn metrics(&self) -> TelemetryMetrics {
        let records = self.lock();

        let mut durations: Vec<u64> = records
            .iter()
            .filter(|r| r.succeeded)
            .map(|r| r.duration_ms)
            .collect();
        durations.sort_unstable();

        let total_requests = records.len();
        let successful_requests = durations.len();
        let failed_requests = total_requests - successful_requests;
        let total_duration_ms: u64 = records.iter().map(|r| r.duration_ms).sum();
        let average_duration_ms = if total_requests > 0 {
            total_duration_ms as f64 / total_requests as f64
        } else {
            0.0
        };

        let percentile = |q: f64| -> u64 {
            let idx = (durations.len() as f64 * q).floor() as usize;
            durations.get(idx).copied().unwrap_or(0)
        };

        let mut by_operation: HashMap<String, usize> = HashMap::new();
        let mut by_transport: HashMap<String, usize> = HashMap::new();
        for record in records.iter() {
            *by_operation.entry(record.operation.clone()).or_default() += 1;
            *by_transport.entry(record.transport.clone()).or_default() += 1;
        }

        TelemetryMetrics {
            total_requests,
            successful_requests,
            failed_requests,
            total_duration_ms,
            average_duration_ms,
            p95_duration_ms: percentile(0.95),
            p99_duration_ms: percentile(0.99),
            by_operation,
            by_transport,
        }
    }

    /// Read-only snapshot of the current buffer, oldest first.
    pub fn snapshot(&self) -> Vec<RequestOutcome> {
        self.lock().iter().cloned().collect()
    }

    pub fn reset(&self) {
        self.lock().clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(operation: &str, duration_ms: u64) -> RequestOutcome {
        RequestOutcome {
            operation: operation.to_string(),
            succeeded: true,
            duration_ms,
            transport: "sdk".to_string(),
            fallback_used: false,
        }
    }

    #[test]
    fn percentiles_use_floor_indexing_over_successes() {
        let collector = TelemetryCollector::new(TelemetryConfig::new());
        for duration in (1..=10).map(|i| i * 10) {
            collector.record_request(success("get_work_item", duration));
        }

        let metrics = collector.metrics();
        // floor(10 * 0.95) = 9 → the last (largest) element.
        assert_eq!(metrics.p95_duration_ms, 100);
        assert_eq!(metrics.p99_duration_ms, 100);
        assert_eq!(metrics.total_requests, 10);
        assert_eq!(metrics.successful_requests, 10);
        assert_eq!(metrics.average_duration_ms, 55.0);
    }

    #[test]
    fn failures_count_in_mean_but_not_percentiles() {
        let collector = TelemetryCollector::new(TelemetryConfig::new());
        collector.record_request(success("op", 100));
        collector.record_error(
            &Error::from_status(500, "boom"),
            "op",
            ProviderKind::Http,
        );

        let metrics = collector.metrics();
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.average_duration_ms, 50.0);
        // Only the one success feeds the percentile: floor(1 * 0.95) = 0.
        assert_eq!(metrics.p95_duration_ms, 100);
        assert_eq!(metrics.by_transport.get("http"), Some(&1));
        assert_eq!(metrics.by_transport.get("sdk"), Some(&1));
    }

    #[test]
    fn empty_buffer_metrics_are_zero() {
        let collector = TelemetryCollector::new(TelemetryConfig::new());
        let metrics = collector.metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.average_duration_ms, 0.0);
        assert_eq!(metrics.p95_duration_ms, 0);
    }

    #[test]
    fn buffer_evicts_oldest_past_capacity() {
        let collector = TelemetryCollector::new(TelemetryConfig::new().with_capacity(3));
        for i in 0..5 {
            collector.record_request(success(&format!("op{}", i), i));
        }
        let snapshot = collector.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0].operation, "op2");
        assert_eq!(snapshot[2].operation, "op4");
    }

    #[test]
    fn disabled_collector_records_nothing() {
        let collector = TelemetryCollector::new(TelemetryConfig::disabled());
        collector.record_request(success("op", 1));
        collector.record_error(&Error::runtime("x"), "op", ProviderKind::Sdk);
        assert_eq!(collector.metrics().total_requests, 0);

        collector.set_enabled(true);
        collector.record_request(success("op", 1));
        assert_eq!(collector.metrics().total_requests, 1);
    }

    #[test]
    fn reset_is_idempotent() {
        let collector = TelemetryCollector::new(TelemetryConfig::new());
        collector.record_request(success("op", 1));
        collector.reset();
        assert_eq!(collector.metrics().total_requests, 0);
        collector.reset();
        assert_eq!(collector.metrics().total_requests, 0);
    }
}
