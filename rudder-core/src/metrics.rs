//! Synthesis metrics: attempt, success, failure and skip counters plus cost
//! and latency totals.
//!
//! The engine reports through the `MetricsSink` trait so hosts can plug in
//! their own backend. `SynthesisMetrics` is the default in-process sink; it
//! is lock-free and meant to be shared behind an `Arc`.

use crate::synthesis::FailureKind;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Receiver for synthesis lifecycle events.
pub trait MetricsSink: Send + Sync {
    /// A synthesis LLM call is about to be made. Retries do not count again.
    fn record_attempt(&self);

    /// A synthesis call produced validated insights.
    fn record_success(&self, cost_usd: f64, latency_ms: u64);

    /// A synthesis call failed after its attempt was recorded.
    fn record_failure(&self, kind: FailureKind);

    /// The gate decided not to synthesize.
    fn record_skipped(&self);
}

/// Micro-dollars per dollar; cost is accumulated as an integer.
const MICROS_PER_USD: f64 = 1_000_000.0;

/// Default lock-free metrics sink.
#[derive(Debug)]
pub struct SynthesisMetrics {
    attempts: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    llm_failures: AtomicU64,
    validation_failures: AtomicU64,
    skipped: AtomicU64,
    total_cost_micros: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
    start_time: Instant,
}

impl Default for SynthesisMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisMetrics {
    pub fn new() -> Self {
        Self {
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            llm_failures: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
            total_cost_micros: AtomicU64::new(0),
            latency_sum_ms: AtomicU64::new(0),
            latency_count: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Get a summary snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let latency_sum = self.latency_sum_ms.load(Ordering::Relaxed);
        let latency_count = self.latency_count.load(Ordering::Relaxed);
        let average_latency_ms = if latency_count == 0 {
            0.0
        } else {
            latency_sum as f64 / latency_count as f64
        };

        MetricsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            llm_failures: self.llm_failures.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            total_cost_usd: self.total_cost_micros.load(Ordering::Relaxed) as f64
                / MICROS_PER_USD,
            average_latency_ms,
            uptime_secs: self.uptime_secs(),
        }
    }
}

impl MetricsSink for SynthesisMetrics {
    fn record_attempt(&self) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_success(&self, cost_usd: f64, latency_ms: u64) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        let micros = (cost_usd.max(0.0) * MICROS_PER_USD).round() as u64;
        self.total_cost_micros.fetch_add(micros, Ordering::Relaxed);
        self.latency_sum_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.latency_count.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self, kind: FailureKind) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        match kind {
            FailureKind::Llm | FailureKind::Timeout => {
                self.llm_failures.fetch_add(1, Ordering::Relaxed);
            }
            FailureKind::Validation => {
                self.validation_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Immutable snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    /// Failures from the provider, including timeouts.
    pub llm_failures: u64,
    pub validation_failures: u64,
    pub skipped: u64,
    pub total_cost_usd: f64,
    /// Mean latency of successful calls.
    pub average_latency_ms: f64,
    pub uptime_secs: u64,
}
