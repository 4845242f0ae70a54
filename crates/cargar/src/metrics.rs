//! Concurrent-safe metric aggregation.
//!
//! The `Metrics` sink is the single piece of shared mutable state between
//! virtual users. Every VU appends through the handle; the run controller
//! takes a consistent `snapshot()` at the end (or at any point) to feed the
//! threshold evaluator and the report.
//!
//! Metric families follow the original workload's vocabulary:
//! - trend: duration samples with percentile aggregation (`http_req_duration`)
//! - rate: boolean samples aggregated to a pass fraction (`http_req_failed`)
//! - counter: monotonically increasing totals (`iterations`)
//! - gauge: last-value-wins samples (`vus`)
//! - checks: named pass/fail tallies

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Built-in metric name: request latency trend.
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
/// Built-in metric name: transport-level failure rate.
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
/// Built-in metric name: aggregate check pass rate.
pub const CHECKS: &str = "checks";
/// Built-in metric name: completed scenario iterations.
pub const ITERATIONS: &str = "iterations";
/// Built-in metric name: live virtual user gauge.
pub const VUS: &str = "vus";
/// Built-in metric name: per-group duration trend.
pub const GROUP_DURATION: &str = "group_duration";

/// One recorded trend sample: value in milliseconds plus the offset from
/// aggregator creation at which it was observed.
#[derive(Debug, Clone, Copy)]
struct Sample {
    value_ms: f64,
    #[allow(dead_code)]
    at: Duration,
}

#[derive(Debug, Default)]
struct Inner {
    trends: HashMap<String, Vec<Sample>>,
    rates: HashMap<String, RateTally>,
    counters: HashMap<String, u64>,
    gauges: HashMap<String, f64>,
    checks: HashMap<String, CheckTally>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RateTally {
    nonzero: u64,
    total: u64,
}

/// Pass/fail tally for one named check.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckTally {
    /// Number of times the check passed.
    pub passes: u64,
    /// Number of times the check failed.
    pub fails: u64,
}

impl CheckTally {
    /// Fraction of evaluations that passed (1.0 when never evaluated).
    pub fn pass_rate(&self) -> f64 {
        let total = self.passes + self.fails;
        if total == 0 {
            1.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                self.passes as f64 / total as f64
            }
        }
    }
}

/// Thread-safe metric sink shared by all virtual users.
///
/// All appends go through a single mutex-guarded map. Lock hold times are a
/// hash lookup and a push, which is negligible next to network round-trips.
#[derive(Debug)]
pub struct Metrics {
    inner: Mutex<Inner>,
    started: Instant,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create an empty sink; sample timestamps are offsets from this moment.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            started: Instant::now(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic while holding it; the data is still
        // structurally sound for aggregation.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Append a duration sample to a trend metric.
    pub fn add_trend(&self, name: &str, value: Duration) {
        let sample = Sample {
            value_ms: value.as_secs_f64() * 1000.0,
            at: self.started.elapsed(),
        };
        self.lock()
            .trends
            .entry(name.to_string())
            .or_default()
            .push(sample);
    }

    /// Append a boolean sample to a rate metric.
    pub fn add_rate(&self, name: &str, nonzero: bool) {
        let mut inner = self.lock();
        let tally = inner.rates.entry(name.to_string()).or_default();
        tally.total += 1;
        if nonzero {
            tally.nonzero += 1;
        }
    }

    /// Increment a counter metric.
    pub fn add_count(&self, name: &str, n: u64) {
        *self.lock().counters.entry(name.to_string()).or_default() += n;
    }

    /// Set a gauge metric to its latest value.
    pub fn set_gauge(&self, name: &str, value: f64) {
        self.lock().gauges.insert(name.to_string(), value);
    }

    /// Record one pass/fail tally entry for a named check.
    ///
    /// Also feeds the aggregate `checks` rate metric.
    pub fn record_check(&self, name: &str, passed: bool) {
        let mut inner = self.lock();
        let tally = inner.checks.entry(name.to_string()).or_default();
        if passed {
            tally.passes += 1;
        } else {
            tally.fails += 1;
        }
        let rate = inner.rates.entry(CHECKS.to_string()).or_default();
        rate.total += 1;
        if passed {
            rate.nonzero += 1;
        }
    }

    /// A consistent aggregate over all samples recorded so far.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();

        let mut metrics = HashMap::new();
        for (name, samples) in &inner.trends {
            let values: Vec<f64> = samples.iter().map(|s| s.value_ms).collect();
            metrics.insert(name.clone(), Aggregate::from_trend(&values));
        }
        for (name, tally) in &inner.rates {
            metrics.insert(name.clone(), Aggregate::from_rate(tally.nonzero, tally.total));
        }
        for (name, count) in &inner.counters {
            metrics.insert(name.clone(), Aggregate::from_counter(*count));
        }
        for (name, value) in &inner.gauges {
            metrics.insert(name.clone(), Aggregate::from_gauge(*value));
        }

        MetricsSnapshot {
            metrics,
            checks: inner.checks.clone(),
        }
    }
}

/// Point-in-time aggregate view of every metric and check tally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Aggregates keyed by metric name.
    pub metrics: HashMap<String, Aggregate>,
    /// Pass/fail tallies keyed by check name.
    pub checks: HashMap<String, CheckTally>,
}

impl MetricsSnapshot {
    /// Look up an aggregate by metric name.
    pub fn get(&self, name: &str) -> Option<&Aggregate> {
        self.metrics.get(name)
    }

    /// Check tallies sorted by name, for deterministic reporting.
    pub fn checks_sorted(&self) -> Vec<(String, CheckTally)> {
        let mut out: Vec<_> = self
            .checks
            .iter()
            .map(|(name, tally)| (name.clone(), *tally))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// Aggregated statistics for one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregate {
    /// Number of samples (trend), total observations (rate), or total (counter).
    pub count: u64,
    /// Mean of trend samples in milliseconds.
    pub avg_ms: f64,
    /// Minimum trend sample in milliseconds.
    pub min_ms: f64,
    /// Maximum trend sample in milliseconds.
    pub max_ms: f64,
    /// Median trend sample in milliseconds.
    pub p50_ms: f64,
    /// 90th percentile in milliseconds.
    pub p90_ms: f64,
    /// 95th percentile in milliseconds.
    pub p95_ms: f64,
    /// 99th percentile in milliseconds.
    pub p99_ms: f64,
    /// Fraction of nonzero samples for rate metrics (0.0 otherwise).
    pub rate: f64,
    /// Last observed value for gauge metrics.
    pub last: f64,
}

impl Aggregate {
    fn zeroed() -> Self {
        Self {
            count: 0,
            avg_ms: 0.0,
            min_ms: 0.0,
            max_ms: 0.0,
            p50_ms: 0.0,
            p90_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            rate: 0.0,
            last: 0.0,
        }
    }

    fn from_trend(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::zeroed();
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let sum: f64 = sorted.iter().sum();
        #[allow(clippy::cast_precision_loss)]
        let avg = sum / sorted.len() as f64;
        Self {
            count: sorted.len() as u64,
            avg_ms: avg,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            p50_ms: percentile(&sorted, 0.50),
            p90_ms: percentile(&sorted, 0.90),
            p95_ms: percentile(&sorted, 0.95),
            p99_ms: percentile(&sorted, 0.99),
            rate: 0.0,
            last: 0.0,
        }
    }

    fn from_rate(nonzero: u64, total: u64) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let rate = if total == 0 {
            0.0
        } else {
            nonzero as f64 / total as f64
        };
        Self {
            count: total,
            rate,
            ..Self::zeroed()
        }
    }

    fn from_counter(count: u64) -> Self {
        Self {
            count,
            ..Self::zeroed()
        }
    }

    fn from_gauge(value: f64) -> Self {
        Self {
            count: 1,
            last: value,
            ..Self::zeroed()
        }
    }
}

/// Compute a percentile from a sorted slice. Returns 0.0 for empty slices.
pub(crate) fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 0.95), 0.0);
    }

    #[test]
    fn test_percentile_single() {
        assert_eq!(percentile(&[42.0], 0.5), 42.0);
        assert_eq!(percentile(&[42.0], 0.99), 42.0);
    }

    #[test]
    fn test_percentile_multiple() {
        let data: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&data, 0.50), 51.0);
        assert_eq!(percentile(&data, 0.95), 95.0);
        assert_eq!(percentile(&data, 0.99), 99.0);
    }

    #[test]
    fn test_trend_aggregate() {
        let metrics = Metrics::new();
        for ms in [10u64, 20, 30, 40, 50] {
            metrics.add_trend(HTTP_REQ_DURATION, Duration::from_millis(ms));
        }
        let snap = metrics.snapshot();
        let agg = snap.get(HTTP_REQ_DURATION).unwrap();
        assert_eq!(agg.count, 5);
        assert_eq!(agg.min_ms, 10.0);
        assert_eq!(agg.max_ms, 50.0);
        assert_eq!(agg.avg_ms, 30.0);
        assert_eq!(agg.p50_ms, 30.0);
    }

    #[test]
    fn test_rate_aggregate() {
        let metrics = Metrics::new();
        metrics.add_rate(HTTP_REQ_FAILED, false);
        metrics.add_rate(HTTP_REQ_FAILED, false);
        metrics.add_rate(HTTP_REQ_FAILED, true);
        metrics.add_rate(HTTP_REQ_FAILED, false);
        let snap = metrics.snapshot();
        let agg = snap.get(HTTP_REQ_FAILED).unwrap();
        assert_eq!(agg.count, 4);
        assert_eq!(agg.rate, 0.25);
    }

    #[test]
    fn test_counter_and_gauge() {
        let metrics = Metrics::new();
        metrics.add_count(ITERATIONS, 3);
        metrics.add_count(ITERATIONS, 2);
        metrics.set_gauge(VUS, 7.0);
        metrics.set_gauge(VUS, 12.0);
        let snap = metrics.snapshot();
        assert_eq!(snap.get(ITERATIONS).unwrap().count, 5);
        assert_eq!(snap.get(VUS).unwrap().last, 12.0);
    }

    #[test]
    fn test_record_check_feeds_checks_rate() {
        let metrics = Metrics::new();
        metrics.record_check("health status is 200", true);
        metrics.record_check("health status is 200", true);
        metrics.record_check("health status is 200", false);
        let snap = metrics.snapshot();

        let tally = snap.checks.get("health status is 200").unwrap();
        assert_eq!(tally.passes, 2);
        assert_eq!(tally.fails, 1);
        assert!((tally.pass_rate() - 2.0 / 3.0).abs() < 1e-9);

        let checks = snap.get(CHECKS).unwrap();
        assert_eq!(checks.count, 3);
        assert!((checks.rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_checks_sorted_deterministic() {
        let metrics = Metrics::new();
        metrics.record_check("zebra", true);
        metrics.record_check("alpha", false);
        let sorted = metrics.snapshot().checks_sorted();
        assert_eq!(sorted[0].0, "alpha");
        assert_eq!(sorted[1].0, "zebra");
    }

    #[test]
    fn test_snapshot_of_empty_sink() {
        let snap = Metrics::new().snapshot();
        assert!(snap.metrics.is_empty());
        assert!(snap.checks.is_empty());
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let metrics = Arc::new(Metrics::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let m = Arc::clone(&metrics);
            handles.push(std::thread::spawn(move || {
                for _ in 0..1000 {
                    m.add_trend(HTTP_REQ_DURATION, Duration::from_millis(1));
                    m.add_count(ITERATIONS, 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        let snap = metrics.snapshot();
        assert_eq!(snap.get(HTTP_REQ_DURATION).unwrap().count, 8000);
        assert_eq!(snap.get(ITERATIONS).unwrap().count, 8000);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = Metrics::new();
        metrics.add_trend(HTTP_REQ_DURATION, Duration::from_millis(15));
        metrics.record_check("root status is 200", true);
        let snap = metrics.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("http_req_duration"));
        let back: MetricsSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get(HTTP_REQ_DURATION).unwrap().count, 1);
    }
}
