//! Scenario execution: the per-VU unit of work.
//!
//! A `Scenario` is one full iteration of grouped HTTP interactions. The
//! scheduler runs each virtual user in a loop that repeats iterations until
//! a stop signal arrives; the signal is honored only between iterations, so
//! a VU always finishes all groups of the iteration it started.

use crate::check::{check, check_with};
use crate::client::{HttpClient, HttpResponse};
use crate::metrics::{
    Metrics, GROUP_DURATION, HTTP_REQ_DURATION, HTTP_REQ_FAILED, ITERATIONS,
};
use crate::sampler::Sampler;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-VU execution context handed to scenarios.
///
/// Owns the VU's HTTP client handle, its sampler, and a shared reference to
/// the metrics sink. All request plumbing (latency trend, transport-failure
/// rate) happens here so scenarios only express the workload.
pub struct VuContext {
    /// Identifier of the owning virtual user (unique within a run).
    pub vu_id: u64,
    client: HttpClient,
    metrics: Arc<Metrics>,
    sampler: Box<dyn Sampler>,
    think_time: Duration,
}

impl VuContext {
    /// Create a context for one virtual user.
    pub fn new(
        vu_id: u64,
        client: HttpClient,
        metrics: Arc<Metrics>,
        sampler: Box<dyn Sampler>,
        think_time: Duration,
    ) -> Self {
        Self {
            vu_id,
            client,
            metrics,
            sampler,
            think_time,
        }
    }

    /// The shared metrics sink.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Issue a GET relative to the base URL, recording latency and the
    /// transport-failure rate sample. Never fails: transport errors come
    /// back as a status-0 placeholder response.
    pub async fn get(&self, path: &str) -> HttpResponse {
        let response = self.client.get(path).await;
        self.metrics.add_trend(HTTP_REQ_DURATION, response.duration);
        self.metrics.add_rate(HTTP_REQ_FAILED, response.transport_failed);
        if response.transport_failed {
            tracing::debug!(vu = self.vu_id, path, "request failed in transport");
        }
        response
    }

    /// Record a named check outcome.
    pub fn check(&self, name: &str, passed: bool) -> bool {
        check(&self.metrics, name, passed)
    }

    /// Evaluate a predicate against a response as a named check.
    pub fn check_with<F>(&self, name: &str, response: &HttpResponse, predicate: F) -> bool
    where
        F: FnOnce(&HttpResponse) -> bool,
    {
        check_with(&self.metrics, name, response, predicate)
    }

    /// Draw an integer decision from the VU's sampler.
    pub fn int_between(&mut self, lo: i64, hi: i64) -> i64 {
        self.sampler.int_between(lo, hi)
    }

    /// Draw a probabilistic decision from the VU's sampler.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.sampler.chance(probability)
    }

    /// Simulated user think-time: suspends only this VU's task.
    pub async fn pause(&self) {
        tokio::time::sleep(self.think_time).await;
    }
}

/// One iteration of a virtual user's workload.
#[async_trait]
pub trait Scenario: Send + Sync {
    /// Execute a single full iteration (all groups, in order).
    async fn iteration(&self, cx: &mut VuContext);
}

/// The fixed bookstore scenario from the original workload.
///
/// Four groups per iteration, strictly in order, each followed by a
/// think-time pause:
/// 1. Static endpoints: `/` and `/health`
/// 2. Book listing: `/books`
/// 3. Single book operations: `/books/{id}` for a random id in [1,3],
///    then `/books/999` expecting a 404 (no pause between the two calls)
/// 4. Error simulation: `/error` with probability 0.3
#[derive(Debug, Default)]
pub struct BookstoreScenario;

/// Probability that an iteration hits the error-simulation endpoint.
const ERROR_SIMULATION_PROBABILITY: f64 = 0.3;

/// Id requested in the not-found probe; the catalog holds ids 1..=3.
const NON_EXISTENT_BOOK_ID: i64 = 999;

/// Time one group's body, record its duration trend, then pause.
macro_rules! group {
    ($cx:expr, $name:expr, $body:expr) => {{
        let start = Instant::now();
        $body;
        $cx.metrics()
            .add_trend(&format!("{GROUP_DURATION}{{{}}}", $name), start.elapsed());
        $cx.pause().await;
    }};
}

#[async_trait]
impl Scenario for BookstoreScenario {
    async fn iteration(&self, cx: &mut VuContext) {
        group!(cx, "Static endpoints", self.static_endpoints(cx).await);
        group!(cx, "Book listing", self.book_listing(cx).await);
        group!(
            cx,
            "Single book operations",
            self.single_book_operations(cx).await
        );
        group!(cx, "Error simulation", self.error_simulation(cx).await);
        cx.metrics().add_count(ITERATIONS, 1);
    }
}

impl BookstoreScenario {
    async fn static_endpoints(&self, cx: &mut VuContext) {
        let root = cx.get("/").await;
        cx.check_with("root status is 200", &root, |r| r.status == 200);
        cx.check_with("root response time < 200ms", &root, |r| {
            r.duration < Duration::from_millis(200)
        });

        let health = cx.get("/health").await;
        cx.check_with("health status is 200", &health, |r| r.status == 200);
        cx.check_with("health response has status ok", &health, |r| {
            r.json().is_some_and(|v| v["status"] == "ok")
        });
    }

    async fn book_listing(&self, cx: &mut VuContext) {
        let books = cx.get("/books").await;
        cx.check_with("books status is 200", &books, |r| r.status == 200);
        cx.check_with("books response is an array", &books, |r| {
            r.json().is_some_and(|v| v.is_array())
        });
        cx.check_with("books response time < 300ms", &books, |r| {
            r.duration < Duration::from_millis(300)
        });
    }

    async fn single_book_operations(&self, cx: &mut VuContext) {
        let book_id = cx.int_between(1, 3);
        let book = cx.get(&format!("/books/{book_id}")).await;
        cx.check_with("single book status is 200", &book, |r| r.status == 200);
        cx.check_with("single book has correct id", &book, |r| {
            r.json().is_some_and(|v| v["id"] == book_id)
        });

        let missing = cx.get(&format!("/books/{NON_EXISTENT_BOOK_ID}")).await;
        cx.check_with("non-existent book returns 404", &missing, |r| {
            r.status == 404
        });
    }

    async fn error_simulation(&self, cx: &mut VuContext) {
        if cx.chance(ERROR_SIMULATION_PROBABILITY) {
            let error = cx.get("/error").await;
            cx.check_with("error endpoint responded", &error, |r| {
                r.is_success() || r.is_server_error()
            });
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::metrics::CHECKS;
    use crate::sampler::SequenceSampler;

    fn context(metrics: Arc<Metrics>, sampler: SequenceSampler) -> VuContext {
        VuContext::new(
            1,
            HttpClient::new("http://127.0.0.1:1"),
            metrics,
            Box::new(sampler),
            Duration::ZERO,
        )
    }

    #[tokio::test]
    async fn test_iteration_never_aborts_on_unreachable_target() {
        // Every request fails in transport; the iteration still completes
        // all four groups and records its checks as failures.
        let metrics = Arc::new(Metrics::new());
        let mut cx = context(
            Arc::clone(&metrics),
            SequenceSampler::new(vec![2], vec![true]),
        );

        BookstoreScenario.iteration(&mut cx).await;

        let snap = metrics.snapshot();
        assert_eq!(snap.get(ITERATIONS).unwrap().count, 1);
        // 6 requests (incl. the probabilistic /error hit), all failed.
        assert_eq!(snap.get(HTTP_REQ_FAILED).unwrap().count, 6);
        assert!((snap.get(HTTP_REQ_FAILED).unwrap().rate - 1.0).abs() < 1e-9);
        // Status checks all fail on the placeholder responses.
        assert_eq!(snap.checks["root status is 200"].fails, 1);
        assert_eq!(snap.checks["non-existent book returns 404"].fails, 1);
    }

    #[tokio::test]
    async fn test_error_group_skipped_when_chance_misses() {
        let metrics = Arc::new(Metrics::new());
        let mut cx = context(
            Arc::clone(&metrics),
            SequenceSampler::new(vec![1], vec![false]),
        );

        BookstoreScenario.iteration(&mut cx).await;

        let snap = metrics.snapshot();
        // 5 requests: /, /health, /books, /books/1, /books/999.
        assert_eq!(snap.get(HTTP_REQ_FAILED).unwrap().count, 5);
        assert!(!snap.checks.contains_key("error endpoint responded"));
    }

    #[tokio::test]
    async fn test_error_branch_follows_sampler_exactly() {
        // Deterministic branch sequence: exactly 2 of 5 iterations hit the
        // error endpoint.
        let metrics = Arc::new(Metrics::new());
        let mut cx = context(
            Arc::clone(&metrics),
            SequenceSampler::new(vec![1], vec![true, false, false, true, false]),
        );

        for _ in 0..5 {
            BookstoreScenario.iteration(&mut cx).await;
        }

        let snap = metrics.snapshot();
        let tally = snap.checks["error endpoint responded"];
        assert_eq!(tally.passes + tally.fails, 2);
        assert_eq!(snap.get(ITERATIONS).unwrap().count, 5);
    }

    #[tokio::test]
    async fn test_group_durations_recorded_per_group() {
        let metrics = Arc::new(Metrics::new());
        let mut cx = context(
            Arc::clone(&metrics),
            SequenceSampler::new(vec![3], vec![false]),
        );

        BookstoreScenario.iteration(&mut cx).await;

        let snap = metrics.snapshot();
        for group in [
            "group_duration{Static endpoints}",
            "group_duration{Book listing}",
            "group_duration{Single book operations}",
            "group_duration{Error simulation}",
        ] {
            assert_eq!(snap.get(group).unwrap().count, 1, "missing {group}");
        }
    }

    #[tokio::test]
    async fn test_checks_rate_covers_all_checks() {
        let metrics = Arc::new(Metrics::new());
        let mut cx = context(
            Arc::clone(&metrics),
            SequenceSampler::new(vec![2], vec![false]),
        );

        BookstoreScenario.iteration(&mut cx).await;

        // 4 static + 3 listing + 3 single-book checks, error group skipped.
        let snap = metrics.snapshot();
        assert_eq!(snap.get(CHECKS).unwrap().count, 10);
    }
}
