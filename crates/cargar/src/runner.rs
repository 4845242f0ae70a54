//! Run controller: wires configuration, scheduler, metrics, and thresholds
//! into one complete load-test run.
//!
//! `Runner::run` validates the configuration, drives the ramp schedule to
//! completion, snapshots the metric sink, evaluates every threshold, and
//! folds the results into a `RunSummary` with a single overall verdict.

use crate::client::HttpClient;
use crate::error::{CargarError, CargarResult};
use crate::metrics::{CheckTally, Metrics, MetricsSnapshot};
use crate::sampler::{RandomSampler, Sampler};
use crate::scenario::Scenario;
use crate::scheduler::{Anomaly, Progress, RampScheduler, DEFAULT_GRACE, DEFAULT_TICK};
use crate::stage::StageProfile;
use crate::threshold::{evaluate_all, Threshold, ThresholdVerdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Everything needed to start a run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Base URL of the target service.
    pub base_url: String,
    /// Staged ramp schedule.
    pub profile: StageProfile,
    /// Pass/fail criteria evaluated at the end of the run.
    pub thresholds: Vec<Threshold>,
    /// Simulated user think-time after each group.
    pub think_time: Duration,
    /// Scheduler reconciliation tick.
    pub tick: Duration,
    /// Grace period for stragglers after the last stage.
    pub grace: Duration,
    /// Optional seed for deterministic scenario randomness.
    pub seed: Option<u64>,
}

impl RunConfig {
    /// The original bookstore workload configuration against a base URL.
    pub fn bookstore(base_url: impl Into<String>) -> CargarResult<Self> {
        Ok(Self {
            base_url: base_url.into(),
            profile: StageProfile::bookstore_default(),
            thresholds: Self::default_thresholds()?,
            think_time: Duration::from_secs(1),
            tick: DEFAULT_TICK,
            grace: DEFAULT_GRACE,
            seed: None,
        })
    }

    /// The original workload's thresholds: p95 latency under 500ms and a
    /// transport failure rate under 1%.
    pub fn default_thresholds() -> CargarResult<Vec<Threshold>> {
        Ok(vec![
            Threshold::parse(crate::metrics::HTTP_REQ_DURATION, "p(95)<500")?,
            Threshold::parse(crate::metrics::HTTP_REQ_FAILED, "rate<0.01")?,
        ])
    }

    /// Validate the configuration before starting a run.
    pub fn validate(&self) -> CargarResult<()> {
        if self.base_url.is_empty() {
            return Err(CargarError::config("base_url must not be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(CargarError::config(format!(
                "base_url '{}' must start with http:// or https://",
                self.base_url
            )));
        }
        self.profile.validate()?;
        if self.tick.is_zero() {
            return Err(CargarError::config("scheduler tick must be positive"));
        }
        Ok(())
    }
}

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Every threshold held.
    Passed,
    /// At least one threshold failed.
    Failed,
}

/// Complete results of one load-test run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Overall pass/fail outcome.
    pub verdict: Verdict,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the whole run, grace period included.
    pub duration: Duration,
    /// Per-threshold verdicts with observed values.
    pub thresholds: Vec<ThresholdVerdict>,
    /// Check tallies sorted by name.
    pub checks: Vec<(String, CheckTally)>,
    /// Final aggregate of every metric.
    pub metrics: MetricsSnapshot,
    /// Scheduler anomalies (VUs that had to be forcibly terminated).
    pub anomalies: Vec<Anomaly>,
}

impl RunSummary {
    /// Whether the run passed.
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }
}

/// Executes a configured run against a scenario.
pub struct Runner {
    config: RunConfig,
    progress: Option<watch::Sender<Progress>>,
}

impl Runner {
    /// Create a runner for the given configuration.
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            progress: None,
        }
    }

    /// Subscribe to live scheduler progress (one update per tick).
    pub fn progress(&mut self) -> watch::Receiver<Progress> {
        let (tx, rx) = watch::channel(Progress::default());
        self.progress = Some(tx);
        rx
    }

    /// The configuration this runner was built with.
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Execute the full run and produce its summary.
    pub async fn run(self, scenario: Arc<dyn Scenario>) -> CargarResult<RunSummary> {
        self.config.validate()?;

        let started_at = Utc::now();
        let start = Instant::now();
        tracing::info!(
            base_url = %self.config.base_url,
            stages = self.config.profile.stages().len(),
            total = ?self.config.profile.total_duration(),
            "starting load test"
        );

        let metrics = Arc::new(Metrics::new());
        let client = HttpClient::new(self.config.base_url.clone());
        let scheduler = RampScheduler::with_timing(
            self.config.profile.clone(),
            self.config.tick,
            self.config.grace,
        );

        let seed = self.config.seed;
        let sampler_factory = move |vu_id: u64| -> Box<dyn Sampler> {
            match seed {
                Some(s) => Box::new(RandomSampler::seeded(s.wrapping_add(vu_id))),
                None => Box::new(RandomSampler::from_entropy()),
            }
        };

        let anomalies = scheduler
            .run(
                scenario,
                client,
                Arc::clone(&metrics),
                self.config.think_time,
                sampler_factory,
                self.progress,
            )
            .await;

        let snapshot = metrics.snapshot();
        let thresholds = evaluate_all(&self.config.thresholds, &snapshot);
        let verdict = if thresholds.iter().all(|v| v.passed) {
            Verdict::Passed
        } else {
            Verdict::Failed
        };

        for verdict in &thresholds {
            tracing::info!(
                threshold = %verdict.threshold,
                observed = ?verdict.observed,
                passed = verdict.passed,
                "threshold evaluated"
            );
        }
        if !anomalies.is_empty() {
            tracing::warn!(count = anomalies.len(), "run finished with anomalies");
        }

        Ok(RunSummary {
            verdict,
            started_at,
            duration: start.elapsed(),
            thresholds,
            checks: snapshot.checks_sorted(),
            metrics: snapshot,
            anomalies,
        })
    }
}
