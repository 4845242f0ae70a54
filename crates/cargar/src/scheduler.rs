//! Ramp scheduler: drives the live VU population toward the staged target.
//!
//! A single tick-driven control loop recomputes `target(t)` from the stage
//! profile and reconciles the set of live VU tasks: ramp-up spawns new loops
//! tick by tick (staggered, never all at once), ramp-down delivers a
//! cooperative stop signal that VUs honor only at iteration boundaries. No
//! in-flight request is ever interrupted; a VU that ignores the signal past
//! the grace period is aborted and recorded as an anomaly.

use crate::client::HttpClient;
use crate::metrics::{Metrics, VUS};
use crate::sampler::Sampler;
use crate::scenario::{Scenario, VuContext};
use crate::stage::StageProfile;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default reconciliation tick.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);
/// Default grace period for stragglers after the last stage ends.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

/// Live progress published by the scheduler once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Progress {
    /// Time since the run started.
    pub elapsed: Duration,
    /// Currently live virtual users.
    pub live_vus: u32,
    /// Target VU count at this instant.
    pub target_vus: u32,
}

/// A scheduler inconsistency surfaced in the run summary.
///
/// Today the only source is a VU that failed to stop within the grace
/// period and was forcibly terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    /// The virtual user involved.
    pub vu_id: u64,
    /// Human-readable description.
    pub message: String,
}

/// One live virtual user owned by the scheduler.
struct VuHandle {
    id: u64,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Tick-driven controller of VU task lifecycles.
#[derive(Debug, Clone)]
pub struct RampScheduler {
    profile: StageProfile,
    tick: Duration,
    grace: Duration,
}

impl RampScheduler {
    /// Scheduler with the default tick and grace period.
    pub fn new(profile: StageProfile) -> Self {
        Self::with_timing(profile, DEFAULT_TICK, DEFAULT_GRACE)
    }

    /// Scheduler with explicit tick and grace period (tests use short ones).
    pub fn with_timing(profile: StageProfile, tick: Duration, grace: Duration) -> Self {
        Self {
            profile,
            tick,
            grace,
        }
    }

    /// The stage profile being driven.
    pub fn profile(&self) -> &StageProfile {
        &self.profile
    }

    /// Run the full ramp schedule to completion.
    ///
    /// Spawns and retires VU loops until the last stage's duration has
    /// elapsed and every VU has stopped. Returns the anomalies collected
    /// along the way (empty for a clean run).
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &self,
        scenario: Arc<dyn Scenario>,
        client: HttpClient,
        metrics: Arc<Metrics>,
        think_time: Duration,
        mut sampler_factory: impl FnMut(u64) -> Box<dyn Sampler>,
        progress: Option<watch::Sender<Progress>>,
    ) -> Vec<Anomaly> {
        let start = Instant::now();
        let total = self.profile.total_duration();
        let mut vus: Vec<VuHandle> = Vec::new();
        let mut next_id: u64 = 1;
        let mut anomalies = Vec::new();

        loop {
            let elapsed = start.elapsed();
            let target = self.profile.target_at(elapsed);

            // Reap loops that have already exited.
            vus.retain(|vu| !vu.task.is_finished());
            #[allow(clippy::cast_possible_truncation)]
            let live = vus.len() as u32;

            if live < target {
                for _ in 0..(target - live) {
                    let id = next_id;
                    next_id += 1;
                    vus.push(Self::spawn_vu(
                        id,
                        Arc::clone(&scenario),
                        client.clone(),
                        Arc::clone(&metrics),
                        think_time,
                        sampler_factory(id),
                    ));
                }
                tracing::debug!(elapsed = ?elapsed, live, target, "ramped up");
            } else if live > target {
                // Signal the newest VUs first; they finish their current
                // iteration and exit.
                for vu in vus.iter().rev().take((live - target) as usize) {
                    let _ = vu.stop.send(true);
                }
                tracing::debug!(elapsed = ?elapsed, live, target, "ramping down");
            }

            #[allow(clippy::cast_possible_truncation)]
            let live_now = vus.len() as u32;
            metrics.set_gauge(VUS, f64::from(live_now));
            if let Some(tx) = &progress {
                let _ = tx.send(Progress {
                    elapsed,
                    live_vus: live_now,
                    target_vus: target,
                });
            }

            if elapsed >= total {
                if vus.is_empty() {
                    break;
                }
                if elapsed >= total + self.grace {
                    for vu in vus.drain(..) {
                        tracing::warn!(vu = vu.id, "did not stop within grace period; aborting");
                        vu.task.abort();
                        anomalies.push(Anomaly {
                            vu_id: vu.id,
                            message: "did not stop within grace period; forcibly terminated"
                                .to_string(),
                        });
                    }
                    break;
                }
            }

            tokio::time::sleep(self.tick).await;
        }

        metrics.set_gauge(VUS, 0.0);
        if let Some(tx) = &progress {
            let _ = tx.send(Progress {
                elapsed: start.elapsed(),
                live_vus: 0,
                target_vus: 0,
            });
        }
        anomalies
    }

    fn spawn_vu(
        id: u64,
        scenario: Arc<dyn Scenario>,
        client: HttpClient,
        metrics: Arc<Metrics>,
        think_time: Duration,
        sampler: Box<dyn Sampler>,
    ) -> VuHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut cx = VuContext::new(id, client, metrics, sampler, think_time);
        let task = tokio::spawn(async move {
            tracing::debug!(vu = id, "started");
            loop {
                scenario.iteration(&mut cx).await;
                // Stop is honored only here, at the iteration boundary.
                if *stop_rx.borrow() {
                    break;
                }
            }
            tracing::debug!(vu = id, "stopped");
        });
        VuHandle {
            id,
            stop: stop_tx,
            task,
        }
    }
}
