//! Cargar: Staged-Ramp HTTP Load Testing
//!
//! Cargar (Spanish: "to load") drives a staged virtual-user workload against
//! an HTTP service and judges the run against declarative thresholds.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     CARGAR Architecture                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌─────────┐  │
//! │  │ Stage     │   │ Ramp      │   │ VU tasks │   │ Metrics │  │
//! │  │ Profile   │──►│ Scheduler │──►│ running  │──►│ Sink    │  │
//! │  │ target(t) │   │ (tick)    │   │ Scenario │   │         │  │
//! │  └───────────┘   └───────────┘   └──────────┘   └────┬────┘  │
//! │                                                      ▼       │
//! │                              ┌────────────┐   ┌────────────┐ │
//! │                              │ RunSummary │◄──│ Threshold  │ │
//! │                              │ + Report   │   │ Evaluation │ │
//! │                              └────────────┘   └────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cargar::{BookstoreScenario, RunConfig, Runner};
//! use std::sync::Arc;
//!
//! # async fn demo() -> cargar::CargarResult<()> {
//! let config = RunConfig::bookstore("http://localhost:8000")?;
//! let summary = Runner::new(config)
//!     .run(Arc::new(BookstoreScenario))
//!     .await?;
//! assert!(summary.passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod check;
mod client;
mod error;
mod metrics;
mod report;
mod runner;
mod sampler;
mod scenario;
mod scheduler;
mod stage;
mod threshold;

pub use check::{check, check_with};
pub use client::{HttpClient, HttpResponse};
pub use error::{CargarError, CargarResult};
pub use metrics::{
    Aggregate, CheckTally, Metrics, MetricsSnapshot, CHECKS, GROUP_DURATION, HTTP_REQ_DURATION,
    HTTP_REQ_FAILED, ITERATIONS, VUS,
};
pub use report::{render_run_json, render_run_report};
pub use runner::{RunConfig, RunSummary, Runner, Verdict};
pub use sampler::{RandomSampler, Sampler, SequenceSampler};
pub use scenario::{BookstoreScenario, Scenario, VuContext};
pub use scheduler::{Anomaly, Progress, RampScheduler, DEFAULT_GRACE, DEFAULT_TICK};
pub use stage::{Stage, StageProfile};
pub use threshold::{evaluate_all, Op, Stat, Threshold, ThresholdVerdict};
