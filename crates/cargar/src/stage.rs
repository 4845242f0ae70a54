//! Stage profiles: the staged ramp schedule for virtual user counts.
//!
//! A profile is an ordered list of stages, each with a duration and a target
//! VU count. Within a stage the target interpolates linearly from the
//! previous stage's target (0 before the first stage), so VU counts ramp
//! rather than jump.

use crate::error::{CargarError, CargarResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single stage of the ramp schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// How long this stage lasts.
    pub duration: Duration,
    /// VU count to reach by the end of the stage.
    pub target: u32,
}

impl Stage {
    /// Create a stage.
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

/// An ordered sequence of stages forming the full ramp schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProfile {
    stages: Vec<Stage>,
}

impl StageProfile {
    /// Build a profile from an ordered stage list.
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The stage profile from the original bookstore workload:
    /// ramp to 10 over 30s, to 20 over 1m, hold 20 for 2m, down to 0 over 30s.
    pub fn bookstore_default() -> Self {
        Self::new(vec![
            Stage::new(Duration::from_secs(30), 10),
            Stage::new(Duration::from_secs(60), 20),
            Stage::new(Duration::from_secs(120), 20),
            Stage::new(Duration::from_secs(30), 0),
        ])
    }

    /// The stages in order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Sum of all stage durations.
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Validate the profile: at least one stage, no zero-duration stages.
    pub fn validate(&self) -> CargarResult<()> {
        if self.stages.is_empty() {
            return Err(CargarError::config("stage profile must not be empty"));
        }
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.duration.is_zero() {
                return Err(CargarError::config(format!(
                    "stage {i} has zero duration"
                )));
            }
        }
        Ok(())
    }

    /// Target VU count at elapsed time `t` since run start.
    ///
    /// Linear interpolation within the active stage, from the previous
    /// stage's target (0 before the first stage) to this stage's target.
    /// Returns 0 after the total duration. Fractional targets round to the
    /// nearest whole VU.
    pub fn target_at(&self, t: Duration) -> u32 {
        let mut stage_start = Duration::ZERO;
        let mut from = 0u32;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if t < stage_end {
                let offset = (t - stage_start).as_secs_f64();
                let span = stage.duration.as_secs_f64();
                let progress = (offset / span).clamp(0.0, 1.0);
                let range = f64::from(stage.target) - f64::from(from);
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                return (f64::from(from) + range * progress).round() as u32;
            }
            stage_start = stage_end;
            from = stage.target;
        }

        // Past the last stage: the run is over.
        0
    }

    /// Whether elapsed time `t` falls in a plateau stage (equal start and
    /// end targets).
    pub fn in_plateau(&self, t: Duration) -> bool {
        let mut stage_start = Duration::ZERO;
        let mut from = 0u32;
        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if t < stage_end {
                return from == stage.target;
            }
            stage_start = stage_end;
            from = stage.target;
        }
        false
    }
}
