//! YAML run configuration.
//!
//! A config file describes the target, the stage profile, and the
//! thresholds. Missing sections fall back to the original bookstore
//! workload's values, so a file with nothing but `base_url` is valid.
//!
//! ```yaml
//! base_url: http://localhost:8000
//! stages:
//!   - duration: 30s
//!     target: 10
//!   - duration: 1m
//!     target: 20
//! thresholds:
//!   http_req_duration:
//!     - p(95)<500
//!   http_req_failed:
//!     - rate<0.01
//! think_time: 1s
//! seed: 42
//! ```

use crate::error::{CliError, CliResult};
use cargar::{RunConfig, Stage, StageProfile, Threshold, DEFAULT_GRACE, DEFAULT_TICK};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Raw configuration as read from a YAML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Base URL of the target service.
    pub base_url: Option<String>,
    /// Stage list; empty means the default bookstore ramp.
    #[serde(default)]
    pub stages: Vec<FileStage>,
    /// Threshold expressions keyed by metric name; empty means the
    /// default latency and failure-rate thresholds.
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<String>>,
    /// Think-time between groups, e.g. `1s` or `500ms`.
    pub think_time: Option<String>,
    /// Seed for deterministic scenario randomness.
    pub seed: Option<u64>,
}

/// One stage as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileStage {
    /// Stage duration, e.g. `30s` or `2m`.
    pub duration: String,
    /// VU count to reach by the end of the stage.
    pub target: u32,
}

impl FileConfig {
    /// Load a config file from disk.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml_ng::from_str(&text)?)
    }

    /// Resolve into a validated run configuration.
    ///
    /// `base_url_override` (from the command line) wins over the file.
    pub fn into_run_config(self, base_url_override: Option<String>) -> CliResult<RunConfig> {
        let base_url = base_url_override
            .or(self.base_url)
            .ok_or_else(|| CliError::config("no base_url in config file or --base-url flag"))?;

        let profile = if self.stages.is_empty() {
            StageProfile::bookstore_default()
        } else {
            let stages = self
                .stages
                .iter()
                .map(|s| Ok(Stage::new(parse_duration(&s.duration)?, s.target)))
                .collect::<CliResult<Vec<_>>>()?;
            StageProfile::new(stages)
        };

        let thresholds = if self.thresholds.is_empty() {
            RunConfig::default_thresholds()?
        } else {
            let mut out = Vec::new();
            for (metric, expressions) in &self.thresholds {
                for expr in expressions {
                    out.push(Threshold::parse(metric, expr)?);
                }
            }
            out
        };

        let think_time = match self.think_time {
            Some(text) => parse_duration(&text)?,
            None => Duration::from_secs(1),
        };

        let config = RunConfig {
            base_url,
            profile,
            thresholds,
            think_time,
            tick: DEFAULT_TICK,
            grace: DEFAULT_GRACE,
            seed: self.seed,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Parse a compact duration like `500ms`, `30s`, `1m`, or `2h`.
///
/// A bare number is seconds.
pub fn parse_duration(text: &str) -> CliResult<Duration> {
    let trimmed = text.trim();
    let unit_at = trimmed
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(unit_at);

    let value: f64 = number
        .parse()
        .map_err(|_| CliError::config(format!("invalid duration '{text}'")))?;
    let secs = match unit.trim() {
        "ms" => value / 1000.0,
        "s" | "" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        other => {
            return Err(CliError::config(format!(
                "invalid duration unit '{other}' in '{text}' (expected ms, s, m, or h)"
            )))
        }
    };
    if !secs.is_finite() || secs < 0.0 {
        return Err(CliError::config(format!("invalid duration '{text}'")));
    }
    Ok(Duration::from_secs_f64(secs))
}
