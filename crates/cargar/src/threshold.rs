//! Pass/fail criteria evaluated against the final metric snapshot.
//!
//! Thresholds use the original workload's compact expression syntax:
//! `p(95)<500`, `rate<0.01`, `avg<=100`. Each expression names a statistic
//! of one metric and compares it against a bound. Evaluation is pure: it
//! reads a `MetricsSnapshot` and produces verdicts without touching the
//! live sink.

use crate::error::{CargarError, CargarResult};
use crate::metrics::MetricsSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistic of a metric that a threshold constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stat {
    /// Mean of trend samples.
    Avg,
    /// Minimum trend sample.
    Min,
    /// Maximum trend sample.
    Max,
    /// A percentile of trend samples, `p(50)` through `p(99)`.
    Percentile(u8),
    /// Fraction of nonzero samples of a rate metric.
    Rate,
    /// Sample or event count.
    Count,
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Avg => write!(f, "avg"),
            Self::Min => write!(f, "min"),
            Self::Max => write!(f, "max"),
            Self::Percentile(p) => write!(f, "p({p})"),
            Self::Rate => write!(f, "rate"),
            Self::Count => write!(f, "count"),
        }
    }
}

/// Comparison operator in a threshold expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Op {
    fn holds(self, observed: f64, bound: f64) -> bool {
        match self {
            Self::Lt => observed < bound,
            Self::Le => observed <= bound,
            Self::Gt => observed > bound,
            Self::Ge => observed >= bound,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// One pass/fail criterion over a named metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    /// Metric the criterion applies to.
    pub metric: String,
    /// Statistic extracted from the metric's aggregate.
    pub stat: Stat,
    /// Comparison operator.
    pub op: Op,
    /// Bound the statistic is compared against.
    pub bound: f64,
}

impl Threshold {
    /// Parse a threshold expression like `p(95)<500` for the given metric.
    ///
    /// Supported statistics: `avg`, `min`, `max`, `p(N)` with N in 0..=99,
    /// `rate`, `count`. Supported operators: `<`, `<=`, `>`, `>=`.
    pub fn parse(metric: &str, expression: &str) -> CargarResult<Self> {
        let expr = expression.trim();
        let op_at = expr
            .find(|c| c == '<' || c == '>')
            .ok_or_else(|| Self::parse_error(metric, expr, "no comparison operator"))?;

        let stat_text = expr[..op_at].trim();
        let mut rest = &expr[op_at..];
        let op = if let Some(tail) = rest.strip_prefix("<=") {
            rest = tail;
            Op::Le
        } else if let Some(tail) = rest.strip_prefix(">=") {
            rest = tail;
            Op::Ge
        } else if let Some(tail) = rest.strip_prefix('<') {
            rest = tail;
            Op::Lt
        } else if let Some(tail) = rest.strip_prefix('>') {
            rest = tail;
            Op::Gt
        } else {
            return Err(Self::parse_error(metric, expr, "no comparison operator"));
        };

        let stat = Self::parse_stat(stat_text)
            .ok_or_else(|| Self::parse_error(metric, expr, "unknown statistic"))?;
        let bound: f64 = rest
            .trim()
            .parse()
            .map_err(|_| Self::parse_error(metric, expr, "bound is not a number"))?;

        Ok(Self {
            metric: metric.to_string(),
            stat,
            op,
            bound,
        })
    }

    fn parse_stat(text: &str) -> Option<Stat> {
        match text {
            "avg" => Some(Stat::Avg),
            "min" => Some(Stat::Min),
            "max" => Some(Stat::Max),
            "rate" => Some(Stat::Rate),
            "count" => Some(Stat::Count),
            _ => {
                let inner = text.strip_prefix("p(")?.strip_suffix(')')?;
                let p: u8 = inner.trim().parse().ok()?;
                (p <= 99).then_some(Stat::Percentile(p))
            }
        }
    }

    fn parse_error(metric: &str, expr: &str, reason: &str) -> CargarError {
        CargarError::config(format!(
            "invalid threshold '{expr}' for metric '{metric}': {reason}"
        ))
    }

    /// Evaluate this threshold against a snapshot.
    ///
    /// A threshold on a metric the run never recorded fails: a criterion
    /// that was never measured cannot be called satisfied.
    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> ThresholdVerdict {
        let observed = snapshot.get(&self.metric).map(|agg| match self.stat {
            Stat::Avg => agg.avg_ms,
            Stat::Min => agg.min_ms,
            Stat::Max => agg.max_ms,
            Stat::Percentile(p) => match p {
                50 => agg.p50_ms,
                90 => agg.p90_ms,
                95 => agg.p95_ms,
                99 => agg.p99_ms,
                // Uncommon percentiles fall back to the nearest computed one.
                0..=69 => agg.p50_ms,
                70..=92 => agg.p90_ms,
                93..=97 => agg.p95_ms,
                _ => agg.p99_ms,
            },
            Stat::Rate => agg.rate,
            #[allow(clippy::cast_precision_loss)]
            Stat::Count => agg.count as f64,
        });

        let passed = observed.is_some_and(|value| self.op.holds(value, self.bound));
        ThresholdVerdict {
            threshold: self.clone(),
            observed,
            passed,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}{}{}", self.metric, self.stat, self.op, self.bound)
    }
}

/// Outcome of evaluating one threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdVerdict {
    /// The criterion that was evaluated.
    pub threshold: Threshold,
    /// Observed statistic value, if the metric was recorded at all.
    pub observed: Option<f64>,
    /// Whether the criterion held.
    pub passed: bool,
}

/// Evaluate every threshold; the run passes only if all of them hold.
pub fn evaluate_all(thresholds: &[Threshold], snapshot: &MetricsSnapshot) -> Vec<ThresholdVerdict> {
    thresholds.iter().map(|t| t.evaluate(snapshot)).collect()
}
