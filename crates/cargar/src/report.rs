//! Text and JSON rendering of run summaries.

use crate::metrics::{HTTP_REQ_FAILED, ITERATIONS};
use crate::runner::RunSummary;

// =============================================================================
// Rendering
// =============================================================================

/// Render a run summary as a human-readable text report.
pub fn render_run_report(summary: &RunSummary) -> String {
    let mut output = String::new();

    output.push_str("LOAD TEST RESULTS\n");
    output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    let iterations = summary
        .metrics
        .get(ITERATIONS)
        .map_or(0, |agg| agg.count);
    let failed_rate = summary
        .metrics
        .get(HTTP_REQ_FAILED)
        .map_or(0.0, |agg| agg.rate);
    output.push_str(&format!(
        "Started: {} │ Duration: {:.1}s │ Iterations: {} │ Transport failures: {:.2}%\n\n",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        summary.duration.as_secs_f64(),
        iterations,
        failed_rate * 100.0
    ));

    // Metrics table
    let mut names: Vec<&String> = summary.metrics.metrics.keys().collect();
    names.sort();
    output.push_str("Metrics:\n");
    output.push_str("┌───────────────────────────────────────┬─────────┬──────────┬──────────┬──────────┐\n");
    output.push_str("│ Metric                                │ Count   │ avg      │ p95      │ max      │\n");
    output.push_str("├───────────────────────────────────────┼─────────┼──────────┼──────────┼──────────┤\n");
    for name in names {
        if let Some(agg) = summary.metrics.get(name) {
            output.push_str(&format!(
                "│ {:<37} │ {:>7} │ {:>6.1}ms │ {:>6.1}ms │ {:>6.1}ms │\n",
                truncate(name, 37),
                agg.count,
                agg.avg_ms,
                agg.p95_ms,
                agg.max_ms
            ));
        }
    }
    output.push_str("└───────────────────────────────────────┴─────────┴──────────┴──────────┴──────────┘\n\n");

    // Checks
    output.push_str("Checks:\n");
    if summary.checks.is_empty() {
        output.push_str("  (none recorded)\n");
    }
    for (name, tally) in &summary.checks {
        let symbol = if tally.fails == 0 { "✓" } else { "✗" };
        output.push_str(&format!(
            "  {} {} ({}/{} passed, {:.1}%)\n",
            symbol,
            name,
            tally.passes,
            tally.passes + tally.fails,
            tally.pass_rate() * 100.0
        ));
    }
    output.push('\n');

    // Thresholds
    output.push_str("Thresholds:\n");
    if summary.thresholds.is_empty() {
        output.push_str("  (none configured)\n");
    }
    for verdict in &summary.thresholds {
        let symbol = if verdict.passed { "✓" } else { "✗" };
        let observed = verdict
            .observed
            .map_or_else(|| "never recorded".to_string(), |v| format!("{v:.4}"));
        output.push_str(&format!(
            "  {} {} (observed: {})\n",
            symbol, verdict.threshold, observed
        ));
    }
    output.push('\n');

    if !summary.anomalies.is_empty() {
        output.push_str("Anomalies:\n");
        for anomaly in &summary.anomalies {
            output.push_str(&format!("  ⚠ VU {}: {}\n", anomaly.vu_id, anomaly.message));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "Verdict: {}\n",
        if summary.passed() { "PASSED" } else { "FAILED" }
    ));

    output
}

/// Render a run summary as pretty-printed JSON.
pub fn render_run_json(summary: &RunSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}

/// Truncate string to max length
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len - 1).collect();
        format!("{cut}…")
    }
}
