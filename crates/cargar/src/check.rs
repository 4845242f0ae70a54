//! Named boolean checks evaluated against individual responses.
//!
//! A check records exactly one pass/fail tally entry per evaluation. Checks
//! never abort a scenario: predicate panics are caught and counted as
//! failures, and body-parse failures surface as `None` from
//! `HttpResponse::json()` so predicates fail cleanly.

use crate::client::HttpResponse;
use crate::metrics::Metrics;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Record a named check outcome.
///
/// Returns `passed` so call sites can branch on the result if they want.
pub fn check(metrics: &Metrics, name: &str, passed: bool) -> bool {
    metrics.record_check(name, passed);
    passed
}

/// Evaluate a predicate against a response and record the named outcome.
///
/// The predicate runs exactly once. If it panics, the panic is caught and
/// the check is recorded as failed; one bad response must never take down a
/// virtual user's loop.
pub fn check_with<F>(metrics: &Metrics, name: &str, response: &HttpResponse, predicate: F) -> bool
where
    F: FnOnce(&HttpResponse) -> bool,
{
    let passed = catch_unwind(AssertUnwindSafe(|| predicate(response))).unwrap_or_else(|_| {
        tracing::warn!(check = name, "check predicate panicked; recording failure");
        false
    });
    metrics.record_check(name, passed);
    passed
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
            duration: Duration::from_millis(10),
            transport_failed: false,
        }
    }

    #[test]
    fn test_check_records_pass() {
        let metrics = Metrics::new();
        assert!(check(&metrics, "root status is 200", true));
        let tally = metrics.snapshot().checks["root status is 200"];
        assert_eq!(tally.passes, 1);
        assert_eq!(tally.fails, 0);
    }

    #[test]
    fn test_check_records_fail() {
        let metrics = Metrics::new();
        assert!(!check(&metrics, "root status is 200", false));
        let tally = metrics.snapshot().checks["root status is 200"];
        assert_eq!(tally.fails, 1);
    }

    #[test]
    fn test_check_with_predicate() {
        let metrics = Metrics::new();
        let resp = response(200, r#"{"status": "ok"}"#);
        let passed = check_with(&metrics, "health response has status ok", &resp, |r| {
            r.json().is_some_and(|v| v["status"] == "ok")
        });
        assert!(passed);
    }

    #[test]
    fn test_check_with_malformed_body_fails_cleanly() {
        let metrics = Metrics::new();
        let resp = response(200, "definitely } not json");
        let passed = check_with(&metrics, "health response has status ok", &resp, |r| {
            r.json().is_some_and(|v| v["status"] == "ok")
        });
        assert!(!passed);
        let tally = metrics.snapshot().checks["health response has status ok"];
        assert_eq!(tally.fails, 1);
    }

    #[test]
    fn test_check_with_panicking_predicate_is_caught() {
        let metrics = Metrics::new();
        let resp = response(200, "[]");
        let passed = check_with(&metrics, "exploding check", &resp, |_| {
            // Index out of bounds panics inside the predicate.
            let ids: Vec<i64> = Vec::new();
            ids[0] == 1
        });
        assert!(!passed);
        let tally = metrics.snapshot().checks["exploding check"];
        assert_eq!(tally.passes, 0);
        assert_eq!(tally.fails, 1);
    }

    #[test]
    fn test_exactly_one_tally_per_evaluation() {
        let metrics = Metrics::new();
        let resp = response(404, "");
        for _ in 0..5 {
            check_with(&metrics, "non-existent book returns 404", &resp, |r| {
                r.status == 404
            });
        }
        let tally = metrics.snapshot().checks["non-existent book returns 404"];
        assert_eq!(tally.passes + tally.fails, 5);
    }
}
