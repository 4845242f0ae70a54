//! End-to-end CLI tests via the compiled binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn cargador() -> Command {
    Command::cargo_bin("cargador").unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    cargador()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_validate_accepts_good_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("load.yaml");
    std::fs::write(
        &path,
        "base_url: http://localhost:8000\nstages:\n  - duration: 10s\n    target: 5\n",
    )
    .unwrap();

    cargador()
        .args(["validate", "--config"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 stages"));
}

#[test]
fn test_validate_rejects_bad_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("load.yaml");
    std::fs::write(
        &path,
        "base_url: http://localhost:8000\nthresholds:\n  http_req_duration:\n    - median<5\n",
    )
    .unwrap();

    cargador()
        .args(["validate", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("threshold"));
}

#[test]
fn test_validate_rejects_missing_file() {
    cargador()
        .args(["validate", "--config", "/nonexistent/load.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O"));
}

#[test]
fn test_run_requires_base_url() {
    cargador()
        .args(["run", "--quiet"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}

#[test]
fn test_run_against_unreachable_target_fails_thresholds() {
    // A short run against a closed port: every request fails in transport,
    // so the default failure-rate threshold cannot hold and the exit code
    // is nonzero. The text report still renders in full.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("load.yaml");
    std::fs::write(
        &path,
        concat!(
            "base_url: http://127.0.0.1:1\n",
            "stages:\n",
            "  - duration: 1s\n",
            "    target: 2\n",
            "  - duration: 1s\n",
            "    target: 0\n",
            "think_time: 10ms\n",
            "seed: 7\n",
        ),
    )
    .unwrap();

    cargador()
        .args(["run", "--quiet", "--config"])
        .arg(&path)
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .failure()
        .stdout(predicate::str::contains("Verdict: FAILED"))
        .stdout(predicate::str::contains("http_req_failed"))
        .stderr(predicate::str::contains("threshold"));
}

#[test]
fn test_run_json_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("load.yaml");
    let out_path = dir.path().join("summary.json");
    std::fs::write(
        &config_path,
        concat!(
            "base_url: http://127.0.0.1:1\n",
            "stages:\n",
            "  - duration: 1s\n",
            "    target: 2\n",
            "  - duration: 1s\n",
            "    target: 0\n",
            "think_time: 10ms\n",
        ),
    )
    .unwrap();

    cargador()
        .args(["run", "--quiet", "--json", "--config"])
        .arg(&config_path)
        .arg("--output")
        .arg(&out_path)
        .timeout(std::time::Duration::from_secs(60))
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"verdict\""));

    let written = std::fs::read_to_string(&out_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["verdict"], "Failed");
    assert!(value["metrics"]["metrics"]["http_req_failed"]["rate"].as_f64().unwrap() > 0.99);
}
