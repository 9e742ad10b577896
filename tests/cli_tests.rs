//! Command line tests for the trust-random binary
//!
//! Every test runs against its own temporary project root.

use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn trust_random(root: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("trust-random");
    cmd.arg("--root").arg(root);
    cmd
}

/// settings-template followed by generate, using the template ranges
fn generated_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path())
        .arg("settings-template")
        .assert()
        .success()
        .stdout(predicate::str::contains("settings.json"));
    trust_random(dir.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));
    dir
}

#[test]
fn test_failure_prob_output() {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path())
        .args([
            "failure-prob",
            "--st-devs",
            "2.5",
            "--re-runs",
            "5",
            "--independent-variables",
            "3",
            "--tests",
            "100",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fail probability per test (assuming no reruns): 0.03"))
        .stdout(predicate::str::contains("Probability of one test failing: (assuming reruns)"));
}

#[test]
fn test_failure_prob_rejects_negative_band() {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path())
        .args(["failure-prob", "--st-devs=-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--st-devs"));
}

#[test]
fn test_list_shows_targets() {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("coin_tosser(n: int)"))
        .stdout(predicate::str::contains("binomial(n: int, p: float)"))
        .stdout(predicate::str::contains("tiny_test(pop: int, other: int)"));
}

#[test]
fn test_generate_without_settings_fails() {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path())
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("settings-template"));
    assert!(!dir.path().join("benchmark").join("benchmark.json").exists());
}

#[test]
fn test_settings_template_is_not_overwritten() {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path()).arg("settings-template").assert().success();
    trust_random(dir.path())
        .arg("settings-template")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_estimate_reports_test_count() {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path()).arg("settings-template").assert().success();
    trust_random(dir.path())
        .arg("estimate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Benchmark will run"))
        .stdout(predicate::str::contains("one core"));
}

#[test]
fn test_generate_then_check_passes() {
    let dir = generated_project();
    let benchmark = dir.path().join("benchmark").join("benchmark.json");
    let stored: Value = serde_json::from_str(&fs::read_to_string(&benchmark).unwrap()).unwrap();

    // Function keys follow registration order
    let functions: Vec<&str> = stored.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(functions, vec!["coin_tosser", "binomial", "tiny_test", "random_walk"]);

    trust_random(dir.path())
        .args(["check", "--function", "tiny_test"])
        .assert()
        .success()
        .stdout(predicate::str::contains("PASSED  tiny_test[0]"))
        .stdout(predicate::str::contains("0 failed"));
}

#[test]
fn test_generate_keeps_existing_benchmark() {
    let dir = generated_project();
    trust_random(dir.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_tampered_benchmark_fails_check() {
    let dir = generated_project();
    let benchmark = dir.path().join("benchmark").join("benchmark.json");
    let mut stored: Value = serde_json::from_str(&fs::read_to_string(&benchmark).unwrap()).unwrap();
    let first = &mut stored["tiny_test"][0]["stats"]["pop"]["mean"];
    *first = Value::from(first.as_f64().unwrap() + 1000.0);
    fs::write(&benchmark, serde_json::to_string_pretty(&stored).unwrap()).unwrap();

    trust_random(dir.path())
        .args(["check", "--function", "tiny_test", "--re-runs", "0"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("FAILED  tiny_test[0]"))
        .stdout(predicate::str::contains("lower bound"));
}

#[test]
fn test_check_unknown_function() {
    let dir = generated_project();
    trust_random(dir.path())
        .args(["check", "--function", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_config_file_is_read() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("trust_random.toml"),
        "benchmark_path = \"bench_data\"\nworkers = 2\n",
    )
    .unwrap();
    trust_random(dir.path())
        .arg("settings-template")
        .assert()
        .success();
    assert!(dir.path().join("bench_data").join("settings.json").exists());
}

#[test]
fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("trust_random.toml"), "acceptable_st_devs = -1.0\n").unwrap();
    trust_random(dir.path()).arg("list").assert().failure();
}

#[test]
fn test_debug_flag_logs_to_stderr() {
    let dir = TempDir::new().unwrap();
    trust_random(dir.path()).arg("settings-template").assert().success();
    trust_random(dir.path())
        .args(["--debug", "generate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("benchmarking grid point"));
}
