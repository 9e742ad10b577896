//! Session driver for hosts that turn benchmark records into test cases
//!
//! A session has two phases that never overlap:
//!
//! 1. Generation: when [`Harness::needs_generation`] says so, every target's
//!    grid is sampled, benchmarked and written to `benchmark.json` in one go.
//! 2. Checking: the stored benchmark is loaded once and each record becomes
//!    one case, checked by [`Harness::verify_record`] with retries.

use crate::error::{Result, TrustRandomError};
use crate::grid::{sample, Grid, GridConstraint, ParameterSpec};
use crate::regression::{check, CheckResult, ToleranceConfig, Violation};
use crate::runner::{available_workers, Runner};
use crate::settings::{SettingsFile, TrustRandomConfig};
use crate::store::{BenchmarkRecord, BenchmarkStore};
use crate::target::Target;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Sampled grid of one target
#[derive(Debug, Clone)]
pub struct FunctionPlan<'a> {
    pub target: &'a Target,
    pub specs: Vec<ParameterSpec>,
    pub constraint: GridConstraint,
    pub grid: Grid,
}

impl FunctionPlan<'_> {
    /// `(one test, whole benchmark)` in seconds
    pub fn estimate(&self) -> (f64, f64) {
        let test_time = self.target.est_base_time() * self.grid.total_cost;
        let benchmark_time = test_time * self.constraint.iterations_per_point() as f64;
        (test_time, benchmark_time)
    }
}

/// Predicted runtime of generation and of one checking pass
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub total_tests: usize,
    /// Seconds to check every record once
    pub total_test_time: f64,
    /// Seconds to generate the benchmark on one core
    pub benchmark_time_one_core: f64,
    /// Seconds to generate the benchmark across the configured workers
    pub benchmark_time_parallel: f64,
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Benchmark will run {} tests", self.total_tests)?;
        writeln!(
            f,
            "Estimated benchmark calc time (one core): {:.3}s",
            self.benchmark_time_one_core
        )?;
        writeln!(
            f,
            "Estimated benchmark calc time (multiple cores): {:.3}s",
            self.benchmark_time_parallel
        )?;
        write!(
            f,
            "Estimated total test time (no reruns): {:.3}s",
            self.total_test_time
        )
    }
}

/// Final outcome of one case after retries
#[derive(Debug, Clone, PartialEq)]
pub struct Verification {
    pub result: CheckResult,
    /// Attempts made, between 1 and `allowed_retries + 1`
    pub attempts: u32,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.result.is_pass()
    }
}

/// Outcome of one stored record as a test case
#[derive(Debug)]
pub struct CaseReport {
    /// `function[index] (n=10, p=0.5)`
    pub name: String,
    pub outcome: Result<Verification>,
}

impl CaseReport {
    pub fn passed(&self) -> bool {
        matches!(&self.outcome, Ok(v) if v.passed())
    }
}

/// Targets plus configuration rooted at a project directory
#[derive(Debug)]
pub struct Harness {
    root: PathBuf,
    config: TrustRandomConfig,
    targets: Vec<Target>,
}

impl Harness {
    pub fn new(root: impl Into<PathBuf>, config: TrustRandomConfig, targets: Vec<Target>) -> Result<Self> {
        config.validate()?;
        for (i, target) in targets.iter().enumerate() {
            if targets[..i].iter().any(|t| t.name() == target.name()) {
                return Err(TrustRandomError::Config(format!(
                    "target '{}' registered twice",
                    target.name()
                )));
            }
        }
        Ok(Self {
            root: root.into(),
            config,
            targets,
        })
    }

    /// Harness with the config discovered in `root`
    pub fn discover(root: impl Into<PathBuf>, targets: Vec<Target>) -> Result<Self> {
        let root = root.into();
        let config = TrustRandomConfig::discover(&root)?;
        Self::new(root, config, targets)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &TrustRandomConfig {
        &self.config
    }

    pub fn tolerance(&self) -> ToleranceConfig {
        self.config.tolerance()
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name() == name)
    }

    pub fn workers(&self) -> usize {
        self.config.workers.unwrap_or_else(available_workers)
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config.settings_file(&self.root)
    }

    pub fn benchmark_file(&self) -> PathBuf {
        self.config.benchmark_file(&self.root)
    }

    /// True when no benchmark exists yet or regeneration is forced
    pub fn needs_generation(&self, force: bool) -> bool {
        force || !self.benchmark_file().exists()
    }

    pub fn load_settings(&self) -> Result<SettingsFile> {
        let path = self.settings_file();
        if !path.exists() {
            return Err(TrustRandomError::Config(format!(
                "settings file {} not found; write one (see `settings-template`)",
                path.display()
            )));
        }
        SettingsFile::load(&path)
    }

    /// Write template settings for every target unless a file already exists
    pub fn write_settings_template(&self) -> Result<bool> {
        let path = self.settings_file();
        if path.exists() {
            return Ok(false);
        }
        SettingsFile::template(&self.targets)?.save(&path)?;
        tracing::info!(path = %path.display(), "wrote settings template");
        Ok(true)
    }

    /// Sample every target's grid
    pub fn plan(&self, settings: &SettingsFile) -> Result<Vec<FunctionPlan<'_>>> {
        self.targets
            .iter()
            .map(|target| {
                let (specs, constraint) = settings.resolve(target)?;
                let grid = sample(&specs, &constraint)?;
                Ok(FunctionPlan {
                    target,
                    specs,
                    constraint,
                    grid,
                })
            })
            .collect()
    }

    pub fn estimate(&self, settings: &SettingsFile) -> Result<Estimate> {
        let plans = self.plan(settings)?;
        let mut estimate = Estimate {
            total_tests: 0,
            total_test_time: 0.0,
            benchmark_time_one_core: 0.0,
            benchmark_time_parallel: 0.0,
        };
        for plan in &plans {
            let (test_time, benchmark_time) = plan.estimate();
            estimate.total_tests += plan.grid.len();
            estimate.total_test_time += test_time;
            estimate.benchmark_time_one_core += benchmark_time;
        }
        estimate.benchmark_time_parallel = estimate.benchmark_time_one_core / self.workers() as f64;
        Ok(estimate)
    }

    /// Benchmark every target and replace `benchmark.json`
    ///
    /// Nothing is written unless every target succeeds.
    pub fn generate(&self) -> Result<BenchmarkStore> {
        let settings = self.load_settings()?;
        let plans = self.plan(&settings)?;
        let estimate = self.estimate(&settings)?;
        tracing::info!(
            tests = estimate.total_tests,
            est_seconds = estimate.benchmark_time_parallel,
            "generating benchmark"
        );

        let runner = Runner::new(self.workers())?;
        let start = Instant::now();
        let mut store = BenchmarkStore::new();
        for plan in &plans {
            let records = runner.run(
                plan.target,
                &plan.grid.tuples,
                plan.constraint.iterations_per_point(),
            )?;
            store.insert(plan.target.name(), records)?;
        }
        tracing::info!(elapsed = ?start.elapsed(), "benchmark calculated");

        store.save(&self.benchmark_file())?;
        Ok(store)
    }

    /// Generate when [`Harness::needs_generation`] holds, otherwise load
    pub fn prepare(&self, force: bool) -> Result<BenchmarkStore> {
        if self.needs_generation(force) {
            self.generate()
        } else {
            self.load_store()
        }
    }

    pub fn load_store(&self) -> Result<BenchmarkStore> {
        BenchmarkStore::load(&self.benchmark_file())
    }

    /// One fresh evaluation checked against `record`
    ///
    /// A recorded field missing from the fresh result is reported first, as a
    /// failed check. Otherwise fields produced now but absent from the record
    /// mean the result shape changed since generation and are a schema error.
    pub fn check_record(&self, function: &str, record: &BenchmarkRecord) -> Result<CheckResult> {
        let target = self.target(function).ok_or_else(|| {
            TrustRandomError::Config(format!("benchmark names unknown function '{}'", function))
        })?;
        let tuple = record.tuple_for(target)?;
        let fresh = target.evaluate_flat(&tuple)?;
        let result = check(record, &fresh, self.config.acceptable_st_devs);
        if matches!(result.violation(), Some(Violation::MissingField { .. })) {
            return Ok(result);
        }
        if let Some(extra) = fresh.first_missing_in(record.stats()) {
            return Err(TrustRandomError::schema(format!(
                "field '{}' is not present in the benchmark",
                extra
            ))
            .at(function, &target.describe(&tuple)));
        }
        Ok(result)
    }

    /// Check with up to `allowed_retries` further attempts after a failure
    ///
    /// A missing field is a shape change, not noise, so it is never retried.
    pub fn verify_record(&self, function: &str, record: &BenchmarkRecord) -> Result<Verification> {
        let max_attempts = self.tolerance().max_attempts();
        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = self.check_record(function, record)?;
            let retryable = matches!(result.violation(), Some(Violation::OutOfBounds { .. }));
            if !retryable || attempts >= max_attempts {
                return Ok(Verification { result, attempts });
            }
            tracing::debug!(
                function,
                tuple = %record.describe(),
                attempt = attempts,
                "check failed, retrying"
            );
        }
    }

    /// Verify every stored record, one case each, in store order
    pub fn verify_all(&self, store: &BenchmarkStore) -> Vec<CaseReport> {
        let mut reports = Vec::with_capacity(store.len());
        for (function, records) in store.iter() {
            self.verify_records(function, records, &mut reports);
        }
        reports
    }

    /// Verify the records of a single function
    pub fn verify_function(&self, store: &BenchmarkStore, function: &str) -> Result<Vec<CaseReport>> {
        let records = store.records(function).ok_or_else(|| {
            TrustRandomError::Config(format!("no benchmark records for function '{}'", function))
        })?;
        let mut reports = Vec::with_capacity(records.len());
        self.verify_records(function, records, &mut reports);
        Ok(reports)
    }

    fn verify_records(&self, function: &str, records: &[BenchmarkRecord], reports: &mut Vec<CaseReport>) {
        for (index, record) in records.iter().enumerate() {
            let name = format!("{}[{}] {}", function, index, record.describe());
            let outcome = self.verify_record(function, record);
            match &outcome {
                Ok(v) if v.passed() => tracing::debug!(case = %name, "pass"),
                Ok(v) => tracing::warn!(case = %name, result = %v.result, "fail"),
                Err(e) => tracing::warn!(case = %name, error = %e, "error"),
            }
            reports.push(CaseReport { name, outcome });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::FieldMap;
    use crate::grid::ParamValue;
    use crate::settings::{Dimension, FunctionSettings};
    use crate::store::FieldStats;
    use crate::target::ParameterDecl;
    use serde_json::json;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn identity() -> Target {
        Target::new("identity", vec![ParameterDecl::integer("n")], |args| {
            Ok(json!({"count": args.int("n")?}))
        })
        .unwrap()
    }

    fn write_settings(harness: &Harness, max: i64, steps: usize) {
        let mut settings = SettingsFile::default();
        let parameters: FieldMap<Dimension> = [(
            "n".to_string(),
            Dimension {
                minimum: ParamValue::Int(1),
                maximum: ParamValue::Int(max),
                steps,
            },
        )]
        .into_iter()
        .collect();
        settings
            .insert(
                "identity",
                FunctionSettings {
                    parameters,
                    max_product: 1e6,
                    benchmark_iters: 5,
                },
            )
            .unwrap();
        settings.save(&harness.settings_file()).unwrap();
    }

    fn harness(dir: &TempDir, targets: Vec<Target>, acceptable_st_devs: f64, re_runs: u32) -> Harness {
        let config = TrustRandomConfig {
            acceptable_st_devs,
            re_runs,
            workers: Some(2),
            ..TrustRandomConfig::default()
        };
        Harness::new(dir.path(), config, targets).unwrap()
    }

    #[test]
    fn test_needs_generation() {
        let dir = TempDir::new().unwrap();
        let h = harness(&dir, vec![identity()], 0.0, 0);
        assert!(h.needs_generation(false));
        write_settings(&h, 100, 3);
        h.generate().unwrap();
        assert!(!h.needs_generation(false));
        assert!(h.needs_generation(true));
    }

    #[test]
    fn test_generate_without_settings_fails_cleanly() {
        let dir = TempDir::new().unwrap();
        let h = harness(&dir, vec![identity()], 0.0, 0);
        let err = h.generate().unwrap_err();
        assert!(err.to_string().contains("settings-template"));
        assert!(!h.benchmark_file().exists());
    }

    #[test]
    fn test_failed_generation_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let broken = Target::new("identity", vec![ParameterDecl::integer("n")], |args| {
            let n = args.int("n")?;
            anyhow::ensure!(n < 50, "n too large");
            Ok(json!({"count": n}))
        })
        .unwrap();
        let h = harness(&dir, vec![broken], 0.0, 0);
        write_settings(&h, 100, 3);
        assert!(h.generate().is_err());
        assert!(!h.benchmark_file().exists());
    }

    #[test]
    fn test_duplicate_targets_rejected() {
        let dir = TempDir::new().unwrap();
        let config = TrustRandomConfig::default();
        assert!(Harness::new(dir.path(), config, vec![identity(), identity()]).is_err());
    }

    #[test]
    fn test_retries_until_pass() {
        // Out of band on the first two calls, in band afterwards
        let calls = Arc::new(AtomicU64::new(0));
        let seen = calls.clone();
        let flaky = Target::new("flaky", vec![], move |_| {
            let call = seen.fetch_add(1, Ordering::SeqCst);
            let x = if call < 2 { 100.0 } else { 0.0 };
            Ok(json!({ "x": x }))
        })
        .unwrap();
        let dir = TempDir::new().unwrap();
        let h = harness(&dir, vec![flaky], 1.0, 5);
        let stats = [("x".to_string(), FieldStats::new(0.0, 1.0))].into_iter().collect();
        let record = BenchmarkRecord::new(FieldMap::new(), stats);

        let verification = h.verify_record("flaky", &record).unwrap();
        assert!(verification.passed());
        assert_eq!(verification.attempts, 3);
    }

    #[test]
    fn test_retries_exhausted() {
        let dir = TempDir::new().unwrap();
        let always_high = Target::new("high", vec![], |_| Ok(json!({"x": 100.0}))).unwrap();
        let h = harness(&dir, vec![always_high], 1.0, 2);
        let stats = [("x".to_string(), FieldStats::new(0.0, 1.0))].into_iter().collect();
        let record = BenchmarkRecord::new(FieldMap::new(), stats);

        let verification = h.verify_record("high", &record).unwrap();
        assert!(!verification.passed());
        assert_eq!(verification.attempts, 3);
    }

    #[test]
    fn test_missing_field_not_retried() {
        let dir = TempDir::new().unwrap();
        let target = Target::new("partial", vec![], |_| Ok(json!({"x": 0.0}))).unwrap();
        let h = harness(&dir, vec![target], 1.0, 4);
        let stats = [
            ("x".to_string(), FieldStats::new(0.0, 1.0)),
            ("y".to_string(), FieldStats::new(0.0, 1.0)),
        ]
        .into_iter()
        .collect();
        let record = BenchmarkRecord::new(FieldMap::new(), stats);

        let verification = h.verify_record("partial", &record).unwrap();
        assert_eq!(verification.attempts, 1);
        assert_eq!(
            verification.result.violation(),
            Some(&Violation::MissingField {
                field: "y".to_string()
            })
        );
    }

    #[test]
    fn test_renamed_field_reports_missing() {
        let dir = TempDir::new().unwrap();
        let target = Target::new("renamed", vec![], |_| Ok(json!({"x": 0.0, "z": 1.0}))).unwrap();
        let h = harness(&dir, vec![target], 1.0, 3);
        let stats = [
            ("x".to_string(), FieldStats::new(0.0, 1.0)),
            ("y".to_string(), FieldStats::new(0.0, 1.0)),
        ]
        .into_iter()
        .collect();
        let record = BenchmarkRecord::new(FieldMap::new(), stats);

        let result = h.check_record("renamed", &record).unwrap();
        assert_eq!(
            result.violation(),
            Some(&Violation::MissingField {
                field: "y".to_string()
            })
        );

        let verification = h.verify_record("renamed", &record).unwrap();
        assert_eq!(verification.attempts, 1);
        assert!(!verification.passed());
    }

    #[test]
    fn test_extra_field_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let target = Target::new("grown", vec![], |_| Ok(json!({"x": 0.0, "z": 1.0}))).unwrap();
        let h = harness(&dir, vec![target], 1.0, 0);
        let stats = [("x".to_string(), FieldStats::new(0.0, 1.0))].into_iter().collect();
        let record = BenchmarkRecord::new(FieldMap::new(), stats);

        let err = h.check_record("grown", &record).unwrap_err();
        assert!(err.is_schema());
        assert!(err.to_string().contains("'z'"));
    }

    #[test]
    fn test_unknown_function() {
        let dir = TempDir::new().unwrap();
        let h = harness(&dir, vec![identity()], 1.0, 0);
        let record = BenchmarkRecord::new(FieldMap::new(), FieldMap::new());
        assert!(h.check_record("nope", &record).is_err());
    }

    #[test]
    fn test_estimate() {
        let dir = TempDir::new().unwrap();
        let h = harness(&dir, vec![identity().with_est_base_time(0.5)], 1.0, 0);
        write_settings(&h, 100, 3);
        let estimate = h.estimate(&h.load_settings().unwrap()).unwrap();
        // Grid 1, 10, 100 -> cost 111; 5 iterations; 2 workers
        assert_eq!(estimate.total_tests, 3);
        assert_eq!(estimate.total_test_time, 55.5);
        assert_eq!(estimate.benchmark_time_one_core, 277.5);
        assert_eq!(estimate.benchmark_time_parallel, 138.75);
        assert!(estimate.to_string().contains("Benchmark will run 3 tests"));
    }

    #[test]
    fn test_write_settings_template_once() {
        let dir = TempDir::new().unwrap();
        let h = harness(&dir, vec![identity()], 1.0, 0);
        assert!(h.write_settings_template().unwrap());
        assert!(!h.write_settings_template().unwrap());
        assert!(h.load_settings().unwrap().get("identity").is_some());
    }
}
