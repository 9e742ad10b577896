//! Repeated parallel evaluation of a target across a grid
//!
//! Grid points are processed one after another; the repetitions of a single
//! point are independent and run on a bounded rayon pool. The first failing
//! repetition raises a shared cancellation flag, repetitions that have not
//! started yet are skipped, and the whole run returns that error without any
//! records.

use crate::error::{Result, TrustRandomError};
use crate::flatten::FlatResult;
use crate::grid::ParameterTuple;
use crate::regression::summarize_fields;
use crate::store::BenchmarkRecord;
use crate::target::Target;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Records produced by a run plus the number of evaluations actually made
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub records: Vec<BenchmarkRecord>,
    pub evaluations: usize,
}

/// Benchmark runner with an explicitly bounded worker pool
pub struct Runner {
    pool: ThreadPool,
    workers: usize,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner").field("workers", &self.workers).finish()
    }
}

impl Runner {
    /// Build a runner with `workers` threads (at least one)
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("trust-random-worker-{}", i))
            .build()
            .map_err(|e| TrustRandomError::Config(format!("Failed to build worker pool: {}", e)))?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// One record per tuple, in tuple order
    pub fn run(
        &self,
        target: &Target,
        tuples: &[ParameterTuple],
        iterations_per_point: usize,
    ) -> Result<Vec<BenchmarkRecord>> {
        Ok(self.run_counted(target, tuples, iterations_per_point)?.records)
    }

    /// Like [`Runner::run`], also reporting how many evaluations ran
    ///
    /// The count is carried on success only; on failure the error is
    /// returned and no records are produced.
    pub fn run_counted(
        &self,
        target: &Target,
        tuples: &[ParameterTuple],
        iterations_per_point: usize,
    ) -> Result<RunOutcome> {
        let counter = AtomicUsize::new(0);
        let mut records = Vec::with_capacity(tuples.len());
        for tuple in tuples {
            records.push(self.run_point(target, tuple, iterations_per_point, &counter)?);
        }
        Ok(RunOutcome {
            records,
            evaluations: counter.into_inner(),
        })
    }

    /// Number of evaluations a failing run made before it stopped
    ///
    /// Exposes the cancellation behaviour: with one worker, a target that
    /// fails on its first call is invoked exactly once per run.
    pub fn evaluations_until_failure(
        &self,
        target: &Target,
        tuples: &[ParameterTuple],
        iterations_per_point: usize,
    ) -> (usize, Option<TrustRandomError>) {
        let counter = AtomicUsize::new(0);
        for tuple in tuples {
            if let Err(e) = self.run_point(target, tuple, iterations_per_point, &counter) {
                return (counter.into_inner(), Some(e));
            }
        }
        (counter.into_inner(), None)
    }

    fn run_point(
        &self,
        target: &Target,
        tuple: &ParameterTuple,
        iterations: usize,
        counter: &AtomicUsize,
    ) -> Result<BenchmarkRecord> {
        let location = target.describe(tuple);
        tracing::info!(function = target.name(), tuple = %location, iterations, "benchmarking grid point");

        let cancelled = AtomicBool::new(false);
        let outcomes: Vec<Option<Result<FlatResult>>> = self.pool.install(|| {
            (0..iterations)
                .into_par_iter()
                .map(|_| {
                    if cancelled.load(Ordering::Acquire) {
                        return None;
                    }
                    counter.fetch_add(1, Ordering::Relaxed);
                    let outcome = target.evaluate_flat(tuple);
                    if outcome.is_err() {
                        cancelled.store(true, Ordering::Release);
                    }
                    Some(outcome)
                })
                .collect()
        });

        let mut repetitions = Vec::with_capacity(iterations);
        for outcome in outcomes.into_iter().flatten() {
            repetitions.push(outcome?);
        }
        if repetitions.len() != iterations {
            // Only reachable if a repetition was skipped without any error
            return Err(TrustRandomError::schema("repetitions were cancelled without a failure")
                .at(target.name(), &location));
        }

        let stats = summarize_fields(&repetitions).map_err(|e| e.at(target.name(), &location))?;
        Ok(BenchmarkRecord::for_tuple(target, tuple, stats))
    }
}

/// Available CPU count, 1 if it cannot be determined
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
