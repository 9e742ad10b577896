//! Built-in noisy targets used by the command line front end
//!
//! These mirror typical uses: a coin tosser and a binomial draw whose outputs
//! are random, a deterministic function whose spread is zero, and a random
//! walk with a nested result.

use crate::error::Result;
use crate::target::{ParameterDecl, Target};
use rand::Rng;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct CoinTosserStats {
    pub no_of_heads: u64,
}

#[derive(Debug, Serialize)]
pub struct BinomialOutcome {
    pub no_of_successes: u64,
}

#[derive(Debug, Serialize)]
pub struct TinyStats {
    pub pop: i64,
}

#[derive(Debug, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Serialize)]
pub struct WalkStats {
    pub position: Position,
    pub distance: f64,
}

fn successes(n: i64, p: f64) -> anyhow::Result<u64> {
    anyhow::ensure!(n >= 0, "n must be non-negative, got {}", n);
    anyhow::ensure!((0.0..=1.0).contains(&p), "p must lie in [0, 1], got {}", p);
    let mut rng = rand::thread_rng();
    Ok((0..n).filter(|_| rng.gen_bool(p)).count() as u64)
}

/// Heads in `n` fair tosses
pub fn coin_tosser() -> Result<Target> {
    Target::new("coin_tosser", vec![ParameterDecl::integer("n")], |args| {
        Ok(CoinTosserStats {
            no_of_heads: successes(args.int("n")?, 0.5)?,
        })
    })
}

/// Successes in `n` trials with probability `p`
pub fn binomial() -> Result<Target> {
    Target::new(
        "binomial",
        vec![ParameterDecl::integer("n"), ParameterDecl::real("p")],
        |args| {
            Ok(BinomialOutcome {
                no_of_successes: successes(args.int("n")?, args.real("p")?)?,
            })
        },
    )
}

/// Returns `pop` unchanged; `other` only widens the grid
pub fn tiny_test() -> Result<Target> {
    Target::new(
        "tiny_test",
        vec![ParameterDecl::integer("pop"), ParameterDecl::integer("other")],
        |args| Ok(TinyStats { pop: args.int("pop")? }),
    )
    .map(|t| t.with_est_base_time(1e-6))
}

/// Unit-angle random walk of `steps` steps of length `step_size`
pub fn random_walk() -> Result<Target> {
    Target::new(
        "random_walk",
        vec![ParameterDecl::integer("steps"), ParameterDecl::real("step_size")],
        |args| {
            let steps = args.int("steps")?;
            let step_size = args.real("step_size")?;
            let mut rng = rand::thread_rng();
            let (mut x, mut y) = (0.0f64, 0.0f64);
            for _ in 0..steps {
                let angle = rng.gen_range(0.0..std::f64::consts::TAU);
                x += step_size * angle.cos();
                y += step_size * angle.sin();
            }
            Ok(WalkStats {
                position: Position { x, y },
                distance: x.hypot(y),
            })
        },
    )
}

/// All demo targets
pub fn all() -> Result<Vec<Target>> {
    Ok(vec![coin_tosser()?, binomial()?, tiny_test()?, random_walk()?])
}
