//! trust-random - statistical regression testing for noisy functions
//!
//! Functions whose outputs are random (simulations, sampled estimators) cannot
//! be tested against exact values. This library records, for each point of a
//! geometric parameter grid, the mean and standard deviation of every output
//! field over many evaluations, and later checks that a single fresh
//! evaluation falls within an acceptable number of standard deviations.
//!
//! # Example
//! ```
//! use serde_json::json;
//! use trust_random::grid::{sample, GridConstraint, ParameterSpec};
//! use trust_random::regression::check;
//! use trust_random::runner::Runner;
//! use trust_random::target::{ParameterDecl, Target};
//!
//! let target = Target::new("identity", vec![ParameterDecl::integer("n")], |args| {
//!     Ok(json!({"count": args.int("n")?}))
//! })
//! .unwrap();
//!
//! let specs = vec![ParameterSpec::integer("n", 1, 100, 3).unwrap()];
//! let grid = sample(&specs, &GridConstraint::new(1e6, 5).unwrap()).unwrap();
//! let records = Runner::new(2).unwrap().run(&target, &grid.tuples, 5).unwrap();
//!
//! let fresh = target.evaluate_flat(&grid.tuples[1]).unwrap();
//! assert!(check(&records[1], &fresh, 0.0).is_pass());
//! ```

pub mod cli;
pub mod demo;
pub mod error;
pub mod flatten;
pub mod grid;
pub mod harness;
pub mod regression;
pub mod runner;
pub mod settings;
pub mod store;
pub mod target;

pub use error::{Result, TrustRandomError};
