//! CLI argument parsing for trust-random

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "trust-random")]
#[command(version)]
#[command(about = "Statistical regression testing for noisy functions", long_about = None)]
pub struct Cli {
    /// Project root holding trust_random.toml and the benchmark directory
    #[arg(short = 'r', long = "root", value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Enable debug tracing on stderr
    #[arg(long = "debug")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate benchmark.json if it is missing (or always with --force)
    Generate {
        /// Regenerate even if a benchmark already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Check every stored record against a fresh evaluation
    Check {
        /// Only check records of this function
        #[arg(short = 'F', long = "function", value_name = "NAME")]
        function: Option<String>,

        /// Override acceptable_st_devs from the config file
        #[arg(long = "st-devs", value_name = "SIGMA")]
        st_devs: Option<f64>,

        /// Override re_runs from the config file
        #[arg(long = "re-runs", value_name = "N")]
        re_runs: Option<u32>,
    },

    /// Print the estimated generation and check time
    Estimate,

    /// List the available target functions and their parameters
    List,

    /// Write settings.json with template ranges for every target
    SettingsTemplate,

    /// Probability that a correct implementation fails by chance
    FailureProb {
        /// Band half-width in standard deviations
        #[arg(long = "st-devs", value_name = "SIGMA", default_value = "2.5")]
        st_devs: f64,

        /// Retries allowed per test
        #[arg(long = "re-runs", value_name = "N", default_value = "0")]
        re_runs: u32,

        /// Independent output fields per test
        #[arg(long = "independent-variables", value_name = "N", default_value = "1")]
        independent_variables: u32,

        /// Number of tests in the suite
        #[arg(long = "tests", value_name = "N", default_value = "1")]
        tests: usize,
    },
}
