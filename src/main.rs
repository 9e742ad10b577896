use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use trust_random::cli::{Cli, Command};
use trust_random::harness::Harness;
use trust_random::regression::failure_probabilities;
use trust_random::{demo, settings::TrustRandomConfig};

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Build the harness for the built-in targets, applying CLI overrides
fn build_harness(cli: &Cli, st_devs: Option<f64>, re_runs: Option<u32>) -> Result<Harness> {
    let mut config = TrustRandomConfig::discover(&cli.root)
        .with_context(|| format!("Failed to read config in {}", cli.root.display()))?;
    if let Some(st_devs) = st_devs {
        config.acceptable_st_devs = st_devs;
    }
    if let Some(re_runs) = re_runs {
        config.re_runs = re_runs;
    }
    Ok(Harness::new(&cli.root, config, demo::all()?)?)
}

fn run_generate(harness: &Harness, force: bool) -> Result<()> {
    if !harness.needs_generation(force) {
        println!(
            "Benchmark {} exists; use --force to regenerate",
            harness.benchmark_file().display()
        );
        return Ok(());
    }
    let store = harness.generate().context("Benchmark generation failed")?;
    println!(
        "Wrote {} records to {}",
        store.len(),
        harness.benchmark_file().display()
    );
    Ok(())
}

fn run_check(harness: &Harness, function: Option<&str>) -> Result<()> {
    let store = harness.prepare(false)?;
    let reports = match function {
        Some(name) => harness.verify_function(&store, name)?,
        None => harness.verify_all(&store),
    };

    let checked = reports.len();
    let mut failed = 0usize;
    for report in &reports {
        match &report.outcome {
            Ok(v) if v.passed() => println!("PASSED  {} ({} attempt(s))", report.name, v.attempts),
            Ok(v) => {
                failed += 1;
                println!("FAILED  {} after {} attempt(s): {}", report.name, v.attempts, v.result);
            }
            Err(e) => {
                failed += 1;
                println!("ERROR   {}: {}", report.name, e);
            }
        }
    }

    println!();
    println!("{} checked, {} passed, {} failed", checked, checked - failed, failed);
    if failed > 0 {
        anyhow::bail!("{} regression check(s) failed", failed);
    }
    Ok(())
}

fn run_list(harness: &Harness) {
    for target in harness.targets() {
        let params: Vec<String> = target
            .parameters()
            .iter()
            .map(|d| format!("{}: {}", d.name, d.kind))
            .collect();
        println!("{}({})", target.name(), params.join(", "));
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing if --debug flag is set
    init_tracing(cli.debug);

    match &cli.command {
        Command::Generate { force } => {
            let harness = build_harness(&cli, None, None)?;
            run_generate(&harness, *force)?;
        }
        Command::Check {
            function,
            st_devs,
            re_runs,
        } => {
            let harness = build_harness(&cli, *st_devs, *re_runs)?;
            run_check(&harness, function.as_deref())?;
        }
        Command::Estimate => {
            let harness = build_harness(&cli, None, None)?;
            let settings = harness.load_settings()?;
            println!("{}", harness.estimate(&settings)?);
        }
        Command::List => {
            let harness = build_harness(&cli, None, None)?;
            run_list(&harness);
        }
        Command::SettingsTemplate => {
            let harness = build_harness(&cli, None, None)?;
            if harness.write_settings_template()? {
                println!("Wrote {}", harness.settings_file().display());
            } else {
                println!("{} already exists", harness.settings_file().display());
            }
        }
        Command::FailureProb {
            st_devs,
            re_runs,
            independent_variables,
            tests,
        } => {
            if *st_devs < 0.0 {
                anyhow::bail!("Invalid value for --st-devs: {} (must be >= 0)", st_devs);
            }
            let probs = failure_probabilities(*st_devs, *re_runs, *independent_variables, *tests);
            println!(
                "Fail probability per test (assuming no reruns): {}",
                probs.per_test_no_reruns
            );
            println!(
                "Fail probability per test (assuming reruns): {}",
                probs.per_test_reruns
            );
            println!(
                "Probability of one test failing: (assuming no reruns) {}",
                probs.one_test_from_all_no_reruns
            );
            println!(
                "Probability of one test failing: (assuming reruns) {}",
                probs.one_test_from_all_reruns
            );
        }
    }

    Ok(())
}
