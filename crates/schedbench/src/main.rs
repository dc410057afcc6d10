//! Container-scheduling benchmark harness
//!
//! Drives synthetic placement requests against a simulated heterogeneous
//! cluster under a selectable scheduling policy and writes per-decision
//! metrics to a CSV file for offline comparison.

mod output;
mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use schedbench_lib::{policy_by_name, Benchmark, FileWorkload};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Container scheduling benchmark harness
#[derive(Parser)]
#[command(name = "schedbench")]
#[command(author, version, about = "Benchmark container scheduling policies", long_about = None)]
struct Cli {
    /// Scheduling policy: binpack, spread, or adaptive
    #[arg(long, default_value = "adaptive")]
    scheduler: String,

    /// Path to the workload template file
    #[arg(long, env = "SCHEDBENCH_WORKLOAD", default_value = "workloads/mixed_workload.json")]
    workload: PathBuf,

    /// Path for the CSV results file
    #[arg(long, short, default_value = "results.csv")]
    output: PathBuf,

    /// Benchmark duration in seconds
    #[arg(long, default_value_t = 300)]
    duration: u64,

    /// Cap on the number of generated containers
    #[arg(long)]
    max_containers: Option<usize>,

    /// Seed for workload and reaper randomness
    #[arg(long)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with(fmt::layer())
        .init();

    let settings = settings::BenchSettings::load()?;
    let seed = cli.seed.unwrap_or(settings.seed);

    // misconfiguration is fatal before the loops start
    let policy = policy_by_name(&cli.scheduler)?;
    let mut workload = FileWorkload::from_path(&cli.workload)?.with_seed(seed);
    if let Some(max_containers) = cli.max_containers {
        workload = workload.with_max_containers(max_containers);
    }

    info!(
        policy = %cli.scheduler,
        workload = %cli.workload.display(),
        duration_secs = cli.duration,
        seed,
        "starting harness"
    );

    let collector = Benchmark::new(policy, Box::new(workload))
        .with_config(settings.bench_config(seed))
        .run(Duration::from_secs(cli.duration))
        .await?;

    collector
        .write_csv(&cli.output)
        .with_context(|| format!("failed to save results to {}", cli.output.display()))?;

    output::print_summary(&cli.scheduler, &collector.results(), &cli.output);
    Ok(())
}
