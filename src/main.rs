use analytics::{AnalyticsEngine, RollingStats, StatsInput, StrategyStats};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use configuration::Config;
use core_types::{FailurePolicy, ReturnSeries};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use wfo::{Benchmark, StrategyResult, StrategySimulator};

mod data;
mod progress;
mod report;

use progress::ProgressSink;

/// Number of holdings listed per rebalance.
const TOP_HOLDINGS: usize = 5;

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Rolling-window portfolio strategy backtester.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate every configured strategy and print its statistics.
    Simulate(SimulateArgs),
    /// Print the rolling windows the configuration generates.
    Windows(WindowsArgs),
}

#[derive(Parser)]
struct SimulateArgs {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "walkfolio.toml")]
    config: PathBuf,
    /// Asset return table (overrides `data.returns_path`).
    #[arg(long)]
    returns: Option<PathBuf>,
    /// Benchmark return table (overrides `data.benchmark_path`).
    #[arg(long)]
    benchmark: Option<PathBuf>,
    /// What to do when a window's weights cannot be computed.
    #[arg(long, value_enum)]
    on_failure: Option<FailurePolicy>,
    /// Threads for the weight calculation.
    #[arg(long)]
    workers: Option<usize>,
    /// Print the statistics as JSON instead of a table.
    #[arg(long)]
    json: bool,
    /// Also print every strategy's rebalances.
    #[arg(long)]
    rebalances: bool,
    /// Also compute rolling metrics over this many trailing periods.
    #[arg(long, value_name = "PERIODS")]
    rolling: Option<usize>,
}

#[derive(Parser)]
struct WindowsArgs {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "walkfolio.toml")]
    config: PathBuf,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => handle_simulate(args)?,
        Commands::Windows(args) => handle_windows(args)?,
    }

    Ok(())
}

fn load(path: &Path) -> Result<Config> {
    configuration::load_config(path).with_context(|| format!("failed to load {}", path.display()))
}

// ==============================================================================
// Simulate Command Logic
// ==============================================================================

fn handle_simulate(args: SimulateArgs) -> Result<()> {
    let mut config = load(&args.config)?;
    if let Some(policy) = args.on_failure {
        config.simulation.on_failure = policy;
    }
    if let Some(workers) = args.workers {
        config.simulation.worker_count = workers;
        config.simulation.validate()?;
    }
    if config.strategies.is_empty() {
        bail!("{} defines no [[strategies]]", args.config.display());
    }

    let returns_path = args
        .returns
        .or_else(|| config.data.returns_path.clone())
        .context("no return table: pass --returns or set data.returns_path")?;
    let returns = data::load_returns(&returns_path)?;
    let benchmark = match args.benchmark.or_else(|| config.data.benchmark_path.clone()) {
        Some(path) => {
            let series = data::load_benchmark(&path)?;
            let full = Benchmark::new(config.report.benchmark_name.clone(), series)?;
            Some(full.between(config.simulation.date_from, config.simulation.date_to)?)
        }
        None => None,
    };

    let windows = wfo::periods::from_config(&config.simulation)?;
    let sink = Arc::new(ProgressSink::new((windows.len() * config.strategies.len()) as u64)?);
    let simulator = StrategySimulator::new(config.simulation.clone(), sink.clone());

    let results = simulator.run(&config.strategies, &returns, benchmark.as_ref().map(|b| &b.returns))?;
    sink.finish();

    let stats = score(&config, &results, benchmark.as_ref());
    let rolling = match args.rolling {
        Some(window) => roll(&results, benchmark.as_ref(), window),
        None => Vec::new(),
    };

    if args.json {
        let output = if args.rolling.is_some() {
            serde_json::json!({ "stats": stats, "rolling": rolling })
        } else {
            serde_json::json!({ "stats": stats })
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", report::stats_table(&stats));
    if !rolling.is_empty() {
        println!("{}", report::rolling_table(&rolling));
    }
    for result in &results {
        report::print_failures(result);
    }
    if args.rebalances {
        for result in &results {
            println!("\n{} ({})", result.name, result.details.method);
            println!("{}", report::rebalance_table(&result.weights.rebalances(), TOP_HOLDINGS));
        }
    }
    Ok(())
}

/// Scores every strategy over their common date range, benchmark last.
fn score(config: &Config, results: &[StrategyResult], benchmark: Option<&Benchmark>) -> Vec<StrategyStats> {
    let engine = AnalyticsEngine::new();
    let inputs: Vec<StatsInput<'_>> = results.iter().map(|r| r.stats_input()).collect();
    let days_back = config.report.days_back;

    match benchmark {
        Some(benchmark) => engine.compare(&inputs, benchmark.stats_input(), days_back),
        None => {
            let empty = ReturnSeries::default();
            inputs.iter().map(|input| engine.calculate(*input, &empty, days_back)).collect()
        }
    }
}

/// Rolling metrics of every strategy, benchmark last.
fn roll(results: &[StrategyResult], benchmark: Option<&Benchmark>, window: usize) -> Vec<RollingStats> {
    let engine = AnalyticsEngine::new();
    results
        .iter()
        .map(|r| r.stats_input())
        .chain(benchmark.map(|b| b.stats_input()))
        .map(|input| engine.rolling(input, window))
        .collect()
}

// ==============================================================================
// Windows Command Logic
// ==============================================================================

fn handle_windows(args: WindowsArgs) -> Result<()> {
    let config = load(&args.config)?;
    let windows = wfo::periods::from_config(&config.simulation)?;
    println!("{}", report::windows_table(&windows));
    Ok(())
}
