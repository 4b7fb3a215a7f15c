//! delta CLI
//!
//! # Commands
//!
//! - `delta sweep --config <file>` - Solve every δ of an experiment and log results
//! - `delta render --config <file> --delta <d>` - Print one δ query as VNN-LIB
//! - `delta validate --config <file>` - Build every query without solving

use anyhow::Context;
use clap::{Parser, Subcommand};
use delta_core::{NetworkDescriptor, NetworkHandle};
use delta_query::{validate_delta, vnnlib};
use delta_solve::{run_experiment, ExperimentConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "delta")]
#[command(about = "Pairwise output robustness sweeps over a perturbation radius")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve every delta of an experiment, logging each result as it lands
    Sweep {
        /// Experiment configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print the query for one delta in VNN-LIB form
    Render {
        /// Experiment configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
        /// Perturbation radius
        #[arg(short, long)]
        delta: f64,
    },
    /// Load the experiment and build every query without solving
    Validate {
        /// Experiment configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load(config_path: &Path) -> anyhow::Result<(ExperimentConfig, NetworkDescriptor, Vec<f64>)> {
    let config = ExperimentConfig::from_path(config_path)
        .with_context(|| format!("loading experiment {}", config_path.display()))?;
    let network = config
        .load_network()
        .with_context(|| format!("loading network {}", config.network.display()))?;
    let base_input = config.load_base_input().context("loading base input")?;
    Ok((config, network, base_input))
}

fn sweep(config_path: &Path) -> anyhow::Result<()> {
    let config = ExperimentConfig::from_path(config_path)
        .with_context(|| format!("loading experiment {}", config_path.display()))?;
    info!(
        "Sweeping experiment '{}' over {} deltas",
        config.experiment_id,
        config.deltas.len()
    );
    let summary = run_experiment(&config)?;

    for entry in &summary.entries {
        println!("delta={} {}", entry.delta, entry.outcome.label());
    }
    println!(
        "{} deltas: {} UNSAT, {} SAT, {} ERROR",
        summary.entries.len(),
        summary.num_unsat(),
        summary.num_sat(),
        summary.num_errors()
    );
    match summary.max_unsat_delta() {
        Some(delta) => println!("Largest robust delta: {delta}"),
        None => println!("No delta proven robust"),
    }
    println!(
        "Results: {}",
        config.output_dir.join(&config.experiment_id).display()
    );
    Ok(())
}

fn render(config_path: &Path, delta: f64) -> anyhow::Result<()> {
    validate_delta(delta)?;
    let (config, network, base_input) = load(config_path)?;
    info!("Rendering '{}' at delta={delta}", network.name());
    let query = config.sweep().query_for(&network, &base_input, delta)?;
    print!("{}", vnnlib::render(&query));
    Ok(())
}

fn validate(config_path: &Path) -> anyhow::Result<()> {
    let (config, network, base_input) = load(config_path)?;
    info!(
        "Validating experiment '{}' on '{}'",
        config.experiment_id,
        network.name()
    );
    let sweep = config.sweep();
    let queries = if config.parallel {
        sweep.build_parallel(&network, &base_input)?
    } else {
        sweep.build(&network, &base_input)?
    };
    let warnings: usize = queries.iter().map(|q| q.diagnostics().len()).sum();
    let assertions = queries.first().map_or(0, |q| q.assertions().len());
    println!(
        "OK: {} queries for '{}' ({} inputs, {} outputs, {} assertions each, {} warnings)",
        queries.len(),
        network.name(),
        network.input_variable_ids().len(),
        network.output_variable_ids().len(),
        assertions,
        warnings
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Sweep { config } => sweep(&config),
        Commands::Render { config, delta } => render(&config, delta),
        Commands::Validate { config } => validate(&config),
    }
}
