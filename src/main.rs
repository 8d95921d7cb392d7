//! rankbench CLI
//!
//! Two batch commands over one properties file:
//!
//! 1. `recommendations`: build every recommender in an experiment list and
//!    write its lists under the recommendation path.
//! 2. `metrics`: evaluate the lists of every experiment in a list against
//!    the metrics of a metrics file, writing rows to stdout.
//!
//! Diagnostics go to stderr through `tracing`; stdout carries only metric
//! rows. The exit status reflects the run, not individual experiments.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rankbench::evaluation::RowSink;
use rankbench::{MetricsBatch, Properties, RecommendationBatch, Registry, RunContext};

/// Offline recommender-system experiments
///
/// Experiment lists hold one experiment per line:
///   knn-rec recommender=ub neighborhood=knn neighborhood.k=5 neighborhood.sim=cosine
///
/// Examples:
///   rankbench recommendations run.toml experiments.txt
///   cat experiments.txt | rankbench recommendations run.toml -
///   rankbench metrics run.toml metrics.txt experiments.txt > results.tsv
#[derive(Parser, Debug)]
#[command(name = "rankbench")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Debug-level diagnostics (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build recommenders and write their recommendation lists
    Recommendations {
        /// Run properties (TOML)
        properties: PathBuf,
        /// Experiment list, or - for stdin
        input: String,
    },

    /// Evaluate recommendation lists and print metric rows
    Metrics {
        /// Run properties (TOML)
        properties: PathBuf,
        /// Metric definitions, one per line
        metrics: PathBuf,
        /// Experiment list, or - for stdin
        input: String,
    },

    /// List every component family and its variant names
    Variants,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Command::Recommendations { properties, input } => {
            let ctx = load_context(properties)?;
            let start = Instant::now();
            let batch = RecommendationBatch::new(ctx)?;
            let summary = batch.run(open_input(input)?)?;
            info!(%summary, elapsed = ?start.elapsed(), "recommendations finished");
        }
        Command::Metrics {
            properties,
            metrics,
            input,
        } => {
            let ctx = load_context(properties)?;
            let start = Instant::now();
            let definitions = File::open(metrics)
                .with_context(|| format!("Failed to open metrics file: {}", metrics.display()))?;
            let batch = MetricsBatch::new(ctx, BufReader::new(definitions))?;
            let sink = RowSink::new(io::stdout());
            let summary = batch.run(open_input(input)?, &sink)?;
            info!(%summary, elapsed = ?start.elapsed(), "metrics finished");
        }
        Command::Variants => {
            let registry = Registry::new(Arc::new(RunContext::new(Properties::with_base("."))));
            for (family, variants) in registry.catalog() {
                println!("{family}: {}", variants.join(", "));
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_context(path: &Path) -> Result<Arc<RunContext>> {
    let properties = Properties::load(path)?;
    debug!("\n{}", properties.display_summary());
    Ok(Arc::new(RunContext::new(properties)))
}

fn open_input(input: &str) -> Result<Box<dyn BufRead>> {
    if input == "-" {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file = File::open(input).with_context(|| format!("Failed to open experiment list: {input}"))?;
    Ok(Box::new(BufReader::new(file)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendations_args() {
        let cli = Cli::try_parse_from(["rankbench", "recommendations", "run.toml", "-"]).unwrap();
        match cli.command {
            Command::Recommendations { properties, input } => {
                assert_eq!(properties, PathBuf::from("run.toml"));
                assert_eq!(input, "-");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!cli.verbose);
    }

    #[test]
    fn test_metrics_args_with_global_verbose() {
        let cli = Cli::try_parse_from([
            "rankbench",
            "metrics",
            "run.toml",
            "metrics.txt",
            "experiments.txt",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Metrics { .. }));
    }

    #[test]
    fn test_missing_input_is_rejected() {
        assert!(Cli::try_parse_from(["rankbench", "recommendations", "run.toml"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
