//! Build-time steps: generate a pair corpus, collect timings, build feature tables.
//!
//! Run with: cargo run --bin pipeline -- <generate|collect|features>

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use query_comparator::collector::{read_timings, write_timings, TimingCollector};
use query_comparator::config::Config;
use query_comparator::corpus;
use query_comparator::dataset::DatasetBuilder;
use query_comparator::engine::SqliteEngine;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pipeline")]
#[command(about = "Corpus, timing and dataset steps for the query comparator")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a generated query-pair corpus
    Generate {
        /// Number of pairs
        #[arg(short, long, default_value_t = 400)]
        pairs: usize,

        /// RNG seed
        #[arg(short, long, default_value_t = 7)]
        seed: u64,
    },
    /// Time and explain every pair in the corpus against the database
    Collect {
        /// Untimed executions per query (overrides QC_WARMUPS)
        #[arg(long)]
        warmups: Option<usize>,

        /// Timed executions per query (overrides QC_RUNS)
        #[arg(long)]
        runs: Option<usize>,
    },
    /// Build the individual and pairwise feature tables from collected timings
    Features,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = Config::from_env()?;

    match args.command {
        Commands::Generate { pairs, seed } => {
            let generated = corpus::generate(pairs, seed);
            corpus::write_pairs(&config.pairs_path, &generated)?;
        }
        Commands::Collect { warmups, runs } => {
            if let Some(w) = warmups {
                config.timing.warmups = w;
            }
            if let Some(r) = runs {
                config.timing.runs = r;
            }

            let pairs = corpus::read_pairs(&config.pairs_path)?;
            let engine = SqliteEngine::open(&config.db_path)
                .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
            let records = TimingCollector::new(&engine, config.timing)?.collect(&pairs)?;
            write_timings(&config.timings_path, &records)?;
        }
        Commands::Features => {
            let records = read_timings(&config.timings_path)
                .with_context(|| format!("Failed to read {}", config.timings_path.display()))?;
            let datasets = DatasetBuilder::build(&records)?;
            datasets.write_csv(&config.individual_features_path, &config.pair_features_path)?;
            info!("Built datasets for {} pairs", datasets.pairs.len());
        }
    }

    Ok(())
}
