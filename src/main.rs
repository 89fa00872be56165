use anyhow::{Context, Result};
use clap::Parser;
use query_comparator::config::Config;
use query_comparator::engine::SqliteEngine;
use query_comparator::inference::{InferenceAdapter, ModelContext, PairPrediction};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "query-comparator")]
#[command(about = "Predict which of two equivalent SQL queries runs faster")]
struct Args {
    /// Query A
    sql_a: String,

    /// Query B
    sql_b: String,

    /// SQLite database to plan against (default: QC_DB_PATH or data/synth.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Regression artifact (default: QC_REGRESSOR_PATH or models/regressor.json)
    #[arg(long)]
    regressor: Option<PathBuf>,

    /// Pairwise classifier artifact (default: QC_CLASSIFIER_PATH or models/pairwise_clf.json)
    #[arg(long)]
    classifier: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let db_path = args.db.unwrap_or(config.db_path);
    let regressor_path = args.regressor.unwrap_or(config.regressor_path);
    let classifier_path = args.classifier.unwrap_or(config.classifier_path);

    let models = ModelContext::load(&regressor_path, &classifier_path)?;
    let engine = SqliteEngine::open(&db_path)
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    info!("Planning against {}", db_path.display());

    let prediction = InferenceAdapter::new(&engine, &models).predict(&args.sql_a, &args.sql_b)?;
    print_prediction(&args.sql_a, &args.sql_b, &prediction);

    Ok(())
}

fn print_prediction(sql_a: &str, sql_b: &str, prediction: &PairPrediction) {
    println!("=== Query A ===");
    println!("{}", sql_a.trim());
    println!("Plan: {}", prediction.plan_a);
    println!("Predicted log-latency: {:.3}", prediction.log_latency_a);

    println!("\n=== Query B ===");
    println!("{}", sql_b.trim());
    println!("Plan: {}", prediction.plan_b);
    println!("Predicted log-latency: {:.3}", prediction.log_latency_b);

    println!("\n=== Verdict ===");
    println!("{} is faster", prediction.winner());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_two_queries_required() {
        let err = Args::try_parse_from(["query-comparator", "SELECT 1"]).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);
        assert!(err.render().to_string().contains("Usage"));
    }

    #[test]
    fn test_parse_queries_and_overrides() {
        let args = Args::try_parse_from(["query-comparator", "SELECT 1", "SELECT 2", "--db", "x.db"]).unwrap();
        assert_eq!(args.sql_a, "SELECT 1");
        assert_eq!(args.sql_b, "SELECT 2");
        assert_eq!(args.db, Some(PathBuf::from("x.db")));
        assert!(args.regressor.is_none());
    }
}
