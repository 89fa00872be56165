//! Runtime configuration: file locations and timing knobs.
//!
//! Defaults follow the on-disk layout of an experiment run (`data/`,
//! `models/`). Each field can be overridden by a `QC_*` environment
//! variable; `.env` is read first when present.

use crate::collector::TimingConfig;
use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub db_path: PathBuf,
    pub pairs_path: PathBuf,
    pub timings_path: PathBuf,
    pub individual_features_path: PathBuf,
    pub pair_features_path: PathBuf,
    pub regressor_path: PathBuf,
    pub classifier_path: PathBuf,
    pub timing: TimingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/synth.db"),
            pairs_path: PathBuf::from("data/query_pairs.txt"),
            timings_path: PathBuf::from("data/timings.csv"),
            individual_features_path: PathBuf::from("data/features_individual.csv"),
            pair_features_path: PathBuf::from("data/features_pairs.csv"),
            regressor_path: PathBuf::from("models/regressor.json"),
            classifier_path: PathBuf::from("models/pairwise_clf.json"),
            timing: TimingConfig::default(),
        }
    }
}

impl Config {
    /// Defaults overridden from `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `QC_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        let paths = [
            ("QC_DB_PATH", &mut config.db_path),
            ("QC_PAIRS_PATH", &mut config.pairs_path),
            ("QC_TIMINGS_PATH", &mut config.timings_path),
            ("QC_INDIVIDUAL_FEATURES_PATH", &mut config.individual_features_path),
            ("QC_PAIR_FEATURES_PATH", &mut config.pair_features_path),
            ("QC_REGRESSOR_PATH", &mut config.regressor_path),
            ("QC_CLASSIFIER_PATH", &mut config.classifier_path),
        ];
        for (key, slot) in paths {
            if let Some(value) = lookup(key) {
                *slot = PathBuf::from(value);
            }
        }

        if let Some(value) = lookup("QC_WARMUPS") {
            config.timing.warmups = parse_number("QC_WARMUPS", &value)?;
        }
        if let Some(value) = lookup("QC_RUNS") {
            config.timing.runs = parse_number("QC_RUNS", &value)?;
        }
        config.timing.validate()?;

        Ok(config)
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CompareError::Config(format!("{} must be a non-negative integer, got '{}'", key, value)))
}
