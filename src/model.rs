//! Trained model artifacts and column alignment.
//!
//! An artifact is a predictor together with the exact ordered list of
//! feature columns it was fit on. Feature vectors are re-indexed onto that
//! order before prediction: absent columns become 0, extra ones are dropped.
//! Fitting happens outside this crate; artifacts are loaded read-only.

use crate::error::{CompareError, Result};
use crate::features::FeatureVector;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Re-index `features` onto `columns`.
pub fn align(features: &FeatureVector, columns: &[String]) -> Vec<f64> {
    columns.iter().map(|col| features.value(col)).collect()
}

pub trait Predictor {
    /// Number of inputs the predictor expects.
    fn input_width(&self) -> usize;

    fn predict(&self, row: &[f64]) -> f64;
}

fn dot(weights: &[f64], row: &[f64]) -> f64 {
    weights.iter().zip(row).map(|(w, x)| w * x).sum()
}

/// Linear model over log1p(latency_ms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub intercept: f64,
    pub weights: Vec<f64>,
}

impl Predictor for LinearRegressor {
    fn input_width(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, row: &[f64]) -> f64 {
        self.intercept + dot(&self.weights, row)
    }
}

fn default_threshold() -> f64 {
    0.5
}

/// Logistic model; predicts 1.0 when the probability reaches `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticClassifier {
    pub intercept: f64,
    pub weights: Vec<f64>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticClassifier {
    pub fn probability(&self, row: &[f64]) -> f64 {
        let z = self.intercept + dot(&self.weights, row);
        1.0 / (1.0 + (-z).exp())
    }
}

impl Predictor for LogisticClassifier {
    fn input_width(&self) -> usize {
        self.weights.len()
    }

    fn predict(&self, row: &[f64]) -> f64 {
        if self.probability(row) >= self.threshold {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact<P> {
    /// Feature columns in fit order.
    pub columns: Vec<String>,
    pub predictor: P,
}

impl<P: Predictor> ModelArtifact<P> {
    pub fn new(columns: Vec<String>, predictor: P) -> Result<Self> {
        if predictor.input_width() != columns.len() {
            return Err(CompareError::Config(format!(
                "predictor expects {} inputs but {} columns were given",
                predictor.input_width(),
                columns.len()
            )));
        }
        Ok(Self { columns, predictor })
    }

    /// Align `features` to this artifact's columns and predict.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        self.predictor.predict(&align(features, &self.columns))
    }
}

impl<P: Predictor + DeserializeOwned> ModelArtifact<P> {
    /// Load a JSON artifact. Any failure is reported as `ModelUnavailable`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |reason: String| CompareError::ModelUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| unavailable(e.to_string()))?;
        let artifact: Self = serde_json::from_str(&content).map_err(|e| unavailable(e.to_string()))?;
        if artifact.predictor.input_width() != artifact.columns.len() {
            return Err(unavailable(format!(
                "predictor expects {} inputs but artifact lists {} columns",
                artifact.predictor.input_width(),
                artifact.columns.len()
            )));
        }

        info!("Loaded model from {} ({} columns)", path.display(), artifact.columns.len());
        Ok(artifact)
    }
}

impl<P: Serialize> ModelArtifact<P> {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Convert a log1p-scale latency prediction back to milliseconds.
pub fn latency_from_log(log_latency: f64) -> f64 {
    log_latency.exp_m1()
}
