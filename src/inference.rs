//! Inference Adapter - predicted latencies and winner for a fresh query pair.
//!
//! Latency is never measured here. Predictions come back on the regressor's
//! training scale, log1p(milliseconds); use [`crate::model::latency_from_log`]
//! to get milliseconds.

use crate::collector::explain_plan;
use crate::corpus::Variant;
use crate::engine::QueryEngine;
use crate::error::Result;
use crate::features::{combined_features, plan, FeatureVector, DIFF_PREFIX};
use crate::model::{LinearRegressor, LogisticClassifier, ModelArtifact};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Trained artifacts, loaded once and shared by reference.
#[derive(Debug, Clone)]
pub struct ModelContext {
    pub regressor: ModelArtifact<LinearRegressor>,
    pub classifier: ModelArtifact<LogisticClassifier>,
}

impl ModelContext {
    pub fn load(regressor_path: impl AsRef<Path>, classifier_path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            regressor: ModelArtifact::load(regressor_path)?,
            classifier: ModelArtifact::load(classifier_path)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairPrediction {
    pub plan_a: String,
    pub plan_b: String,
    /// log1p(ms)
    pub log_latency_a: f64,
    /// log1p(ms)
    pub log_latency_b: f64,
    pub a_is_faster: bool,
}

impl PairPrediction {
    pub fn winner(&self) -> Variant {
        if self.a_is_faster {
            Variant::A
        } else {
            Variant::B
        }
    }
}

/// Difference features as used by the pairwise classifier.
///
/// Same as the training diff, plus an explicit `diff_uses_index` computed
/// straight from the plan texts.
pub fn pair_diff_features(features_a: &FeatureVector, features_b: &FeatureVector, plan_a: &str, plan_b: &str) -> FeatureVector {
    let mut diff = FeatureVector::diff(features_a, features_b);
    let index_a = plan::uses_index(plan_a) as i32;
    let index_b = plan::uses_index(plan_b) as i32;
    diff.insert(format!("{}uses_index", DIFF_PREFIX), f64::from(index_a - index_b));
    diff
}

pub struct InferenceAdapter<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    models: &'a ModelContext,
}

impl<'a, E: QueryEngine + ?Sized> InferenceAdapter<'a, E> {
    pub fn new(engine: &'a E, models: &'a ModelContext) -> Self {
        Self { engine, models }
    }

    /// Lexical features are taken from the SQL exactly as given, while the
    /// training rows hold whitespace-normalised SQL (see
    /// [`normalize_sql`](crate::collector::normalize_sql)). Normalise
    /// multi-line input first so keywords after a newline are counted.
    pub fn predict(&self, sql_a: &str, sql_b: &str) -> Result<PairPrediction> {
        let plan_a = explain_plan(self.engine, sql_a).map_err(|e| e.on_side(Variant::A))?;
        let plan_b = explain_plan(self.engine, sql_b).map_err(|e| e.on_side(Variant::B))?;

        let features_a = combined_features(sql_a, &plan_a);
        let features_b = combined_features(sql_b, &plan_b);

        let log_latency_a = self.models.regressor.predict(&features_a);
        let log_latency_b = self.models.regressor.predict(&features_b);

        let diff = pair_diff_features(&features_a, &features_b, &plan_a, &plan_b);
        let a_is_faster = self.models.classifier.predict(&diff) >= 0.5;

        debug!(
            "predicted A={:.3} B={:.3} winner={}",
            log_latency_a,
            log_latency_b,
            if a_is_faster { "A" } else { "B" }
        );

        Ok(PairPrediction {
            plan_a,
            plan_b,
            log_latency_a,
            log_latency_b,
            a_is_faster,
        })
    }
}
