//! Feature vectors derived from SQL text and query plans.
//!
//! A [`FeatureVector`] is an insertion-ordered map from feature name to value.
//! Column order matters downstream: the dataset tables are written in this
//! order and trained models are fit against it.

pub mod lexical;
pub mod plan;

use serde::{Deserialize, Serialize};

pub use lexical::lexical_features;
pub use plan::plan_features;

/// Prefix carried by every pairwise difference feature.
pub const DIFF_PREFIX: &str = "diff_";

/// Ordered mapping from feature name to numeric value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a feature. Overwriting keeps the existing position.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.entries.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| *v)
    }

    /// Value of a feature, treating absent features as 0.
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `other` into `self`; later values win, new names are appended.
    pub fn extend(&mut self, other: FeatureVector) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }

    /// Pairwise difference `a - b` over the union of both key sets.
    ///
    /// Names are taken in `a`'s order first, then any names only `b` has.
    /// Absent entries on either side count as 0.
    pub fn diff(a: &FeatureVector, b: &FeatureVector) -> FeatureVector {
        let mut out = FeatureVector::new();
        for name in a.names().chain(b.names().filter(|n| !a.contains(n))) {
            out.insert(format!("{}{}", DIFF_PREFIX, name), a.value(name) - b.value(name));
        }
        out
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut fv = FeatureVector::new();
        for (name, value) in iter {
            fv.insert(name, value);
        }
        fv
    }
}

/// Lexical features of `sql` followed by plan features of `plan`.
pub fn combined_features(sql: &str, plan: &str) -> FeatureVector {
    let mut features = lexical_features(sql);
    features.extend(plan_features(plan));
    features
}
