use crate::corpus::Variant;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompareError {
    #[error("Malformed corpus record at position {position}: {reason}")]
    Corpus { position: usize, reason: String },

    #[error("Query execution failed{}: {message}", side_label(.side))]
    Execution {
        side: Option<Variant>,
        message: String,
    },

    #[error("Pair {pair_id} is malformed: {reason}")]
    GroupShape { pair_id: usize, reason: String },

    #[error("Model unavailable ({}): {reason}", .path.display())]
    ModelUnavailable { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn side_label(side: &Option<Variant>) -> String {
    match side {
        Some(v) => format!(" for query {}", v),
        None => String::new(),
    }
}

impl CompareError {
    /// Execution failure attributed to one side of a pair.
    pub fn execution(side: Variant, err: impl std::fmt::Display) -> Self {
        CompareError::Execution {
            side: Some(side),
            message: err.to_string(),
        }
    }

    /// Which side of the pair failed, if the error is an execution failure.
    pub fn failed_side(&self) -> Option<Variant> {
        match self {
            CompareError::Execution { side, .. } => *side,
            _ => None,
        }
    }

    /// Tags an unattributed execution failure with the side it came from.
    pub fn on_side(self, variant: Variant) -> Self {
        match self {
            CompareError::Execution { side: None, message } => CompareError::Execution {
                side: Some(variant),
                message,
            },
            other => other,
        }
    }
}

impl From<rusqlite::Error> for CompareError {
    fn from(err: rusqlite::Error) -> Self {
        CompareError::Execution {
            side: None,
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
