//! Predicts which of two equivalent SQL rewrites runs faster from lexical
//! and query-plan features, and builds the training datasets for it.

pub mod collector;
pub mod config;
pub mod corpus;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod features;
pub mod inference;
pub mod model;

pub use error::{CompareError, Result};
