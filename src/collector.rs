//! Timing/Plan Collector - measured latency and flattened plan per query variant.
//!
//! Timing is strictly sequential on one connection so both variants of a
//! pair see comparable cache state. Each variant runs `warmups` untimed
//! passes, then `runs` timed passes; the reported latency is the median of
//! the timed passes. For an even run count the upper of the two middle
//! values is used.

use crate::corpus::{QueryPair, QueryVariant, Variant};
use crate::engine::QueryEngine;
use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Separator placed between plan-step details.
pub const PLAN_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Untimed executions before measuring.
    pub warmups: usize,
    /// Timed executions; the median is reported.
    pub runs: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { warmups: 1, runs: 3 }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.runs == 0 {
            return Err(CompareError::Config("timed runs must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Measured latency and plan for one query variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub pair_id: usize,
    pub variant: Variant,
    pub tag: String,
    /// SQL with whitespace runs collapsed to single spaces.
    pub sql: String,
    pub plan: String,
    pub latency_ms: f64,
}

/// Join the detail (fourth) field of each plan step. Short steps are skipped.
pub fn flatten_plan(steps: &[Vec<String>]) -> String {
    steps
        .iter()
        .filter(|step| step.len() >= 4)
        .map(|step| step[3].as_str())
        .collect::<Vec<_>>()
        .join(PLAN_SEPARATOR)
}

/// Flattened plan text for `sql`.
pub fn explain_plan<E: QueryEngine + ?Sized>(engine: &E, sql: &str) -> Result<String> {
    Ok(flatten_plan(&engine.explain(sql)?))
}

pub fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Median of `samples`, taking the upper middle value for even lengths.
pub fn median(samples: &mut [f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(|a, b| a.total_cmp(b));
    Some(samples[samples.len() / 2])
}

fn round_ms(ms: f64) -> f64 {
    (ms * 1000.0).round() / 1000.0
}

pub struct TimingCollector<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    config: TimingConfig,
}

impl<'a, E: QueryEngine + ?Sized> TimingCollector<'a, E> {
    pub fn new(engine: &'a E, config: TimingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { engine, config })
    }

    /// Median wall-clock latency of `sql` in milliseconds.
    pub fn time_query(&self, sql: &str) -> Result<f64> {
        for _ in 0..self.config.warmups {
            self.engine.execute(sql)?;
        }

        let mut samples = Vec::with_capacity(self.config.runs);
        for _ in 0..self.config.runs {
            let start = Instant::now();
            self.engine.execute(sql)?;
            samples.push(start.elapsed().as_secs_f64() * 1000.0);
        }

        median(&mut samples).ok_or_else(|| CompareError::Config("timed runs must be at least 1".to_string()))
    }

    pub fn record(&self, pair_id: usize, query: &QueryVariant) -> Result<TimingRecord> {
        let attribute = |e: CompareError| match e {
            CompareError::Execution { message, .. } => CompareError::Execution {
                side: Some(query.variant),
                message: format!("pair {}: {}", pair_id, message),
            },
            other => other,
        };

        let plan = explain_plan(self.engine, &query.sql).map_err(attribute)?;
        let latency_ms = self.time_query(&query.sql).map_err(attribute)?;

        Ok(TimingRecord {
            pair_id,
            variant: query.variant,
            tag: query.tag.clone(),
            sql: normalize_sql(&query.sql),
            plan,
            latency_ms: round_ms(latency_ms),
        })
    }

    /// Records for both variants of every pair, pair id = corpus position.
    pub fn collect(&self, pairs: &[QueryPair]) -> Result<Vec<TimingRecord>> {
        let mut records = Vec::with_capacity(pairs.len() * 2);
        for (pair_id, pair) in pairs.iter().enumerate() {
            for variant in pair.variants() {
                let record = self.record(pair_id, &variant)?;
                debug!(
                    "pair {} {} [{}]: {:.3} ms",
                    pair_id, record.variant, record.tag, record.latency_ms
                );
                records.push(record);
            }
        }
        info!("Collected {} timing records for {} pairs", records.len(), pairs.len());
        Ok(records)
    }
}

pub fn write_timings(path: impl AsRef<Path>, records: &[TimingRecord]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("Wrote timing results to {}", path.display());
    Ok(())
}

pub fn read_timings(path: impl AsRef<Path>) -> Result<Vec<TimingRecord>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let records = reader.deserialize().collect::<std::result::Result<Vec<TimingRecord>, _>>()?;
    Ok(records)
}
