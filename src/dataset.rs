//! Dataset Builder - individual latency rows and pairwise difference rows.

use crate::collector::TimingRecord;
use crate::corpus::Variant;
use crate::features::{combined_features, FeatureVector};
use crate::error::{CompareError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::info;

/// Label column of the pairwise table.
pub const LABEL_COLUMN: &str = "label_A_is_faster";

/// One per timing record: combined features plus identifying columns.
#[derive(Debug, Clone, PartialEq)]
pub struct IndividualRow {
    pub features: FeatureVector,
    pub pair_id: usize,
    pub variant: Variant,
    pub tag: String,
    pub latency_ms: f64,
}

/// One per pair: `diff_*` features and whether A was strictly faster.
#[derive(Debug, Clone, PartialEq)]
pub struct PairRow {
    pub diffs: FeatureVector,
    pub pair_id: usize,
    pub a_is_faster: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// Header plus rows, written as comma-delimited text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|c| c.to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub individual: Vec<IndividualRow>,
    pub pairs: Vec<PairRow>,
}

impl Datasets {
    pub fn individual_table(&self) -> Table {
        let mut columns: Vec<String> = self
            .individual
            .first()
            .map(|row| row.features.names().map(str::to_string).collect())
            .unwrap_or_default();
        columns.extend(["pair_id", "variant", "tag", "latency_ms"].map(String::from));

        let rows = self
            .individual
            .iter()
            .map(|row| {
                let mut cells: Vec<Cell> = row.features.iter().map(|(_, v)| Cell::Float(v)).collect();
                cells.push(Cell::Int(row.pair_id as i64));
                cells.push(Cell::Text(row.variant.to_string()));
                cells.push(Cell::Text(row.tag.clone()));
                cells.push(Cell::Float(row.latency_ms));
                cells
            })
            .collect();

        Table { columns, rows }
    }

    pub fn pair_table(&self) -> Table {
        let mut columns: Vec<String> = self
            .pairs
            .first()
            .map(|row| row.diffs.names().map(str::to_string).collect())
            .unwrap_or_default();
        columns.push("pair_id".to_string());
        columns.push(LABEL_COLUMN.to_string());

        let rows = self
            .pairs
            .iter()
            .map(|row| {
                let mut cells: Vec<Cell> = row.diffs.iter().map(|(_, v)| Cell::Float(v)).collect();
                cells.push(Cell::Int(row.pair_id as i64));
                cells.push(Cell::Int(row.a_is_faster as i64));
                cells
            })
            .collect();

        Table { columns, rows }
    }

    /// Write both tables as CSV.
    pub fn write_csv(&self, individual_path: impl AsRef<Path>, pairs_path: impl AsRef<Path>) -> Result<()> {
        self.individual_table().write_csv(individual_path.as_ref())?;
        self.pair_table().write_csv(pairs_path.as_ref())?;
        info!(
            "Saved {} individual rows to {} and {} pair rows to {}",
            self.individual.len(),
            individual_path.as_ref().display(),
            self.pairs.len(),
            pairs_path.as_ref().display()
        );
        Ok(())
    }
}

pub struct DatasetBuilder;

impl DatasetBuilder {
    /// Build both datasets. Every pair id must have exactly one A and one B record.
    pub fn build(records: &[TimingRecord]) -> Result<Datasets> {
        let groups = Self::group(records)?;

        let mut individual = Vec::with_capacity(records.len());
        let mut pairs = Vec::with_capacity(groups.len());

        for (pair_id, (a, b)) in groups {
            let features_a = combined_features(&a.sql, &a.plan);
            let features_b = combined_features(&b.sql, &b.plan);

            pairs.push(PairRow {
                diffs: FeatureVector::diff(&features_a, &features_b),
                pair_id,
                a_is_faster: a_is_faster(a.latency_ms, b.latency_ms),
            });

            for (record, features) in [(a, features_a), (b, features_b)] {
                individual.push(IndividualRow {
                    features,
                    pair_id,
                    variant: record.variant,
                    tag: record.tag.clone(),
                    latency_ms: record.latency_ms,
                });
            }
        }

        Ok(Datasets { individual, pairs })
    }

    fn group(records: &[TimingRecord]) -> Result<BTreeMap<usize, (&TimingRecord, &TimingRecord)>> {
        let mut slots: BTreeMap<usize, (Option<&TimingRecord>, Option<&TimingRecord>)> = BTreeMap::new();

        for record in records {
            let slot = slots.entry(record.pair_id).or_default();
            let side = match record.variant {
                Variant::A => &mut slot.0,
                Variant::B => &mut slot.1,
            };
            if side.replace(record).is_some() {
                return Err(CompareError::GroupShape {
                    pair_id: record.pair_id,
                    reason: format!("more than one {} record", record.variant),
                });
            }
        }

        slots
            .into_iter()
            .map(|(pair_id, slot)| match slot {
                (Some(a), Some(b)) => Ok((pair_id, (a, b))),
                (None, _) => Err(CompareError::GroupShape {
                    pair_id,
                    reason: "missing A record".to_string(),
                }),
                (_, None) => Err(CompareError::GroupShape {
                    pair_id,
                    reason: "missing B record".to_string(),
                }),
            })
            .collect()
    }
}

/// Strict comparison; equal latencies label B as the winner.
pub fn a_is_faster(latency_a: f64, latency_b: f64) -> bool {
    latency_a < latency_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::lexical;
    use tempfile::TempDir;

    fn record(pair_id: usize, variant: Variant, sql: &str, plan: &str, latency_ms: f64) -> TimingRecord {
        TimingRecord {
            pair_id,
            variant,
            tag: "t".to_string(),
            sql: sql.to_string(),
            plan: plan.to_string(),
            latency_ms,
        }
    }

    fn sample() -> Vec<TimingRecord> {
        vec![
            record(1, Variant::B, "SELECT COUNT(1) FROM users", "SCAN users", 2.0),
            record(0, Variant::B, "SELECT a FROM t WHERE x IN (SELECT y FROM u)", "SCAN t", 5.0),
            record(0, Variant::A, "SELECT a FROM t WHERE EXISTS (SELECT 1 FROM u)", "SEARCH t USING INDEX i (x=?)", 1.5),
            record(1, Variant::A, "SELECT COUNT(*) FROM users", "SCAN users", 2.0),
        ]
    }

    #[test]
    fn test_individual_rows_sorted_by_pair_then_variant() {
        let ds = DatasetBuilder::build(&sample()).unwrap();
        let order: Vec<_> = ds.individual.iter().map(|r| (r.pair_id, r.variant)).collect();
        assert_eq!(order, vec![(0, Variant::A), (0, Variant::B), (1, Variant::A), (1, Variant::B)]);
    }

    #[test]
    fn test_label_is_strict_and_ties_go_to_b() {
        let ds = DatasetBuilder::build(&sample()).unwrap();
        assert!(ds.pairs[0].a_is_faster);
        assert!(!ds.pairs[1].a_is_faster);
    }

    #[test]
    fn test_diff_is_a_minus_b() {
        let ds = DatasetBuilder::build(&sample()).unwrap();
        let pair = &ds.pairs[0];
        assert_eq!(pair.diffs.value("diff_kw_exists"), 1.0);
        assert_eq!(pair.diffs.value("diff_kw_in"), -1.0);
        assert_eq!(pair.diffs.value("diff_plan_uses_index"), 1.0);
        assert_eq!(pair.diffs.value("diff_plan_scan"), -1.0);
        assert_eq!(pair.diffs.value("diff_plan_search"), 1.0);

        let a = &ds.individual[0].features;
        let b = &ds.individual[1].features;
        for (name, value) in pair.diffs.iter() {
            let key = name.trim_start_matches("diff_");
            assert_eq!(value, a.value(key) - b.value(key));
        }
    }

    #[test]
    fn test_missing_b_is_fatal() {
        let mut records = sample();
        records.retain(|r| !(r.pair_id == 1 && r.variant == Variant::B));
        match DatasetBuilder::build(&records) {
            Err(CompareError::GroupShape { pair_id, reason }) => {
                assert_eq!(pair_id, 1);
                assert!(reason.contains("missing B"));
            }
            other => panic!("expected group shape error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_variant_is_fatal() {
        let mut records = sample();
        records.push(record(0, Variant::A, "SELECT 1", "", 1.0));
        assert!(matches!(
            DatasetBuilder::build(&records),
            Err(CompareError::GroupShape { pair_id: 0, .. })
        ));
    }

    #[test]
    fn test_table_columns() {
        let ds = DatasetBuilder::build(&sample()).unwrap();

        let individual = ds.individual_table();
        assert_eq!(individual.columns.len(), lexical::FEATURE_NAMES.len() + 4 + 4);
        assert_eq!(individual.columns[0], "kw_join");
        assert_eq!(&individual.columns[individual.columns.len() - 4..], ["pair_id", "variant", "tag", "latency_ms"]);

        let pairs = ds.pair_table();
        assert_eq!(pairs.columns[0], "diff_kw_join");
        assert_eq!(pairs.columns.last().map(String::as_str), Some(LABEL_COLUMN));
        assert_eq!(pairs.column(LABEL_COLUMN).unwrap(), vec![&Cell::Int(1), &Cell::Int(0)]);
    }

    #[test]
    fn test_write_csv() {
        let dir = TempDir::new().unwrap();
        let ind = dir.path().join("features_individual.csv");
        let pairs = dir.path().join("features_pairs.csv");
        DatasetBuilder::build(&sample()).unwrap().write_csv(&ind, &pairs).unwrap();

        let text = std::fs::read_to_string(&pairs).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().ends_with("diff_plan_search,pair_id,label_A_is_faster"));
        assert!(lines.next().unwrap().ends_with(",0,1"));
        assert_eq!(std::fs::read_to_string(&ind).unwrap().lines().count(), 5);
    }
}
