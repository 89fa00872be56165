//! Query pair corpus - variant types, persisted text format and a seeded generator.
//!
//! Persisted layout, one record per pair:
//!
//! ```text
//! ###PAIR###
//! --A--
//! <sql a>
//! --B--
//! <sql b>
//! --TAG--
//! <tag>
//! ```
//!
//! Blocks are whitespace-trimmed on read. The text before the first sentinel
//! and whitespace-only chunks are skipped. Any other chunk missing one of the
//! `--A--`, `--B--` or `--TAG--` blocks, or with an empty block, fails the
//! whole read with the chunk's position, so pair ids never shift.

use crate::error::{CompareError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub const PAIR_SENTINEL: &str = "###PAIR###";
pub const A_MARKER: &str = "--A--";
pub const B_MARKER: &str = "--B--";
pub const TAG_MARKER: &str = "--TAG--";

/// Which side of a pair a query is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Variant {
    A,
    B,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::A => "A",
            Variant::B => "B",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(Variant::A),
            "B" => Ok(Variant::B),
            other => Err(format!("unknown variant '{}'", other)),
        }
    }
}

/// One formulation of a rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryVariant {
    pub sql: String,
    /// Rewrite category, e.g. "in_vs_exists"
    pub tag: String,
    pub variant: Variant,
}

/// Two semantically-equivalent formulations sharing a tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryPair {
    pub sql_a: String,
    pub sql_b: String,
    pub tag: String,
}

impl QueryPair {
    pub fn new(sql_a: impl Into<String>, sql_b: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            sql_a: sql_a.into(),
            sql_b: sql_b.into(),
            tag: tag.into(),
        }
    }

    /// Variant A then variant B.
    pub fn variants(&self) -> [QueryVariant; 2] {
        [
            QueryVariant {
                sql: self.sql_a.clone(),
                tag: self.tag.clone(),
                variant: Variant::A,
            },
            QueryVariant {
                sql: self.sql_b.clone(),
                tag: self.tag.clone(),
                variant: Variant::B,
            },
        ]
    }
}

/// Parse the persisted corpus format.
pub fn parse_pairs(content: &str) -> Result<Vec<QueryPair>> {
    let mut pairs = Vec::new();

    for (position, chunk) in content.split(PAIR_SENTINEL).enumerate() {
        if position == 0 || chunk.trim().is_empty() {
            debug!("Skipping corpus chunk {} with no record", position);
            continue;
        }
        let missing = |marker: &str| CompareError::Corpus {
            position,
            reason: format!("missing {} block", marker),
        };

        let (_, after_a) = chunk.split_once(A_MARKER).ok_or_else(|| missing(A_MARKER))?;
        let (a, after_b) = after_a.split_once(B_MARKER).ok_or_else(|| missing(B_MARKER))?;
        let (b, tag) = after_b.split_once(TAG_MARKER).ok_or_else(|| missing(TAG_MARKER))?;

        let (a, b, tag) = (a.trim(), b.trim(), tag.trim());
        for (block, text) in [("A", a), ("B", b), ("TAG", tag)] {
            if text.is_empty() {
                return Err(CompareError::Corpus {
                    position,
                    reason: format!("empty {} block", block),
                });
            }
        }

        pairs.push(QueryPair::new(a, b, tag));
    }

    Ok(pairs)
}

/// Render pairs in the persisted corpus format.
pub fn format_pairs(pairs: &[QueryPair]) -> String {
    let mut out = String::new();
    for pair in pairs {
        out.push_str(PAIR_SENTINEL);
        out.push('\n');
        for (marker, text) in [(A_MARKER, &pair.sql_a), (B_MARKER, &pair.sql_b), (TAG_MARKER, &pair.tag)] {
            out.push_str(marker);
            out.push('\n');
            out.push_str(text);
            out.push('\n');
        }
    }
    out
}

pub fn read_pairs(path: impl AsRef<Path>) -> Result<Vec<QueryPair>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let pairs = parse_pairs(&content)?;
    info!("Read {} query pairs from {}", pairs.len(), path.display());
    Ok(pairs)
}

pub fn write_pairs(path: impl AsRef<Path>, pairs: &[QueryPair]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, format_pairs(pairs))?;
    info!("Wrote {} query pairs to {}", pairs.len(), path.display());
    Ok(())
}

const COUNTRIES: [&str; 10] = ["IN", "US", "GB", "DE", "FR", "SG", "AU", "CA", "BR", "JP"];
const CATEGORIES: [&str; 6] = ["electronics", "books", "fashion", "home", "grocery", "toys"];
const STATUSES: [&str; 5] = ["placed", "shipped", "delivered", "cancelled", "returned"];

/// Rewrite categories the generator draws from.
pub const TEMPLATE_TAGS: [&str; 4] = ["in_vs_exists", "join_vs_subquery", "orderby_variant", "count_star_vs_one"];

/// Generate `n` pairs from the built-in rewrite templates.
///
/// Output is fully determined by `seed`.
pub fn generate(n: usize, seed: u64) -> Vec<QueryPair> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let template = rng.gen_range(0..TEMPLATE_TAGS.len());
            build_template(template, &mut rng)
        })
        .collect()
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

fn build_template(template: usize, rng: &mut StdRng) -> QueryPair {
    let tag = TEMPLATE_TAGS[template];
    let (a, b) = match template {
        0 => {
            let country = pick(rng, &COUNTRIES);
            (
                format!(
                    "SELECT u.user_id\nFROM users u\nWHERE u.country = '{country}'\n  \
                     AND u.user_id IN (SELECT o.user_id FROM orders o WHERE o.status='delivered');"
                ),
                format!(
                    "SELECT u.user_id\nFROM users u\nWHERE u.country = '{country}'\n  \
                     AND EXISTS (SELECT 1 FROM orders o WHERE o.user_id = u.user_id AND o.status='delivered');"
                ),
            )
        }
        1 => {
            let category = pick(rng, &CATEGORIES);
            (
                format!(
                    "SELECT o.order_id, p.price\nFROM orders o\nJOIN products p ON p.product_id = o.product_id\n\
                     WHERE p.category = '{category}' AND o.quantity >= 2;"
                ),
                format!(
                    "SELECT o.order_id,\n       (SELECT p.price FROM products p WHERE p.product_id = o.product_id) AS price\n\
                     FROM orders o\nWHERE (SELECT p.category FROM products p WHERE p.product_id = o.product_id) = '{category}'\n  \
                     AND o.quantity >= 2;"
                ),
            )
        }
        2 => {
            let status = pick(rng, &STATUSES);
            (
                format!(
                    "SELECT o.order_id, o.order_date\nFROM orders o\nWHERE o.status = '{status}'\n\
                     ORDER BY o.order_date DESC\nLIMIT 200;"
                ),
                format!(
                    "SELECT o.order_id, o.order_date\nFROM orders o\nWHERE o.status = '{status}'\n\
                     ORDER BY o.order_id DESC\nLIMIT 200;"
                ),
            )
        }
        _ => {
            let country = pick(rng, &COUNTRIES);
            (
                format!("SELECT COUNT(*) AS c\nFROM users u\nWHERE u.country = '{country}';"),
                format!("SELECT COUNT(1) AS c\nFROM users u\nWHERE u.country = '{country}';"),
            )
        }
    };
    QueryPair::new(a.trim(), b.trim(), tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_two_records() {
        let text = "###PAIR###\n--A--\nSELECT 1;\n--B--\nSELECT 2;\n--TAG--\nt1\n\
                    ###PAIR###\n--A--\n  SELECT a\n  FROM x;\n--B--\nSELECT b FROM x;\n--TAG--\nt2\n";
        let pairs = parse_pairs(text).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], QueryPair::new("SELECT 1;", "SELECT 2;", "t1"));
        assert_eq!(pairs[1].sql_a, "SELECT a\n  FROM x;");
        assert_eq!(pairs[1].tag, "t2");
    }

    #[test]
    fn test_missing_tag_fails_with_position() {
        let text = "###PAIR###\n--A--\nSELECT 1;\n--B--\nSELECT 2;\n--TAG--\nok\n###PAIR###\n--A--\nSELECT 1;\n--B--\nSELECT 2;\n";
        match parse_pairs(text) {
            Err(CompareError::Corpus { position, .. }) => assert_eq!(position, 2),
            other => panic!("expected corpus error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_block_fails() {
        let text = "###PAIR###\n--A--\n\n--B--\nSELECT 2;\n--TAG--\nt\n";
        assert!(matches!(parse_pairs(text), Err(CompareError::Corpus { position: 1, .. })));
    }

    #[test]
    fn test_leading_text_and_blank_chunks_are_skipped() {
        let text = "header noise\n###PAIR###\n--A--\nSELECT 1;\n--B--\nSELECT 2;\n--TAG--\nt\n###PAIR###\n  \n";
        assert_eq!(parse_pairs(text).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_b_fails_with_position() {
        let text = "###PAIR###\n--A--\nSELECT 1;\n--B--\nSELECT 2;\n--TAG--\nt0\n\
                    ###PAIR###\n--A--\nSELECT 1;\n--TAG--\nt1\n\
                    ###PAIR###\n--A--\nSELECT 1;\n--B--\nSELECT 2;\n--TAG--\nt2\n";
        match parse_pairs(text) {
            Err(CompareError::Corpus { position, reason }) => {
                assert_eq!(position, 2);
                assert!(reason.contains("--B--"));
            }
            other => panic!("expected corpus error, got {:?}", other),
        }
    }

    #[test]
    fn test_chunk_without_markers_fails() {
        let text = "###PAIR###\n--A--\nSELECT 1;\n--B--\nSELECT 2;\n--TAG--\nt\n###PAIR###\njunk\n";
        assert!(matches!(parse_pairs(text), Err(CompareError::Corpus { position: 2, .. })));
    }

    #[test]
    fn test_generated_corpus_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("query_pairs.txt");
        let pairs = generate(25, 7);

        write_pairs(&path, &pairs).unwrap();
        let back = read_pairs(&path).unwrap();

        assert_eq!(back.len(), 25);
        assert_eq!(back, pairs);
    }

    #[test]
    fn test_generate_is_seeded() {
        assert_eq!(generate(10, 42), generate(10, 42));
        for pair in generate(40, 1) {
            assert!(TEMPLATE_TAGS.contains(&pair.tag.as_str()));
            assert_ne!(pair.sql_a, pair.sql_b);
        }
    }

    #[test]
    fn test_variants_are_a_then_b() {
        let [a, b] = QueryPair::new("x", "y", "t").variants();
        assert_eq!((a.variant, a.sql.as_str()), (Variant::A, "x"));
        assert_eq!((b.variant, b.sql.as_str()), (Variant::B, "y"));
        assert_eq!(b.tag, "t");
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("A".parse::<Variant>().unwrap(), Variant::A);
        assert!("C".parse::<Variant>().is_err());
    }
}
