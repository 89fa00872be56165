//! Lexical features - keyword and punctuation counts over raw SQL text.
//!
//! The text is lowercased and padded with one space on each side, then every
//! vocabulary entry is counted as a non-overlapping substring. This is not a
//! tokenizer: a keyword inside a string literal or identifier still counts.
//! Feature names are part of the dataset contract and must not change.

use super::FeatureVector;

/// Vocabulary as (padded pattern, feature name) pairs.
pub const KEYWORDS: [(&str, &str); 15] = [
    (" join ", "kw_join"),
    (" exists ", "kw_exists"),
    (" in ", "kw_in"),
    (" group by ", "kw_group by"),
    (" order by ", "kw_order by"),
    (" limit ", "kw_limit"),
    (" where ", "kw_where"),
    (" select ", "kw_select"),
    (" count(", "kw_count("),
    (" sum(", "kw_sum("),
    (" avg(", "kw_avg("),
    (" min(", "kw_min("),
    (" max(", "kw_max("),
    (" distinct ", "kw_distinct"),
    (" subquery ", "kw_subquery"),
];

/// Every name produced by [`lexical_features`], in output order.
pub const FEATURE_NAMES: [&str; 20] = [
    "kw_join",
    "kw_exists",
    "kw_in",
    "kw_group by",
    "kw_order by",
    "kw_limit",
    "kw_where",
    "kw_select",
    "kw_count(",
    "kw_sum(",
    "kw_avg(",
    "kw_min(",
    "kw_max(",
    "kw_distinct",
    "kw_subquery",
    "num_parens",
    "num_equals",
    "num_and",
    "num_or",
    "len_chars",
];

/// Lowercase and pad with a leading and trailing space.
pub fn normalize(sql: &str) -> String {
    format!(" {} ", sql.to_lowercase())
}

pub fn lexical_features(sql: &str) -> FeatureVector {
    let s = normalize(sql);
    let mut features = FeatureVector::new();

    for (pattern, name) in KEYWORDS {
        features.insert(name, count(&s, pattern));
    }

    features.insert("num_parens", count(&s, "("));
    features.insert("num_equals", count(&s, "="));
    features.insert("num_and", count(&s, " and "));
    features.insert("num_or", count(&s, " or "));
    features.insert("len_chars", s.chars().count() as f64);

    features
}

fn count(haystack: &str, needle: &str) -> f64 {
    haystack.matches(needle).count() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_key_set_in_order() {
        let f = lexical_features("select * from users");
        assert_eq!(f.names().collect::<Vec<_>>(), FEATURE_NAMES.to_vec());
    }

    #[test]
    fn test_empty_input_is_all_zero_but_length() {
        let f = lexical_features("");
        for name in &FEATURE_NAMES[..FEATURE_NAMES.len() - 1] {
            assert_eq!(f.value(name), 0.0, "{name}");
        }
        // Two padding spaces.
        assert_eq!(f.value("len_chars"), 2.0);
    }

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        let f = lexical_features("SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id WHERE u.country = 'US' AND o.qty > 1");
        assert_eq!(f.value("kw_select"), 1.0);
        assert_eq!(f.value("kw_join"), 1.0);
        assert_eq!(f.value("kw_where"), 1.0);
        assert_eq!(f.value("num_equals"), 2.0);
        assert_eq!(f.value("num_and"), 1.0);
    }

    #[test]
    fn test_keyword_needs_surrounding_spaces() {
        // "joined" and "(select" are not the padded keywords.
        let f = lexical_features("select joined from t where x in(select 1)");
        assert_eq!(f.value("kw_join"), 0.0);
        assert_eq!(f.value("kw_select"), 1.0);
        assert_eq!(f.value("kw_in"), 0.0);
    }

    #[test]
    fn test_count_star_vs_count_one() {
        let a = lexical_features("SELECT COUNT(*) FROM users WHERE country='US'");
        let b = lexical_features("SELECT COUNT(1) FROM users WHERE country='US'");
        assert_eq!(a.value("kw_count("), 1.0);
        assert_eq!(b.value("kw_count("), 1.0);
        assert_eq!(a.value("num_parens"), b.value("num_parens"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_idempotent() {
        let sql = "SELECT DISTINCT name FROM products ORDER BY price LIMIT 5";
        assert_eq!(lexical_features(sql), lexical_features(sql));
    }

    #[test]
    fn test_len_counts_characters_not_bytes() {
        let f = lexical_features("é");
        assert_eq!(f.value("len_chars"), 3.0);
    }
}
