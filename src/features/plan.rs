//! Plan features - index use, temp structures and scan/search counts.

use super::FeatureVector;

pub const FEATURE_NAMES: [&str; 4] = ["plan_uses_index", "plan_temp_btree", "plan_scan", "plan_search"];

/// True when the flattened plan mentions "using index".
pub fn uses_index(plan: &str) -> bool {
    plan.to_lowercase().contains("using index")
}

pub fn plan_features(plan: &str) -> FeatureVector {
    let p = format!(" {} ", plan.to_lowercase());

    // "use temp btree" implies "temp"; the bare substring is the effective test.
    let temp = p.contains("use temp btree") || p.contains("temp");

    let mut features = FeatureVector::new();
    features.insert("plan_uses_index", flag(p.contains("using index")));
    features.insert("plan_temp_btree", flag(temp));
    features.insert("plan_scan", p.matches("scan").count() as f64);
    features.insert("plan_search", p.matches("search").count() as f64);
    features
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_plan_is_all_zero() {
        let f = plan_features("");
        assert_eq!(f.names().collect::<Vec<_>>(), FEATURE_NAMES.to_vec());
        assert!(f.iter().all(|(_, v)| v == 0.0));
    }

    #[test]
    fn test_sqlite_plan_text() {
        let plan = "SEARCH u USING COVERING INDEX idx_users_country (country=?) | USE TEMP B-TREE FOR ORDER BY";
        let f = plan_features(plan);
        // "USING COVERING INDEX" does not contain "using index".
        assert_eq!(f.value("plan_uses_index"), 0.0);
        assert_eq!(f.value("plan_temp_btree"), 1.0);
        assert_eq!(f.value("plan_scan"), 0.0);
        assert_eq!(f.value("plan_search"), 1.0);

        let f = plan_features("SEARCH o USING INDEX idx_orders_user (user_id=?)");
        assert_eq!(f.value("plan_uses_index"), 1.0);
        assert_eq!(f.value("plan_temp_btree"), 0.0);
    }

    #[test]
    fn test_flags_are_binary() {
        let f = plan_features("SCAN o | SCAN p | SEARCH u USING INDEX a | SEARCH v USING INDEX b | TEMP x | TEMP y");
        assert_eq!(f.value("plan_uses_index"), 1.0);
        assert_eq!(f.value("plan_temp_btree"), 1.0);
        assert_eq!(f.value("plan_scan"), 2.0);
        assert_eq!(f.value("plan_search"), 2.0);
    }

    #[test]
    fn test_uses_index() {
        assert!(uses_index("SEARCH o USING INDEX idx_orders_user (user_id=?)"));
        assert!(!uses_index("SCAN o"));
    }
}
