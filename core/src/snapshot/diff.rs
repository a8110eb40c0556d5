//! Snapshot diffing: compare two `Snapshot` instances and produce the
//! minimal `ChangeSet` of paths that differ.
//!
//! A changed node dominates its descendants: once a path is recorded,
//! nothing below it is. Candidates are visited shallowest first so every
//! ancestor is decided before any of its descendants.

use std::cmp::Ordering;

use crate::namespace::path::segment_count;

use super::changes::ChangeSet;
use super::flatten::Snapshot;


/// Compute the roots of change between `old` and `new`.
pub fn diff(old: &Snapshot, new: &Snapshot) -> ChangeSet {
    let mut candidates: Vec<&str> = old.paths().chain(new.paths()).collect();
    candidates.sort_by(|a, b| shallow_first(a, b));
    candidates.dedup();

    let mut changes = ChangeSet::new();
    for path in candidates {
        if changes.covers(path) {
            continue;
        }
        if old.get(path) != new.get(path) {
            changes.insert(path.to_string());
        }
    }
    changes
}

fn shallow_first(a: &str, b: &str) -> Ordering {
    segment_count(a)
        .cmp(&segment_count(b))
        .then_with(|| a.cmp(b))
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::path::{is_descendant, remove, update};
    use crate::snapshot::flatten::snap;
    use crate::types::{Map, Opaque, Value};
    use proptest::prelude::*;
    use serde_json::json;

    fn tree(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    fn paths(changes: &ChangeSet) -> Vec<&str> {
        changes.iter().collect()
    }

    /// Diff a tree against itself after an in-place edit.
    fn diff_after(json: serde_json::Value, edit: impl FnOnce(&mut Value)) -> ChangeSet {
        let mut t = tree(json);
        let old = snap(&t);
        edit(&mut t);
        diff(&old, &snap(&t))
    }

    // --- In-place edits ---

    #[test]
    fn identical_snapshots_have_no_changes() {
        let t = tree(json!({"vars": {"a": 1, "b": [1, 2], "c": {"d": "x"}}}));
        assert!(diff(&snap(&t), &snap(&t)).is_empty());
    }

    #[test]
    fn leaf_change_is_reported_at_leaf() {
        let changes = diff_after(json!({"vars": {"score": 0}}), |t| {
            update(t, "vars.score", Value::from(10)).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.score"]);
    }

    #[test]
    fn deleted_leaf_is_reported() {
        let changes = diff_after(json!({"vars": {"x": 5}}), |t| {
            remove(t, "vars.x");
        });
        assert_eq!(paths(&changes), vec!["vars.x"]);
    }

    #[test]
    fn added_subtree_reports_only_its_root() {
        let changes = diff_after(json!({"vars": {}}), |t| {
            let trial = tree(json!({"id": 1, "stim": {"a": 1}}));
            update(t, "vars.trial", trial).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.trial"]);
    }

    #[test]
    fn removed_subtree_reports_only_its_root() {
        let changes = diff_after(json!({"vars": {"trial": {"id": 1}, "n": 1}}), |t| {
            remove(t, "vars.trial");
        });
        assert_eq!(paths(&changes), vec!["vars.trial"]);
    }

    #[test]
    fn kind_change_dominates_children() {
        let changes = diff_after(json!({"vars": {"trial": {"id": 1}}}), |t| {
            update(t, "vars.trial", Value::Null).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.trial"]);
    }

    #[test]
    fn null_and_missing_differ() {
        let changes = diff_after(json!({"vars": {}}), |t| {
            update(t, "vars.feedback", Value::Null).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.feedback"]);
    }

    #[test]
    fn list_growth_reports_new_index() {
        let changes = diff_after(json!({"vars": {"log": [1]}}), |t| {
            update(t, "vars.log.1", Value::from(2)).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.log.1"]);
    }

    #[test]
    fn multiple_independent_changes() {
        let changes = diff_after(json!({"vars": {"a": 1, "b": {"c": 2}, "d": 3}}), |t| {
            update(t, "vars.a", Value::from(2)).unwrap();
            update(t, "vars.b.c", Value::from(3)).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.a", "vars.b.c"]);
    }

    // --- Replaced compounds ---

    #[test]
    fn replaced_subtree_reports_its_root() {
        let changes = diff_after(json!({"vars": {"trial": {"id": 1, "stim": "A"}}}), |t| {
            update(t, "vars.trial", tree(json!({"id": 2, "stim": "B"}))).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.trial"]);
    }

    #[test]
    fn replacement_with_equal_content_is_a_change() {
        let changes = diff_after(json!({"vars": {"trial": {"id": 1}}}), |t| {
            update(t, "vars.trial", tree(json!({"id": 1}))).unwrap();
        });
        assert_eq!(paths(&changes), vec!["vars.trial"]);
    }

    #[test]
    fn independently_built_trees_differ_at_top_level() {
        let old = snap(&tree(json!({"vars": {"score": 0}})));
        let new = snap(&tree(json!({"vars": {"score": 0}})));
        assert_eq!(paths(&diff(&old, &new)), vec!["vars"]);
    }

    #[test]
    fn opaque_compares_by_identity() {
        let img = Opaque::new("img".to_string());
        let other = Opaque::new("img".to_string());
        let mut t = Value::from(Map::from([("img".to_string(), Value::Opaque(img.clone()))]));
        let old = snap(&t);

        update(&mut t, "img", Value::Opaque(img)).unwrap();
        assert!(diff(&old, &snap(&t)).is_empty());

        update(&mut t, "img", Value::Opaque(other)).unwrap();
        assert_eq!(paths(&diff(&old, &snap(&t))), vec!["img"]);
    }

    #[test]
    fn diff_from_empty_reports_top_level_roots() {
        let new = snap(&tree(json!({"vars": {"a": 1}, "other": 2})));
        assert_eq!(paths(&diff(&Snapshot::new(), &new)), vec!["other", "vars"]);
    }

    // --- Laws ---

    fn arb_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (-5i32..5).prop_map(Value::from),
            "[a-c]{0,2}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4)
                    .prop_map(|items: Vec<Value>| Value::from(items)),
                prop::collection::btree_map("[a-d]", inner, 0..4)
                    .prop_map(|m| Value::Map(Map::from(m))),
            ]
        })
    }

    fn arb_tree() -> impl Strategy<Value = Value> {
        arb_value().prop_map(|v| Value::Map(Map::from([("vars".to_string(), v)])))
    }

    proptest! {
        #[test]
        fn snap_twice_is_equal(t in arb_tree()) {
            prop_assert_eq!(snap(&t), snap(&t));
        }

        #[test]
        fn self_diff_is_empty(t in arb_tree()) {
            prop_assert!(diff(&snap(&t), &snap(&t)).is_empty());
        }

        #[test]
        fn no_entry_lies_below_another(a in arb_tree(), b in arb_tree()) {
            let changes = diff(&snap(&a), &snap(&b));
            for p in changes.iter() {
                for q in changes.iter() {
                    prop_assert!(!is_descendant(q, p), "{} lies below {}", q, p);
                }
            }
        }

        #[test]
        fn every_difference_is_covered(a in arb_tree(), b in arb_tree()) {
            let (old, new) = (snap(&a), snap(&b));
            let changes = diff(&old, &new);
            for path in old.paths().chain(new.paths()) {
                if old.get(path) != new.get(path) {
                    prop_assert!(changes.contains(path) || changes.covers(path));
                }
            }
        }
    }
}
