//! Change sets and the `affects` relation between changed paths and
//! subscription queries.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::namespace::path::{ancestors, is_descendant, split_subtree};


/// True if a change at `changed` is relevant to a subscriber of `query`.
///
/// A plain query matches the path itself and anything below it. A `.*`
/// query matches its prefix and anything below the prefix. A change at an
/// ancestor of the query does not match here; see [`ChangeSet::reaches`].
pub fn affects(changed: &str, query: &str) -> bool {
    let (base, _) = split_subtree(query);
    changed == base || is_descendant(changed, base)
}


/// Roots of change between two snapshots.
///
/// Built by the differ, which guarantees no entry lies below another.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet {
    paths: BTreeSet<String>,
}

impl ChangeSet {
    pub fn new() -> Self {
        ChangeSet::default()
    }

    pub(crate) fn insert(&mut self, path: String) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Changed paths in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    /// True if any member affects `query`.
    pub fn affects(&self, query: &str) -> bool {
        self.paths.iter().any(|changed| affects(changed, query))
    }

    /// True if any strict ancestor of `path` is a member.
    pub fn covers(&self, path: &str) -> bool {
        ancestors(path).any(|a| self.paths.contains(a))
    }

    /// Whether a binding on `query` must be re-read: some member affects
    /// it, or some member is an ancestor of it (the subtree holding the
    /// bound node appeared, disappeared, or changed kind).
    pub fn reaches(&self, query: &str) -> bool {
        let (base, _) = split_subtree(query);
        self.affects(query) || self.covers(base)
    }
}

impl FromIterator<String> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        ChangeSet {
            paths: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<&'a str> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        iter.into_iter().map(str::to_string).collect()
    }
}

impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, path) in self.paths.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(path)?;
        }
        f.write_str("}")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    // --- affects ---

    #[test]
    fn wildcard_query_matches_subtree() {
        assert!(affects("a.b.c", "a.b.*"));
        assert!(affects("a.b", "a.b.*"));
        assert!(!affects("a.bc", "a.b.*"));
        assert!(!affects("a", "a.b.*"));
    }

    #[test]
    fn exact_and_descendant_match() {
        assert!(affects("a.b.c", "a.b.c"));
        assert!(affects("a.b.c", "a.b"));
        assert!(affects("a.b.c", "a"));
    }

    #[test]
    fn ancestor_change_does_not_affect() {
        assert!(!affects("a.b", "a.b.c"));
        assert!(!affects("a", "a.b"));
    }

    #[test]
    fn sibling_prefix_does_not_affect() {
        assert!(!affects("a.bc", "a.b"));
        assert!(!affects("a.b", "a.bc"));
    }

    // --- ChangeSet ---

    #[test]
    fn change_set_affects_any_member() {
        let changes: ChangeSet = ["vars.score", "vars.trial.id"].into_iter().collect();
        assert!(changes.affects("vars.score"));
        assert!(changes.affects("vars.trial"));
        assert!(changes.affects("vars.*"));
        assert!(!changes.affects("vars.feedback"));
        assert!(!changes.affects("vars.trial.id.x"));
    }

    #[test]
    fn reaches_includes_ancestor_members() {
        let changes: ChangeSet = ["vars.trial"].into_iter().collect();
        assert!(!changes.affects("vars.trial.id"));
        assert!(changes.reaches("vars.trial.id"));
        assert!(changes.reaches("vars.trial.*"));
        assert!(changes.reaches("vars"));
        assert!(!changes.reaches("vars.score"));
    }

    #[test]
    fn covers_is_strict() {
        let changes: ChangeSet = ["a.b"].into_iter().collect();
        assert!(changes.covers("a.b.c"));
        assert!(!changes.covers("a.b"));
        assert!(!changes.covers("a"));
    }

    #[test]
    fn display_is_sorted() {
        let changes: ChangeSet = ["b", "a.x"].into_iter().collect();
        assert_eq!(changes.to_string(), "{a.x, b}");
        assert_eq!(ChangeSet::new().to_string(), "{}");
    }

    #[test]
    fn serializes_as_path_list() {
        let changes: ChangeSet = ["vars.b", "vars.a"].into_iter().collect();
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!(["vars.a", "vars.b"]));
    }
}
