//! Reactive store: the state tree plus the last published snapshot.
//!
//! The store is the single owner of both shared resources. Collaborators
//! mutate the tree through it; `publish` takes a fresh snapshot, diffs it
//! against the last published one, and commits it when anything changed.

use crate::error::KeyPathError;
use crate::snapshot::{diff, snap, ChangeSet, Snapshot};
use crate::types::Value;

use super::path;


#[derive(Debug, Clone)]
pub struct ReactiveStore {
    tree: Value,
    published: Snapshot,
}

impl ReactiveStore {
    /// Create a store whose current tree counts as already published.
    pub fn new(tree: Value) -> Self {
        let published = snap(&tree);
        ReactiveStore { tree, published }
    }

    /// Create a store with nothing published yet, so the first `publish`
    /// reports every top-level entry.
    pub fn unpublished(tree: Value) -> Self {
        ReactiveStore {
            tree,
            published: Snapshot::new(),
        }
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Direct mutable access for collaborators that restructure the tree.
    pub fn tree_mut(&mut self) -> &mut Value {
        &mut self.tree
    }

    /// Read a node. Missing paths yield `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        path::extract(&self.tree, key)
    }

    /// Write a node whose parent already exists.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), KeyPathError> {
        path::update(&mut self.tree, key, value)
    }

    /// Write a node, creating missing intermediate maps.
    pub fn upsert(&mut self, key: &str, value: Value) -> Result<(), KeyPathError> {
        path::upsert(&mut self.tree, key, value)
    }

    /// Delete a node, returning it.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        path::remove(&mut self.tree, key)
    }

    /// Append with list semantics.
    ///
    /// - If the node doesn't exist (or is null), it becomes `[value]`.
    /// - If it holds a non-list value, it becomes `[existing, value]`.
    /// - If it holds a list, `value` is pushed onto it.
    pub fn append(&mut self, key: &str, value: Value) -> Result<(), KeyPathError> {
        match path::extract_mut(&mut self.tree, key) {
            Some(Value::List(items)) => {
                items.push(value);
                Ok(())
            }
            Some(slot) if slot.is_void() => {
                *slot = Value::from(vec![value]);
                Ok(())
            }
            Some(slot) => {
                let existing = std::mem::take(slot);
                *slot = Value::from(vec![existing, value]);
                Ok(())
            }
            None => path::update(&mut self.tree, key, Value::from(vec![value])),
        }
    }

    /// The snapshot observers last saw.
    pub fn published(&self) -> &Snapshot {
        &self.published
    }

    /// Changes since the last publish, without committing anything.
    pub fn pending(&self) -> ChangeSet {
        diff(&self.published, &snap(&self.tree))
    }

    /// Snapshot, diff against the published snapshot, and commit the new
    /// snapshot if anything changed.
    pub fn publish(&mut self) -> ChangeSet {
        let fresh = snap(&self.tree);
        let changes = diff(&self.published, &fresh);
        if !changes.is_empty() {
            self.published = fresh;
        }
        changes
    }

    /// Tear the store down, handing back the tree.
    pub fn into_tree(self) -> Value {
        self.tree
    }
}

impl Default for ReactiveStore {
    fn default() -> Self {
        ReactiveStore::new(Value::map())
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> ReactiveStore {
        ReactiveStore::new(Value::from(json!({"vars": {"score": 0, "log": ["a"]}})))
    }

    #[test]
    fn new_store_has_nothing_pending() {
        let s = store();
        assert!(s.pending().is_empty());
        assert_eq!(s.published().len(), 4);
    }

    #[test]
    fn unpublished_store_reports_top_level() {
        let mut s = ReactiveStore::unpublished(Value::from(json!({"vars": {"a": 1}})));
        let changes = s.publish();
        assert_eq!(changes.iter().collect::<Vec<_>>(), vec!["vars"]);
        assert!(s.publish().is_empty());
    }

    #[test]
    fn set_then_publish() {
        let mut s = store();
        s.set("vars.score", Value::from(10)).unwrap();
        assert_eq!(s.pending().iter().collect::<Vec<_>>(), vec!["vars.score"]);

        let changes = s.publish();
        assert_eq!(changes.iter().collect::<Vec<_>>(), vec!["vars.score"]);
        assert!(s.pending().is_empty());
        assert!(s.publish().is_empty());
    }

    #[test]
    fn pending_does_not_commit() {
        let mut s = store();
        s.set("vars.score", Value::from(1)).unwrap();
        assert_eq!(s.pending().len(), 1);
        assert_eq!(s.pending().len(), 1);
    }

    #[test]
    fn set_with_missing_parent_fails() {
        let mut s = store();
        assert!(s.set("vars.trial.id", Value::from(1)).is_err());
        s.upsert("vars.trial.id", Value::from(1)).unwrap();
        assert_eq!(s.get("vars.trial.id"), Some(&Value::Number(1.0)));
    }

    #[test]
    fn remove_is_published_as_change() {
        let mut s = store();
        assert_eq!(s.remove("vars.score"), Some(Value::Number(0.0)));
        assert_eq!(s.publish().iter().collect::<Vec<_>>(), vec!["vars.score"]);
    }

    #[test]
    fn append_extends_list() {
        let mut s = store();
        s.append("vars.log", Value::from("b")).unwrap();
        assert_eq!(s.get("vars.log").unwrap().to_json(), json!(["a", "b"]));
    }

    #[test]
    fn append_converts_scalar() {
        let mut s = store();
        s.append("vars.score", Value::from(1)).unwrap();
        assert_eq!(s.get("vars.score").unwrap().to_json(), json!([0.0, 1.0]));
    }

    #[test]
    fn append_creates_missing_leaf() {
        let mut s = store();
        s.append("vars.inbox", Value::from("hi")).unwrap();
        assert_eq!(s.get("vars.inbox").unwrap().to_json(), json!(["hi"]));
        assert!(s.append("vars.nope.inbox", Value::from("hi")).is_err());
    }

    #[test]
    fn tree_mut_changes_are_seen() {
        let mut s = store();
        if let Value::Map(vars) = s.tree_mut().child_mut("vars").unwrap() {
            vars.clear();
        }
        let changes = s.publish();
        assert_eq!(changes.iter().collect::<Vec<_>>(), vec!["vars.log", "vars.score"]);
    }

    #[test]
    fn into_tree_returns_contents() {
        let s = store();
        assert_eq!(s.into_tree().to_json(), json!({"vars": {"score": 0.0, "log": ["a"]}}));
    }
}
