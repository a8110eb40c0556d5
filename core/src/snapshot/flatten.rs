//! Flattening of the state tree into path-addressed snapshots.
//!
//! `flatten` walks the tree depth-first in pre-order and yields one
//! `(path, SnapValue)` pair per node below the root, compound nodes
//! included. `snap` materializes that walk into a `Snapshot`.

use std::collections::HashMap;

use crate::types::{NodeId, Opaque, Value};


// ---------------------------------------------------------------------------
// SnapValue
// ---------------------------------------------------------------------------

/// What a snapshot remembers about one node.
///
/// Scalars keep their value and compare by primitive equality. Opaque
/// values keep their handle and compare by identity. Compound nodes keep
/// their [`NodeId`]: a map edited in place stays equal to itself, so those
/// changes surface at the children that moved, while a map replaced by a
/// new one differs at its own path.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapValue {
    /// Null or NaN.
    Empty,
    Bool(bool),
    Number(f64),
    String(String),
    List(NodeId),
    Map(NodeId),
    Opaque(Opaque),
}

impl SnapValue {
    pub fn of(value: &Value) -> Self {
        if value.is_void() {
            return SnapValue::Empty;
        }
        match value {
            Value::Null => SnapValue::Empty,
            Value::Bool(b) => SnapValue::Bool(*b),
            Value::Number(n) => SnapValue::Number(*n),
            Value::String(s) => SnapValue::String(s.clone()),
            Value::List(list) => SnapValue::List(list.id()),
            Value::Map(map) => SnapValue::Map(map.id()),
            Value::Opaque(o) => SnapValue::Opaque(o.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SnapValue::Empty)
    }
}


// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Flat map from path to node at one instant. The root is not included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: HashMap<String, SnapValue>,
}

impl Snapshot {
    pub fn new() -> Self {
        Snapshot::default()
    }

    pub fn get(&self, path: &str) -> Option<&SnapValue> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnapValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, SnapValue)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, SnapValue)>>(iter: I) -> Self {
        Snapshot {
            entries: iter.into_iter().collect(),
        }
    }
}


// ---------------------------------------------------------------------------
// Flatten
// ---------------------------------------------------------------------------

/// Lazy pre-order walk over a value tree.
pub struct Flatten<'a> {
    stack: Vec<(String, &'a Value)>,
}

impl<'a> Flatten<'a> {
    /// Walk `value`, naming it `prefix`. An empty prefix marks the root,
    /// which is descended into but not emitted.
    pub fn with_prefix(value: &'a Value, prefix: &str) -> Self {
        Flatten {
            stack: vec![(prefix.to_string(), value)],
        }
    }

    fn push_children(&mut self, path: &str, node: &'a Value) {
        match node {
            Value::Map(map) => {
                for (key, child) in map.iter().rev() {
                    self.stack.push((join(path, key), child));
                }
            }
            Value::List(items) => {
                for (index, child) in items.iter().enumerate().rev() {
                    self.stack.push((join(path, &index.to_string()), child));
                }
            }
            _ => {}
        }
    }
}

impl<'a> Iterator for Flatten<'a> {
    type Item = (String, SnapValue);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((path, node)) = self.stack.pop() {
            self.push_children(&path, node);
            if !path.is_empty() {
                return Some((path, SnapValue::of(node)));
            }
        }
        None
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Flatten a whole tree, excluding the root itself.
pub fn flatten(tree: &Value) -> Flatten<'_> {
    Flatten::with_prefix(tree, "")
}

/// Take a snapshot of the tree.
pub fn snap(tree: &Value) -> Snapshot {
    flatten(tree).collect()
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
