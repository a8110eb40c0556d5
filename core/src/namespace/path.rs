//! Dotted key paths over the state tree.
//!
//! Paths like `vars.trial.stimulus` address nodes in nested maps and lists.
//! The first segment is an identifier (a letter followed by word
//! characters); later segments are any run of word characters so list
//! elements can be addressed as `vars.items.0`. A trailing `.*` turns a
//! path into a subtree query. Query patterns are never written to.

use std::fmt;

use crate::error::KeyPathError;
use crate::types::Value;


/// Suffix marking a subtree query.
pub const SUBTREE_SUFFIX: &str = ".*";


/// A parsed, validated key path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
    subtree: bool,
}

impl KeyPath {
    /// Parse a dotted string like `vars.trial.id` or `vars.trial.*`.
    pub fn parse(input: &str) -> Result<Self, KeyPathError> {
        if !validate(input) {
            return Err(KeyPathError::Invalid(input.to_string()));
        }
        let (base, subtree) = split_subtree(input);
        Ok(KeyPath {
            segments: base.split('.').map(str::to_string).collect(),
            subtree,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True if the path ends in `.*`.
    pub fn is_subtree(&self) -> bool {
        self.subtree
    }

    /// The path without any subtree suffix.
    pub fn base(&self) -> String {
        self.segments.join(".")
    }

    /// Format back to a dotted string.
    pub fn to_dotted(&self) -> String {
        let mut out = self.base();
        if self.subtree {
            out.push_str(SUBTREE_SUFFIX);
        }
        out
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}


// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A letter followed by any number of word characters.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => chars.all(is_word_char),
        _ => false,
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_word_char)
}

/// Split off a trailing `.*`, reporting whether it was present.
pub fn split_subtree(path: &str) -> (&str, bool) {
    match path.strip_suffix(SUBTREE_SUFFIX) {
        Some(base) => (base, true),
        None => (path, false),
    }
}

/// Check a path (optionally ending in `.*`) against the key path grammar.
pub fn validate(path: &str) -> bool {
    let (base, _) = split_subtree(path);
    let mut parts = base.split('.');
    match parts.next() {
        Some(first) if is_identifier(first) => parts.all(is_word),
        _ => false,
    }
}

/// Number of dot-separated segments.
pub fn segment_count(path: &str) -> usize {
    path.split('.').count()
}

/// Strict ancestors of a path, shallowest first: `a.b.c` gives `a`, `a.b`.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.').map(move |(i, _)| &path[..i])
}

/// True if `path` lies strictly below `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path.len() > ancestor.len()
        && path.starts_with(ancestor)
        && path.as_bytes()[ancestor.len()] == b'.'
}


// ---------------------------------------------------------------------------
// Tree access
// ---------------------------------------------------------------------------

/// Walk `path` through the tree. Missing segments yield `None`; a `.*`
/// suffix is ignored so a subtree query returns its root.
pub fn extract<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let (base, _) = split_subtree(path);
    base.split('.').try_fold(tree, |node, key| node.child(key))
}

/// Mutable variant of [`extract`].
pub fn extract_mut<'a>(tree: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let (base, _) = split_subtree(path);
    base.split('.').try_fold(tree, |node, key| node.child_mut(key))
}

/// Assign `value` at `path`. Every intermediate segment must already exist
/// and be a container; nothing is created along the way.
pub fn update(tree: &mut Value, path: &str, value: Value) -> Result<(), KeyPathError> {
    let parsed = writable(path)?;
    let (last, parents) = split_last(&parsed, path)?;

    let mut node = tree;
    for (i, key) in parents.iter().enumerate() {
        node = node
            .child_mut(key)
            .ok_or_else(|| unreachable(path, &parents[..=i]))?;
    }
    assign(node, last, value).map_err(|_| unreachable(path, parents))
}

/// Like [`update`], but creates missing (or null) intermediate maps.
pub fn upsert(tree: &mut Value, path: &str, value: Value) -> Result<(), KeyPathError> {
    let parsed = writable(path)?;
    let (last, parents) = split_last(&parsed, path)?;

    let mut node = tree;
    for (i, key) in parents.iter().enumerate() {
        node = match node {
            Value::Map(map) => {
                let slot = map.entry(key.clone()).or_insert_with(Value::map);
                if slot.is_void() {
                    *slot = Value::map();
                }
                slot
            }
            other => other
                .child_mut(key)
                .ok_or_else(|| unreachable(path, &parents[..=i]))?,
        };
    }
    assign(node, last, value).map_err(|_| unreachable(path, parents))
}

/// Delete the node at `path`, returning it. List elements are removed and
/// later elements shift down.
pub fn remove(tree: &mut Value, path: &str) -> Option<Value> {
    let parsed = KeyPath::parse(path).ok().filter(|p| !p.is_subtree())?;
    let (last, parents) = parsed.segments.split_last()?;

    let mut node = tree;
    for key in parents {
        node = node.child_mut(key)?;
    }
    match node {
        Value::Map(map) => map.remove(last),
        Value::List(items) => {
            let index = last.parse::<usize>().ok().filter(|i| *i < items.len())?;
            Some(items.remove(index))
        }
        _ => None,
    }
}


// ---------------------------------------------------------------------------
// Internal
// ---------------------------------------------------------------------------

fn writable(path: &str) -> Result<KeyPath, KeyPathError> {
    let parsed = KeyPath::parse(path)?;
    if parsed.is_subtree() {
        return Err(KeyPathError::Invalid(path.to_string()));
    }
    Ok(parsed)
}

fn split_last<'p>(
    parsed: &'p KeyPath,
    path: &str,
) -> Result<(&'p String, &'p [String]), KeyPathError> {
    parsed
        .segments
        .split_last()
        .ok_or_else(|| KeyPathError::Invalid(path.to_string()))
}

fn unreachable(path: &str, at: &[String]) -> KeyPathError {
    KeyPathError::Unreachable {
        path: path.to_string(),
        at: if at.is_empty() { "<root>".to_string() } else { at.join(".") },
    }
}

/// Write `value` under `key`. Lists accept an existing index or `len`.
fn assign(container: &mut Value, key: &str, value: Value) -> Result<(), Value> {
    match container {
        Value::Map(map) => {
            map.insert(key.to_string(), value);
            Ok(())
        }
        Value::List(items) => match key.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items[i] = value;
                Ok(())
            }
            Ok(i) if i == items.len() => {
                items.push(value);
                Ok(())
            }
            _ => Err(value),
        },
        _ => Err(value),
    }
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
