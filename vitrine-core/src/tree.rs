//! Tree reconstruction from flat paths, and the inverse flattening.
//!
//! [`TreeBuilder`] replays `(path, leaf)` pairs into a nested JSON tree,
//! creating intermediate objects and arrays on demand.
//!
//! # Shape conflicts
//!
//! Two keys can disagree about what a node is (`hero` as a leaf and
//! `hero.title` below it, or `list[0]` next to `list.extra`). The builder
//! ranks node shapes and lets the stronger shape win no matter which entry
//! arrives first:
//!
//! | rank | shape |
//! |------|-------|
//! | 0 | empty object (array padding, vacant) |
//! | 1 | leaf |
//! | 2 | array |
//! | 3 | non-empty object |
//!
//! An entry that needs a stronger shape than the node holds replaces it; an
//! entry that needs a weaker one is rejected with [`ApplyOutcome::Conflict`].
//! Two leaves at the same path are the only order-sensitive case: the last
//! apply wins, so callers that need determinism sort their input.
//!
//! # Array holes
//!
//! Writing index 5 of an empty array pads indices 0..5 with empty objects.
//! Indices above the builder's limit are rejected before any padding.

use serde_json::{Map, Value};

use crate::path::{parse_key, Segment};

/// Index limit of [`TreeBuilder::new`] and the default content config.
pub const DEFAULT_MAX_ARRAY_INDEX: usize = 1024;

/// Largest index limit a configuration may set.
pub const ARRAY_INDEX_CEILING: usize = 65_535;

/// First index on `path` above `max`, if any.
pub fn index_over_limit(path: &[Segment], max: usize) -> Option<usize> {
    path.iter()
        .filter_map(Segment::index)
        .find(|index| *index > max)
}

/// What happened to one applied entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// Empty path; nothing to do.
    Skipped,
    /// A node on the path already has a stronger shape.
    Conflict,
    IndexTooLarge { index: usize },
}

impl ApplyOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Leaf,
    Array,
    Object,
}

impl Shape {
    fn rank(self) -> u8 {
        match self {
            Shape::Leaf => 1,
            Shape::Array => 2,
            Shape::Object => 3,
        }
    }

    fn empty(self) -> Value {
        match self {
            Shape::Array => Value::Array(Vec::new()),
            Shape::Leaf | Shape::Object => vacant(),
        }
    }

    fn holds(self, value: &Value) -> bool {
        match self {
            Shape::Leaf => false,
            Shape::Array => value.is_array(),
            Shape::Object => value.is_object(),
        }
    }
}

fn vacant() -> Value {
    Value::Object(Map::new())
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Object(map) if map.is_empty() => 0,
        Value::Object(_) => 3,
        Value::Array(_) => 2,
        _ => 1,
    }
}

/// Make `slot` hold `want`, replacing a weaker shape. False on conflict.
fn settle(slot: &mut Value, want: Shape) -> bool {
    if want.holds(slot) {
        return true;
    }
    if rank(slot) < want.rank() {
        *slot = want.empty();
        return true;
    }
    false
}

fn claim<'a>(map: &'a mut Map<String, Value>, name: &str, want: Shape) -> Option<&'a mut Value> {
    let slot = map.entry(name.to_string()).or_insert_with(|| want.empty());
    if settle(slot, want) {
        Some(slot)
    } else {
        None
    }
}

fn element(array: &mut Value, index: usize) -> Option<&mut Value> {
    let items = array.as_array_mut()?;
    if items.len() <= index {
        items.resize(index.checked_add(1)?, vacant());
    }
    items.get_mut(index)
}

/// Incremental builder for one content tree. The root is always an object.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    root: Map<String, Value>,
    max_array_index: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            root: Map::new(),
            max_array_index: DEFAULT_MAX_ARRAY_INDEX,
        }
    }

    pub fn with_max_array_index(mut self, max: usize) -> Self {
        self.max_array_index = max;
        self
    }

    /// Set the node at `path` to `leaf`, creating containers on the way.
    pub fn apply(&mut self, path: &[Segment], leaf: Value) -> ApplyOutcome {
        let Some((last, parents)) = path.split_last() else {
            return ApplyOutcome::Skipped;
        };
        if let Some(index) = index_over_limit(path, self.max_array_index) {
            return ApplyOutcome::IndexTooLarge { index };
        }

        let mut current = &mut self.root;
        for segment in parents {
            let next = match segment {
                Segment::Field { name } => claim(current, name, Shape::Object),
                Segment::Index { name, index } => claim(current, name, Shape::Array)
                    .and_then(|array| element(array, *index))
                    .and_then(|slot| settle(slot, Shape::Object).then_some(slot)),
            };
            match next.and_then(Value::as_object_mut) {
                Some(map) => current = map,
                None => return ApplyOutcome::Conflict,
            }
        }

        let slot = match last {
            Segment::Field { name } => current.entry(name.clone()).or_insert_with(vacant),
            Segment::Index { name, index } => {
                match claim(current, name, Shape::Array).and_then(|array| element(array, *index)) {
                    Some(slot) => slot,
                    None => return ApplyOutcome::Conflict,
                }
            }
        };
        if rank(slot) > Shape::Leaf.rank() {
            return ApplyOutcome::Conflict;
        }
        *slot = leaf;
        ApplyOutcome::Applied
    }

    /// Parse `key` and apply it.
    pub fn apply_key(&mut self, key: &str, leaf: Value) -> ApplyOutcome {
        self.apply(&parse_key(key), leaf)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }
}

/// Flatten a tree into `(key, text)` pairs, one per leaf.
///
/// Empty objects (array holes) produce nothing, `null` leaves are dropped and
/// other scalars are rendered as JSON text. Arrays nested directly inside
/// arrays have no flat key form and are skipped.
pub fn flatten(tree: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    if let Value::Object(map) = tree {
        flatten_object(map, "", &mut out);
    }
    out
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", prefix, segment)
    }
}

fn flatten_object(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, String)>) {
    for (name, value) in map {
        match value {
            Value::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    let key = join(prefix, &format!("{}[{}]", name, index));
                    match item {
                        Value::Object(inner) => flatten_object(inner, &key, out),
                        Value::Array(_) | Value::Null => {}
                        leaf => out.push((key, leaf_text(leaf))),
                    }
                }
            }
            Value::Object(inner) => flatten_object(inner, &join(prefix, name), out),
            Value::Null => {}
            leaf => out.push((join(prefix, name), leaf_text(leaf))),
        }
    }
}

fn leaf_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
