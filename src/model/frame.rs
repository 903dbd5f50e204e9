//! Frames: named snapshots of non-constant node values.

use hashbrown::HashMap;
use smallvec::SmallVec;

use super::Value;

/// A frame entry. Canonically a list; the first element is the value.
pub type FrameValues = SmallVec<[Value; 1]>;

/// One snapshot: node label → values. Key order is not meaningful;
/// the owning [`Hypergraph`](super::Hypergraph) keeps frame order.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    entries: HashMap<String, FrameValues>,
    /// Entry labels in document order, for stable serialization.
    order: Vec<String>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, values: FrameValues) {
        let label = label.into();
        if self.entries.insert(label.clone(), values).is_none() {
            self.order.push(label);
        }
    }

    pub fn get(&self, label: &str) -> Option<&FrameValues> {
        self.entries.get(label)
    }

    /// First value of the entry, if the entry has one.
    pub fn value_of(&self, label: &str) -> Option<&Value> {
        self.entries.get(label).and_then(|v| v.first())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrameValues)> {
        self.order
            .iter()
            .filter_map(|k| self.entries.get(k).map(|v| (k.as_str(), v)))
    }
}

/// Equality ignores key order.
impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}
