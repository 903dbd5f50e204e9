//! Hyperedge: a rule with many sources and one target.

use serde::{Serialize, Serializer};
use serde::ser::SerializeMap;
use smallvec::SmallVec;

/// One input of a hyperedge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    /// Positional index (`"0"`, `"1"`, ...) or an explicit key.
    pub handle: String,
    /// Referenced node label. Not required to exist.
    pub label: String,
}

impl SourceRef {
    pub fn new(handle: impl Into<String>, label: impl Into<String>) -> Self {
        Self { handle: handle.into(), label: label.into() }
    }
}

/// Ordered edge inputs. Most rules have a handful.
pub type Sources = SmallVec<[SourceRef; 4]>;

/// A hyperedge. Rendered as its own vertex in the bipartite view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(rename = "source_nodes", serialize_with = "sources_as_map")]
    pub sources: Sources,
    /// Empty means unset.
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
}

impl Edge {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            weight: None,
            sources: Sources::new(),
            target: String::new(),
            rel: None,
        }
    }

    /// Append a source with the next positional handle.
    pub fn with_source(mut self, label: impl Into<String>) -> Self {
        let handle = self.sources.len().to_string();
        self.sources.push(SourceRef::new(handle, label));
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn target(&self) -> Option<&str> {
        if self.target.is_empty() { None } else { Some(&self.target) }
    }

    pub fn has_source(&self, label: &str) -> bool {
        self.sources.iter().any(|s| s.label == label)
    }

    /// Source labels in order, repeated labels included.
    pub fn source_labels(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.label.as_str())
    }

    /// Handles that occur more than once, each reported once.
    pub fn duplicate_handles(&self) -> Vec<&str> {
        let mut seen = hashbrown::HashSet::new();
        let mut dups = Vec::new();
        for s in &self.sources {
            if !seen.insert(s.handle.as_str()) && !dups.contains(&s.handle.as_str()) {
                dups.push(s.handle.as_str());
            }
        }
        dups
    }
}

/// Keyed form keeps explicit handles across a canonical round trip.
/// Duplicate handles cannot survive a JSON object and collapse here.
fn sources_as_map<S: Serializer>(sources: &Sources, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(sources.len()))?;
    for s in sources {
        map.serialize_entry(&s.handle, &s.label)?;
    }
    map.end()
}
