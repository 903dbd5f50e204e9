//! Raw JSON accessor pair.
//!
//! The only code that knows whether a document is flat or nested. Writes go
//! into whichever layout the document already has, so a nested document
//! stays nested across edits.

use serde_json::{Map, Value as JsonValue, json};

use crate::model::DocumentShape;
use crate::{Error, Result};

const GRAPH_KEY: &str = "hypergraph";
const SOURCE_KEYS: [&str; 2] = ["source_nodes", "sources"];

/// A document held as JSON, key order preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    root: Map<String, JsonValue>,
    trailing_newline: bool,
}

impl RawDocument {
    /// New documents are flat.
    pub fn empty() -> Self {
        let root = match json!({ "nodes": [], "edges": [], "frames": {} }) {
            JsonValue::Object(m) => m,
            _ => Map::new(),
        };
        Self { root, trailing_newline: true }
    }

    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::empty());
        }
        match serde_json::from_str::<JsonValue>(text).map_err(|e| Error::Parse(e.to_string()))? {
            JsonValue::Object(root) => Ok(Self { root, trailing_newline: text.ends_with('\n') }),
            _ => Err(Error::Parse("document root must be a JSON object".into())),
        }
    }

    pub fn to_text(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(&self.root)?;
        if self.trailing_newline {
            text.push('\n');
        }
        Ok(text)
    }

    /// Nested only when `hypergraph` holds an object; a null wrapper reads
    /// as flat, the same as the parser sees it.
    pub fn shape(&self) -> DocumentShape {
        if self.root.get(GRAPH_KEY).is_some_and(JsonValue::is_object) {
            DocumentShape::Nested
        } else {
            DocumentShape::Flat
        }
    }

    // ========================================================================
    // Read side
    // ========================================================================

    fn graph(&self) -> Option<&Map<String, JsonValue>> {
        match self.shape() {
            DocumentShape::Flat => Some(&self.root),
            DocumentShape::Nested => self.root.get(GRAPH_KEY).and_then(JsonValue::as_object),
        }
    }

    fn array(&self, key: &str) -> &[JsonValue] {
        self.graph()
            .and_then(|g| g.get(key))
            .and_then(JsonValue::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn nodes(&self) -> &[JsonValue] {
        self.array("nodes")
    }

    pub fn edges(&self) -> &[JsonValue] {
        self.array("edges")
    }

    pub fn frames(&self) -> Option<&Map<String, JsonValue>> {
        self.root.get("frames").and_then(JsonValue::as_object)
    }

    pub fn has_node(&self, label: &str) -> bool {
        self.nodes().iter().any(|n| label_of(n) == Some(label))
    }

    pub fn has_edge(&self, label: &str) -> bool {
        self.edges().iter().any(|e| label_of(e) == Some(label))
    }

    // ========================================================================
    // Write side
    // ========================================================================

    fn graph_mut(&mut self) -> Result<&mut Map<String, JsonValue>> {
        match self.shape() {
            DocumentShape::Flat => Ok(&mut self.root),
            DocumentShape::Nested => match self.root.get_mut(GRAPH_KEY) {
                Some(JsonValue::Object(g)) => Ok(g),
                _ => Err(Error::Parse(format!("'{GRAPH_KEY}' must be an object"))),
            },
        }
    }

    fn array_mut(&mut self, key: &str) -> Result<&mut Vec<JsonValue>> {
        let graph = self.graph_mut()?;
        match graph.entry(key).or_insert_with(|| JsonValue::Array(Vec::new())) {
            JsonValue::Array(items) => Ok(items),
            _ => Err(Error::Parse(format!("'{key}' must be an array"))),
        }
    }

    pub fn nodes_mut(&mut self) -> Result<&mut Vec<JsonValue>> {
        self.array_mut("nodes")
    }

    pub fn edges_mut(&mut self) -> Result<&mut Vec<JsonValue>> {
        self.array_mut("edges")
    }

    pub fn frames_mut(&mut self) -> Result<&mut Map<String, JsonValue>> {
        match self.root.entry("frames").or_insert_with(|| JsonValue::Object(Map::new())) {
            JsonValue::Object(frames) => Ok(frames),
            _ => Err(Error::Parse("'frames' must be an object".into())),
        }
    }

    /// First node object with this label.
    pub fn node_mut(&mut self, label: &str) -> Result<&mut Map<String, JsonValue>> {
        self.nodes_mut()?
            .iter_mut()
            .filter_map(JsonValue::as_object_mut)
            .find(|n| n.get("label").and_then(JsonValue::as_str) == Some(label))
            .ok_or_else(|| Error::NotFound(format!("node '{label}'")))
    }

    /// First edge object with this label.
    pub fn edge_mut(&mut self, label: &str) -> Result<&mut Map<String, JsonValue>> {
        self.edges_mut()?
            .iter_mut()
            .filter_map(JsonValue::as_object_mut)
            .find(|e| e.get("label").and_then(JsonValue::as_str) == Some(label))
            .ok_or_else(|| Error::NotFound(format!("edge '{label}'")))
    }

    pub fn frame_mut(&mut self, name: &str) -> Result<&mut Map<String, JsonValue>> {
        match self.frames_mut()?.get_mut(name) {
            Some(JsonValue::Object(frame)) => Ok(frame),
            Some(_) => Err(Error::Parse(format!("frame '{name}' must be an object"))),
            None => Err(Error::NotFound(format!("frame '{name}'"))),
        }
    }
}

pub(crate) fn label_of(item: &JsonValue) -> Option<&str> {
    item.get("label").and_then(JsonValue::as_str)
}

/// The key an edge keeps its sources under, preferring the current name.
pub(crate) fn source_key(edge: &Map<String, JsonValue>) -> &'static str {
    SOURCE_KEYS
        .into_iter()
        .find(|k| edge.contains_key(*k))
        .unwrap_or(SOURCE_KEYS[0])
}
