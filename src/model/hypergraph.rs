//! The canonical hypergraph snapshot and its read-only queries.

use hashbrown::{HashMap, HashSet};
use serde_json::{Map, Value as JsonValue, json};

use super::{Edge, Frame, Node, SimulationPath, Value};

/// Which JSON layout the document uses on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentShape {
    /// `{nodes, edges, frames}`
    #[default]
    Flat,
    /// `{hypergraph: {nodes, edges}, frames}`
    Nested,
}

/// Edges touching a node, split by direction.
#[derive(Debug, Clone, Default)]
pub struct NodeNeighbors<'g> {
    /// Edges whose target is the node.
    pub leading: Vec<&'g Edge>,
    /// Edges that list the node among their sources.
    pub trailing: Vec<&'g Edge>,
}

/// Both ends of a hyperedge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeEndpoints<'g> {
    /// `(handle, label)` in source order.
    pub sources: Vec<(&'g str, &'g str)>,
    pub target: Option<&'g str>,
}

/// Where a dangling reference sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefSlot {
    Source { handle: String },
    Target,
}

/// Non-fatal findings, flagged for display and never repaired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    DanglingReference { edge: String, slot: RefSlot, label: String },
    DuplicateHandle { edge: String, handle: String },
    DuplicateNodeLabel { label: String },
    DuplicateEdgeLabel { label: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::DanglingReference { edge, slot: RefSlot::Target, label } => {
                write!(f, "edge '{edge}' targets missing node '{label}'")
            }
            Diagnostic::DanglingReference { edge, slot: RefSlot::Source { handle }, label } => {
                write!(f, "edge '{edge}' source '{handle}' references missing node '{label}'")
            }
            Diagnostic::DuplicateHandle { edge, handle } => {
                write!(f, "edge '{edge}' has duplicate source handle '{handle}'")
            }
            Diagnostic::DuplicateNodeLabel { label } => write!(f, "duplicate node label '{label}'"),
            Diagnostic::DuplicateEdgeLabel { label } => write!(f, "duplicate edge label '{label}'"),
        }
    }
}

/// What a "simulate" action on a node should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulateAffordance {
    /// No resolved value yet: simulation is meaningful.
    Run,
    /// The node already resolves to a value.
    AlreadySolved,
    /// A path annotation is showing; the action clears it.
    ClearPath,
}

/// Immutable snapshot of a parsed document.
///
/// Rebuilt wholesale on every reparse; never patched in place.
#[derive(Debug, Clone, Default)]
pub struct Hypergraph {
    pub shape: DocumentShape,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    frames: HashMap<String, Frame>,
    frame_names: Vec<String>,
    /// label → index of first node with that label
    node_index: HashMap<String, usize>,
    edge_index: HashMap<String, usize>,
}

impl Hypergraph {
    pub fn new(shape: DocumentShape) -> Self {
        Self { shape, ..Self::default() }
    }

    pub fn push_node(&mut self, node: Node) {
        self.node_index.entry(node.label.clone()).or_insert(self.nodes.len());
        self.nodes.push(node);
    }

    pub fn push_edge(&mut self, edge: Edge) {
        self.edge_index.entry(edge.label.clone()).or_insert(self.edges.len());
        self.edges.push(edge);
    }

    /// Add a frame. A repeated name replaces the earlier frame in place.
    pub fn push_frame(&mut self, name: impl Into<String>, frame: Frame) {
        let name = name.into();
        if self.frames.insert(name.clone(), frame).is_none() {
            self.frame_names.push(name);
        }
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn node(&self, label: &str) -> Option<&Node> {
        self.node_index.get(label).map(|&i| &self.nodes[i])
    }

    pub fn edge(&self, label: &str) -> Option<&Edge> {
        self.edge_index.get(label).map(|&i| &self.edges[i])
    }

    pub fn has_node(&self, label: &str) -> bool {
        self.node_index.contains_key(label)
    }

    pub fn has_edge(&self, label: &str) -> bool {
        self.edge_index.contains_key(label)
    }

    pub fn frame(&self, name: &str) -> Option<&Frame> {
        self.frames.get(name)
    }

    /// Frame names in insertion order.
    pub fn frame_names(&self) -> &[String] {
        &self.frame_names
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty() && self.frame_names.is_empty()
    }

    // ========================================================================
    // Neighborhood
    // ========================================================================

    pub fn neighbors_of_node(&self, label: &str) -> NodeNeighbors<'_> {
        let mut out = NodeNeighbors::default();
        for edge in &self.edges {
            if edge.target == label {
                out.leading.push(edge);
            }
            if edge.has_source(label) {
                out.trailing.push(edge);
            }
        }
        out
    }

    pub fn endpoints_of_edge(&self, label: &str) -> Option<EdgeEndpoints<'_>> {
        let edge = self.edge(label)?;
        Some(EdgeEndpoints {
            sources: edge
                .sources
                .iter()
                .map(|s| (s.handle.as_str(), s.label.as_str()))
                .collect(),
            target: edge.target(),
        })
    }

    // ========================================================================
    // Missing references
    // ========================================================================

    /// Referenced by some edge but absent from the node list.
    pub fn is_dangling(&self, label: &str) -> bool {
        if self.has_node(label) {
            return false;
        }
        self.edges
            .iter()
            .any(|e| e.target == label || e.has_source(label))
    }

    /// Every dangling label once, in first-reference order.
    pub fn dangling_labels(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for edge in &self.edges {
            let refs = edge.source_labels().chain(edge.target());
            for label in refs {
                if !self.has_node(label) && seen.insert(label) {
                    out.push(label);
                }
            }
        }
        out
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.label.as_str()) {
                out.push(Diagnostic::DuplicateNodeLabel { label: node.label.clone() });
            }
        }
        let mut seen = HashSet::new();
        for edge in &self.edges {
            if !seen.insert(edge.label.as_str()) {
                out.push(Diagnostic::DuplicateEdgeLabel { label: edge.label.clone() });
            }
        }

        for edge in &self.edges {
            for handle in edge.duplicate_handles() {
                out.push(Diagnostic::DuplicateHandle {
                    edge: edge.label.clone(),
                    handle: handle.to_string(),
                });
            }
            for s in &edge.sources {
                if !self.has_node(&s.label) {
                    out.push(Diagnostic::DanglingReference {
                        edge: edge.label.clone(),
                        slot: RefSlot::Source { handle: s.handle.clone() },
                        label: s.label.clone(),
                    });
                }
            }
            if let Some(target) = edge.target() {
                if !self.has_node(target) {
                    out.push(Diagnostic::DanglingReference {
                        edge: edge.label.clone(),
                        slot: RefSlot::Target,
                        label: target.to_string(),
                    });
                }
            }
        }
        out
    }

    // ========================================================================
    // Values
    // ========================================================================

    /// Constant nodes use their own value. Others read the active frame and
    /// fall back to the node's value when the frame has no entry.
    pub fn effective_value<'a>(&'a self, node: &'a Node, frame: Option<&str>) -> Option<&'a Value> {
        if node.is_constant {
            return node.value.as_ref();
        }
        match frame.and_then(|f| self.frames.get(f)).and_then(|f| f.get(&node.label)) {
            Some(values) => values.first(),
            None => node.value.as_ref(),
        }
    }

    pub fn has_any_value(&self, node: &Node, frame: Option<&str>) -> bool {
        self.effective_value(node, frame).is_some_and(|v| !v.is_empty())
    }

    pub fn simulate_affordance(
        &self,
        node: &Node,
        frame: Option<&str>,
        path: Option<&SimulationPath>,
    ) -> SimulateAffordance {
        if path.is_some() {
            SimulateAffordance::ClearPath
        } else if self.has_any_value(node, frame) {
            SimulateAffordance::AlreadySolved
        } else {
            SimulateAffordance::Run
        }
    }

    // ========================================================================
    // Canonical form
    // ========================================================================

    /// Flat canonical document. Parsing it back yields an equal model.
    pub fn to_canonical_json(&self) -> JsonValue {
        let mut frames = Map::new();
        for name in &self.frame_names {
            let mut entries = Map::new();
            if let Some(frame) = self.frames.get(name) {
                for (label, values) in frame.iter() {
                    let list = values.iter().map(Value::to_json).collect();
                    entries.insert(label.to_string(), JsonValue::Array(list));
                }
            }
            frames.insert(name.clone(), JsonValue::Object(entries));
        }
        json!({
            "nodes": self.nodes,
            "edges": self.edges,
            "frames": frames,
        })
    }

    /// Same content, ignoring the flat/nested wrapper.
    pub fn same_content(&self, other: &Hypergraph) -> bool {
        self.nodes == other.nodes
            && self.edges == other.edges
            && self.frame_names == other.frame_names
            && self.frames == other.frames
    }
}
