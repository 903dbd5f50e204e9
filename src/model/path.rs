//! Simulation path: the nodes and edges a solver used to derive a value.

use serde::{Deserialize, Serialize};

/// Annotation produced by a successful simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationPath {
    pub target_node: String,
    /// Node labels along the path.
    pub nodes: Vec<String>,
    /// Edge labels along the path.
    pub edges: Vec<String>,
    pub cost: Option<f64>,
    pub num_nodes: usize,
    pub num_edges: usize,
}

impl SimulationPath {
    pub fn new(target_node: impl Into<String>) -> Self {
        Self {
            target_node: target_node.into(),
            nodes: Vec::new(),
            edges: Vec::new(),
            cost: None,
            num_nodes: 0,
            num_edges: 0,
        }
    }

    pub fn contains_node(&self, label: &str) -> bool {
        self.nodes.iter().any(|n| n == label)
    }

    pub fn contains_edge(&self, label: &str) -> bool {
        self.edges.iter().any(|e| e == label)
    }

    /// Copy with a node label replaced, or `None` if the path never
    /// mentions `old`.
    pub fn renamed_node(&self, old: &str, new: &str) -> Option<SimulationPath> {
        if self.target_node != old && !self.contains_node(old) {
            return None;
        }
        let mut path = self.clone();
        if path.target_node == old {
            path.target_node = new.to_string();
        }
        rename_in(&mut path.nodes, old, new);
        Some(path)
    }

    pub fn renamed_edge(&self, old: &str, new: &str) -> Option<SimulationPath> {
        if !self.contains_edge(old) {
            return None;
        }
        let mut path = self.clone();
        rename_in(&mut path.edges, old, new);
        Some(path)
    }
}

fn rename_in(labels: &mut [String], old: &str, new: &str) {
    for label in labels.iter_mut().filter(|l| l.as_str() == old) {
        *label = new.to_string();
    }
}
