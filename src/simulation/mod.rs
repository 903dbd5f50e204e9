//! # Simulation Boundary
//!
//! The external solver is an opaque collaborator behind the [`Solver`]
//! trait. This module defines the request/result contract and the pure
//! merge that turns a result into (new document text, path annotation).
//!
//! ## Implementations
//!
//! | Solver | Feature | Description |
//! |--------|---------|-------------|
//! | `ProcessSolver` | `solver` (default) | Runs the configured script in a subprocess |

#[cfg(feature = "solver")]
pub mod process;

use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::model::{Hypergraph, SimulationPath, Value};
use crate::mutation;
use crate::schema::RawDocument;
use crate::{Error, Result};

#[cfg(feature = "solver")]
pub use process::ProcessSolver;

/// Frame created for write-back when the document has none.
pub const DEFAULT_FRAME: &str = "f0";

// ============================================================================
// Solver configuration
// ============================================================================

/// How to launch the external solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Interpreter used to run `script`.
    pub python: PathBuf,
    /// Solver entry script.
    pub script: PathBuf,
    /// Ask the solver to print its search.
    pub to_print: bool,
    pub min_index: usize,
    pub logging_level: u32,
    /// Labels the solver should trace.
    pub debug_nodes: Vec<String>,
    pub debug_edges: Vec<String>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from("python3"),
            script: PathBuf::from("simulate_chg.py"),
            to_print: false,
            min_index: 0,
            logging_level: 30,
            debug_nodes: Vec::new(),
            debug_edges: Vec::new(),
        }
    }
}

// ============================================================================
// Request / result
// ============================================================================

/// One simulate call. The solver reads the document from `file_path`, so
/// the host must have saved it first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationRequest {
    pub file_path: PathBuf,
    pub node: String,
    /// Empty when no frame is active.
    pub frame: String,
}

/// Solver output on success. Only `value` is required.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct SimulationSuccess {
    pub value: JsonValue,
    pub cost: Option<f64>,
    #[serde(default)]
    pub path_nodes: Vec<String>,
    #[serde(default)]
    pub path_edges: Vec<String>,
    pub target_node: Option<String>,
    pub num_nodes: Option<usize>,
    pub num_edges: Option<usize>,
}

/// What the solver printed: `{error}` or the success object. Any other
/// object is unreadable.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SimulationResult {
    Failure {
        #[serde(deserialize_with = "error_message")]
        error: String,
    },
    Success(SimulationSuccess),
}

/// Any non-null `error`; non-string payloads keep their JSON text.
fn error_message<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match JsonValue::deserialize(deserializer)? {
        JsonValue::Null => Err(de::Error::custom("null error")),
        JsonValue::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// The external solver.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Run to completion. `Err` is a failure to run at all; a solver that
    /// ran and reported a problem returns `Ok(SimulationResult::Failure)`.
    async fn simulate(&self, request: &SimulationRequest) -> Result<SimulationResult>;
}

// ============================================================================
// Merge & write-back
// ============================================================================

/// Both effects of a successful simulation, ready to commit together.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub text: String,
    pub path: SimulationPath,
    pub value: Value,
}

impl SimulationSuccess {
    /// Solver target, or the requested node when the solver left it blank.
    pub fn target<'a>(&'a self, requested: &'a str) -> &'a str {
        match self.target_node.as_deref() {
            Some(t) if !t.is_empty() => t,
            _ => requested,
        }
    }

    pub fn to_path(&self, requested: &str) -> SimulationPath {
        SimulationPath {
            target_node: self.target(requested).to_string(),
            nodes: self.path_nodes.clone(),
            edges: self.path_edges.clone(),
            cost: self.cost,
            num_nodes: self.num_nodes.unwrap_or(self.path_nodes.len()),
            num_edges: self.num_edges.unwrap_or(self.path_edges.len()),
        }
    }

    /// Scalar result. A list result contributes its first element.
    pub fn scalar(&self) -> Value {
        let raw = match &self.value {
            JsonValue::Array(items) => items.first().unwrap_or(&JsonValue::Null),
            other => other,
        };
        Value::from_json(raw).unwrap_or(Value::Null)
    }
}

/// Combine a solver result with the current document.
///
/// On `Failure` nothing is produced. On success, the value is written into
/// the target node (constant) or the active frame (otherwise) and the path
/// annotation is built; the caller commits both or neither.
pub fn merge(
    text: &str,
    graph: &Hypergraph,
    frame: Option<&str>,
    requested: &str,
    result: SimulationResult,
) -> Result<Merged> {
    let success = match result {
        SimulationResult::Failure { error } => {
            return Err(Error::Simulation { message: error, remediation: None });
        }
        SimulationResult::Success(s) => s,
    };
    let target = success.target(requested);
    let value = success.scalar();
    let text = write_back(text, graph, frame, target, &value)?;
    Ok(Merged { text, path: success.to_path(requested), value })
}

/// Store a computed value in the slot the effective-value rule reads from.
pub fn write_back(
    text: &str,
    graph: &Hypergraph,
    frame: Option<&str>,
    target: &str,
    value: &Value,
) -> Result<String> {
    let node = graph
        .node(target)
        .ok_or_else(|| Error::NotFound(format!("node '{target}'")))?;

    mutation::mutate(text, |doc: &mut RawDocument| {
        if node.is_constant {
            return mutation::set_node_value(doc, target, Some(value));
        }
        let frame = frame
            .map(str::to_string)
            .or_else(|| graph.frame_names().first().cloned())
            .unwrap_or_else(|| DEFAULT_FRAME.to_string());
        if !doc.frames().is_some_and(|f| f.contains_key(&frame)) {
            mutation::add_frame(doc, &frame)?;
        }
        mutation::set_frame_value(doc, &frame, target, value)
    })
}
