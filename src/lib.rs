//! # chg: Constraint Hypergraph Documents
//!
//! Reads, edits, and lays out constraint hypergraphs: value nodes joined by
//! hyperedges (rules with many sources and one target), persisted as a
//! tolerant JSON document.
//!
//! ## Design Principles
//!
//! 1. **Parse owns nothing**: text → canonical `Hypergraph` is a pure function
//! 2. **Rebuild, never patch**: every edit produces new text that is reparsed in full
//! 3. **Labels are identities**: renames and deletes propagate through one routine each
//! 4. **Solver is a trait**: the external solver sits behind `Solver`
//!
//! ## Quick Start
//!
//! ```rust
//! use chg::{Session, SessionConfig, Selection};
//!
//! # fn example() -> chg::Result<()> {
//! let session = Session::new(SessionConfig::default());
//! session.on_text_changed(r#"{
//!     "nodes": [{"label": "a", "is_constant": true, "value": 2}, {"label": "b"}],
//!     "edges": [{"label": "e1", "source_nodes": ["a"], "target": "b"}],
//!     "frames": {"f0": {}}
//! }"#);
//!
//! session.state().set_selection(Some(Selection::node("b")));
//! let view = session.view();
//! for el in view.visible() {
//!     println!("{:?} at {:?}", el.id, el.position);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | `schema` | Tolerant parser and flat/nested raw accessors |
//! | `model` | Canonical nodes, edges, frames, path annotation |
//! | `state` | Selection/frame/layout/path store with observers |
//! | `focus` | Overview and focus layouts, highlight classes |
//! | `simulation` | Solver boundary, result merge, value write-back |
//! | `mutation` | Label-preserving document edits |
//! | `outline` | Tree data for outline views |
//! | `session` | The reparse-on-every-edit loop |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod state;
pub mod focus;
pub mod simulation;
pub mod mutation;
pub mod outline;
pub mod session;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Edge, SourceRef, Frame, Value, SimulationPath,
    Hypergraph, DocumentShape, Diagnostic, SimulateAffordance,
};

// ============================================================================
// Re-exports: Schema, state, view
// ============================================================================

pub use schema::{parse, RawDocument};
pub use state::{ViewState, Selection, SelectionKind, Field, StateEvent};
pub use focus::{compute_view, ViewSnapshot, ViewMode, ElementRef, LayoutRegistry, Point};

// ============================================================================
// Re-exports: Simulation and session
// ============================================================================

pub use simulation::{Solver, SolverConfig, SimulationRequest, SimulationResult};
#[cfg(feature = "solver")]
pub use simulation::ProcessSolver;
pub use session::{Session, SessionConfig, ReparseOutcome};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Simulation error: {message}")]
    Simulation { message: String, remediation: Option<String> },

    #[error("Simulation already running for node '{0}'")]
    SimulationInProgress(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
