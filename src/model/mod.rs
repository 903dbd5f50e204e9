//! # Constraint Hypergraph Model
//!
//! Canonical DTOs for a parsed document: value nodes, hyperedges, frames,
//! and simulation-path annotations.
//!
//! Design rule: NO raw JSON shapes here. The schema layer reconciles legacy
//! field names and the flat/nested wrapper before anything lands in this
//! module. This module is pure data with no I/O and no async.

pub mod node;
pub mod edge;
pub mod frame;
pub mod path;
pub mod value;
pub mod hypergraph;

pub use node::Node;
pub use edge::{Edge, SourceRef, Sources};
pub use frame::{Frame, FrameValues};
pub use path::SimulationPath;
pub use value::Value;
pub use hypergraph::{
    Hypergraph, DocumentShape, NodeNeighbors, EdgeEndpoints,
    Diagnostic, RefSlot, SimulateAffordance,
};
