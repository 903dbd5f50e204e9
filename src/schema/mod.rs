//! # Document Schema
//!
//! Tolerant reader for constraint hypergraph documents, plus the raw
//! accessor pair that mutation helpers write through.
//! Pure functions: no I/O, no state.
//!
//! Accepted legacy forms:
//!
//! | Canonical | Also accepted |
//! |-----------|---------------|
//! | `{nodes, edges, frames}` | `{hypergraph: {nodes, edges}, frames}` |
//! | `is_constant` | `constant` |
//! | `source_nodes` | `sources` |
//! | `source_nodes: {handle: label}` | `source_nodes: [label, ...]` |
//! | `weight` | `cost` |
//! | frame entry `[v]` | frame entry `v` |

mod normalize;
pub mod raw;

use crate::model::Hypergraph;
use crate::{Error, Result};

pub use raw::RawDocument;

/// Parse document text into a canonical model.
///
/// Blank text is an empty flat document. Anything that is not a JSON
/// object with array-valued `nodes`/`edges` and an object-valued `frames`
/// is a parse failure; the caller keeps its previous model.
pub fn parse(text: &str) -> Result<Hypergraph> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return Ok(Hypergraph::default());
    }
    if !trimmed.starts_with('{') {
        return Err(Error::Parse("document root must be a JSON object".into()));
    }
    let wire: normalize::WireDocument =
        serde_json::from_str(text).map_err(|e| Error::Parse(e.to_string()))?;
    Ok(normalize::build(wire))
}
