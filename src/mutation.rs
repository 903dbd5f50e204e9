//! Document edits: apply a change to raw JSON and serialize it back.
//!
//! Every edit runs against a freshly parsed [`RawDocument`] and produces new
//! text. The caller feeds that text through the normal reparse path, so the
//! model is never patched in place.
//!
//! ```text
//! text → RawDocument → edit closure → RawDocument → text → schema::parse
//! ```
//!
//! Labels are identities. Renames and deletes go through the routines here,
//! which update every edge reference and frame entry in the same edit.

use serde_json::{Map, Value as JsonValue, json};

use crate::model::Value;
use crate::schema::raw::{label_of, source_key};
use crate::schema::{self, RawDocument};
use crate::{Error, Result};

/// Parse `text`, run `edit`, serialize. Nothing is returned on failure.
///
/// Documents with a repeated source handle are refused: the raw layer is a
/// JSON object and would keep only the last source under that handle.
pub fn mutate<F>(text: &str, edit: F) -> Result<String>
where
    F: FnOnce(&mut RawDocument) -> Result<()>,
{
    refuse_duplicate_handles(text)?;
    let mut doc = RawDocument::parse(text)?;
    edit(&mut doc)?;
    doc.to_text()
}

fn refuse_duplicate_handles(text: &str) -> Result<()> {
    let Ok(graph) = schema::parse(text) else {
        return Ok(());
    };
    for edge in &graph.edges {
        if let Some(handle) = edge.duplicate_handles().first() {
            return Err(Error::Conflict(format!(
                "edge '{}' repeats source handle '{handle}'; fix it in the text before editing",
                edge.label
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Label propagation
// ============================================================================

/// Rename a node and every reference to it. Returns how many edge slots
/// were rewritten.
pub fn rename_node(doc: &mut RawDocument, old: &str, new: &str) -> Result<usize> {
    if old == new {
        return Ok(0);
    }
    if new.is_empty() {
        return Err(Error::Conflict("node label cannot be empty".into()));
    }
    if doc.has_node(new) {
        return Err(Error::Conflict(format!("node '{new}' already exists")));
    }
    let owned = doc.has_node(old);

    if owned {
        for node in doc.nodes_mut()?.iter_mut().filter_map(JsonValue::as_object_mut) {
            if node.get("label").and_then(JsonValue::as_str) == Some(old) {
                node.insert("label".into(), json!(new));
            }
        }
    }

    let mut rewritten = 0;
    for edge in edge_objects(doc)? {
        rewritten += rewrite_sources(edge, |label| (label == old).then(|| new.to_string()));
        if edge.get("target").and_then(JsonValue::as_str) == Some(old) {
            edge.insert("target".into(), json!(new));
            rewritten += 1;
        }
    }

    for frame in frame_objects(doc)? {
        rename_key(frame, old, new);
    }

    if !owned && rewritten == 0 {
        return Err(Error::NotFound(format!("node '{old}'")));
    }
    tracing::debug!(old, new, rewritten, "renamed node");
    Ok(rewritten)
}

/// Remove a node, drop it from edge sources, unset targets that pointed at
/// it, and remove its frame entries.
pub fn delete_node(doc: &mut RawDocument, label: &str) -> Result<()> {
    let nodes = doc.nodes_mut()?;
    let before = nodes.len();
    nodes.retain(|n| label_of(n) != Some(label));
    if nodes.len() == before {
        return Err(Error::NotFound(format!("node '{label}'")));
    }

    for edge in edge_objects(doc)? {
        remove_sources(edge, |l| l == label);
        if edge.get("target").and_then(JsonValue::as_str) == Some(label) {
            edge.insert("target".into(), json!(""));
        }
    }
    for frame in frame_objects(doc)? {
        frame.shift_remove(label);
    }
    Ok(())
}

pub fn rename_edge(doc: &mut RawDocument, old: &str, new: &str) -> Result<()> {
    if old == new {
        return Ok(());
    }
    if new.is_empty() {
        return Err(Error::Conflict("edge label cannot be empty".into()));
    }
    if doc.has_edge(new) {
        return Err(Error::Conflict(format!("edge '{new}' already exists")));
    }
    doc.edge_mut(old)?.insert("label".into(), json!(new));
    Ok(())
}

pub fn delete_edge(doc: &mut RawDocument, label: &str) -> Result<()> {
    let edges = doc.edges_mut()?;
    let before = edges.len();
    edges.retain(|e| label_of(e) != Some(label));
    if edges.len() == before {
        return Err(Error::NotFound(format!("edge '{label}'")));
    }
    Ok(())
}

/// Edge objects, without creating an `edges` array the document lacks.
fn edge_objects(doc: &mut RawDocument) -> Result<Vec<&mut Map<String, JsonValue>>> {
    if doc.edges().is_empty() {
        return Ok(Vec::new());
    }
    Ok(doc.edges_mut()?.iter_mut().filter_map(JsonValue::as_object_mut).collect())
}

fn frame_objects(doc: &mut RawDocument) -> Result<Vec<&mut Map<String, JsonValue>>> {
    if doc.frames().is_none() {
        return Ok(Vec::new());
    }
    Ok(doc.frames_mut()?.values_mut().filter_map(JsonValue::as_object_mut).collect())
}

// ============================================================================
// Nodes
// ============================================================================

pub fn add_node(doc: &mut RawDocument, label: &str) -> Result<()> {
    if doc.has_node(label) {
        return Err(Error::Conflict(format!("node '{label}' already exists")));
    }
    doc.nodes_mut()?.push(json!({ "label": label, "is_constant": false }));
    Ok(())
}

/// Write `is_constant` and drop the legacy `constant` key.
pub fn set_node_constant(doc: &mut RawDocument, label: &str, constant: bool) -> Result<()> {
    let node = doc.node_mut(label)?;
    node.shift_remove("constant");
    node.insert("is_constant".into(), json!(constant));
    Ok(())
}

pub fn set_node_value(doc: &mut RawDocument, label: &str, value: Option<&Value>) -> Result<()> {
    let node = doc.node_mut(label)?;
    match value {
        Some(v) => { node.insert("value".into(), v.to_json()); }
        None => { node.shift_remove("value"); }
    }
    Ok(())
}

/// Free-text node fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeText {
    Description,
    Units,
}

impl NodeText {
    fn key(self) -> &'static str {
        match self {
            NodeText::Description => "description",
            NodeText::Units => "units",
        }
    }
}

pub fn set_node_text(doc: &mut RawDocument, label: &str, field: NodeText, text: Option<&str>) -> Result<()> {
    let node = doc.node_mut(label)?;
    match text {
        Some(t) => { node.insert(field.key().into(), json!(t)); }
        None => { node.shift_remove(field.key()); }
    }
    Ok(())
}

// ============================================================================
// Edges
// ============================================================================

pub fn add_edge(doc: &mut RawDocument, label: &str) -> Result<()> {
    if doc.has_edge(label) {
        return Err(Error::Conflict(format!("edge '{label}' already exists")));
    }
    doc.edges_mut()?.push(json!({ "label": label, "source_nodes": [], "target": "" }));
    Ok(())
}

/// Empty target unsets it.
pub fn set_edge_target(doc: &mut RawDocument, edge: &str, target: &str) -> Result<()> {
    doc.edge_mut(edge)?.insert("target".into(), json!(target));
    Ok(())
}

/// Writes `weight`, dropping the legacy `cost` key.
pub fn set_edge_weight(doc: &mut RawDocument, edge: &str, weight: Option<f64>) -> Result<()> {
    let edge = doc.edge_mut(edge)?;
    edge.shift_remove("cost");
    match weight {
        Some(w) => { edge.insert("weight".into(), json!(w)); }
        None => { edge.shift_remove("weight"); }
    }
    Ok(())
}

pub fn set_edge_rel(doc: &mut RawDocument, edge: &str, rel: Option<&str>) -> Result<()> {
    let edge = doc.edge_mut(edge)?;
    match rel {
        Some(r) => { edge.insert("rel".into(), json!(r)); }
        None => { edge.shift_remove("rel"); }
    }
    Ok(())
}

/// Append a source. Returns its handle: the position for list-form
/// sources, the lowest unused integer key for keyed sources.
pub fn add_edge_source(doc: &mut RawDocument, edge: &str, label: &str) -> Result<String> {
    let edge = doc.edge_mut(edge)?;
    let key = source_key(edge);
    match edge.entry(key).or_insert_with(|| JsonValue::Array(Vec::new())) {
        JsonValue::Array(items) => {
            items.push(json!(label));
            Ok((items.len() - 1).to_string())
        }
        JsonValue::Object(keyed) => {
            let handle = (0..)
                .map(|i: usize| i.to_string())
                .find(|h| !keyed.contains_key(h))
                .unwrap_or_default();
            keyed.insert(handle.clone(), json!(label));
            Ok(handle)
        }
        _ => Err(Error::Parse(format!("'{key}' must be a list or an object"))),
    }
}

/// Remove the source with this handle.
pub fn remove_edge_source(doc: &mut RawDocument, edge: &str, handle: &str) -> Result<()> {
    let edge_label = edge;
    let edge = doc.edge_mut(edge)?;
    let key = source_key(edge);
    let removed = match edge.get_mut(key) {
        Some(JsonValue::Array(items)) => match handle.parse::<usize>() {
            Ok(i) if i < items.len() => { items.remove(i); true }
            _ => false,
        },
        Some(JsonValue::Object(keyed)) => keyed.shift_remove(handle).is_some(),
        _ => false,
    };
    if removed {
        Ok(())
    } else {
        Err(Error::NotFound(format!("source '{handle}' of edge '{edge_label}'")))
    }
}

// ============================================================================
// Frames
// ============================================================================

pub fn add_frame(doc: &mut RawDocument, name: &str) -> Result<()> {
    let frames = doc.frames_mut()?;
    if frames.contains_key(name) {
        return Err(Error::Conflict(format!("frame '{name}' already exists")));
    }
    frames.insert(name.into(), JsonValue::Object(Map::new()));
    Ok(())
}

/// Rename in place; the frame keeps its position.
pub fn rename_frame(doc: &mut RawDocument, old: &str, new: &str) -> Result<()> {
    if old == new {
        return Ok(());
    }
    let frames = doc.frames_mut()?;
    if !frames.contains_key(old) {
        return Err(Error::NotFound(format!("frame '{old}'")));
    }
    if frames.contains_key(new) {
        return Err(Error::Conflict(format!("frame '{new}' already exists")));
    }
    rename_key(frames, old, new);
    Ok(())
}

pub fn delete_frame(doc: &mut RawDocument, name: &str) -> Result<()> {
    doc.frames_mut()?
        .shift_remove(name)
        .map(|_| ())
        .ok_or_else(|| Error::NotFound(format!("frame '{name}'")))
}

/// Copy an existing frame under a new name, appended last.
pub fn duplicate_frame(doc: &mut RawDocument, from: &str, new: &str) -> Result<()> {
    let frames = doc.frames_mut()?;
    if frames.contains_key(new) {
        return Err(Error::Conflict(format!("frame '{new}' already exists")));
    }
    let copy = frames
        .get(from)
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("frame '{from}'")))?;
    frames.insert(new.into(), copy);
    Ok(())
}

/// Store `[value]` for a node in a frame, replacing any existing entry.
pub fn set_frame_value(doc: &mut RawDocument, frame: &str, label: &str, value: &Value) -> Result<()> {
    doc.frame_mut(frame)?
        .insert(label.into(), JsonValue::Array(vec![value.to_json()]));
    Ok(())
}

pub fn clear_frame_value(doc: &mut RawDocument, frame: &str, label: &str) -> Result<()> {
    doc.frame_mut(frame)?.shift_remove(label);
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Replace source labels for which `map` returns a new label.
fn rewrite_sources<F>(edge: &mut Map<String, JsonValue>, map: F) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    let mut count = 0;
    let key = source_key(edge);
    let slots: Box<dyn Iterator<Item = &mut JsonValue> + '_> = match edge.get_mut(key) {
        Some(JsonValue::Array(items)) => Box::new(items.iter_mut()),
        Some(JsonValue::Object(keyed)) => Box::new(keyed.values_mut()),
        _ => return 0,
    };
    for slot in slots {
        if let Some(new) = slot.as_str().and_then(&map) {
            *slot = JsonValue::String(new);
            count += 1;
        }
    }
    count
}

fn remove_sources<F>(edge: &mut Map<String, JsonValue>, matches: F)
where
    F: Fn(&str) -> bool,
{
    let key = source_key(edge);
    let hit = |v: &JsonValue| v.as_str().is_some_and(&matches);
    match edge.get_mut(key) {
        Some(JsonValue::Array(items)) => items.retain(|v| !hit(v)),
        Some(JsonValue::Object(keyed)) => keyed.retain(|_, v| !hit(&*v)),
        _ => {}
    }
}

/// Rename a key without moving it. An existing `new` entry is replaced.
fn rename_key(map: &mut Map<String, JsonValue>, old: &str, new: &str) {
    if !map.contains_key(old) {
        return;
    }
    let entries = std::mem::take(map);
    for (k, v) in entries {
        if k == old {
            map.insert(new.to_string(), v);
        } else if k != new {
            map.insert(k, v);
        }
    }
}
