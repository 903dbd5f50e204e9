//! Wire shapes and their reconciliation into the canonical model.
//!
//! Every field is read leniently: a value of the wrong type is skipped or
//! coerced, never allowed to fail the whole document.

use std::fmt;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use smallvec::SmallVec;

use crate::model::*;

// ============================================================================
// Wire shapes
// ============================================================================

/// Top level. A non-null `hypergraph` means the nested layout.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WireDocument {
    pub hypergraph: Option<WireGraph>,
    pub nodes: Option<Vec<Lenient<WireNode>>>,
    pub edges: Option<Vec<Lenient<WireEdge>>>,
    pub frames: Option<KeyedEntries>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WireGraph {
    pub nodes: Option<Vec<Lenient<WireNode>>>,
    pub edges: Option<Vec<Lenient<WireEdge>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WireNode {
    pub label: Option<JsonValue>,
    pub value: Option<JsonValue>,
    pub is_constant: Option<JsonValue>,
    pub constant: Option<JsonValue>,
    pub description: Option<JsonValue>,
    pub units: Option<JsonValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct WireEdge {
    pub label: Option<JsonValue>,
    pub source_nodes: Option<WireSources>,
    pub sources: Option<WireSources>,
    pub target: Option<JsonValue>,
    pub weight: Option<JsonValue>,
    pub cost: Option<JsonValue>,
    pub rel: Option<JsonValue>,
}

/// A list entry that either parses or is skipped.
#[derive(Debug)]
pub(crate) enum Lenient<T> {
    Parsed(T),
    Skipped,
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Either<T> {
            Parsed(T),
            Skipped(IgnoredAny),
        }
        Ok(match Either::deserialize(deserializer)? {
            Either::Parsed(t) => Lenient::Parsed(t),
            Either::Skipped(_) => Lenient::Skipped,
        })
    }
}

/// Source list: positional labels or handle → label pairs.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireSources {
    Positional(Vec<JsonValue>),
    Keyed(KeyedEntries),
    Other(IgnoredAny),
}

/// Object entries in document order, repeated keys kept.
#[derive(Debug, Default)]
pub(crate) struct KeyedEntries(pub Vec<(String, JsonValue)>);

impl<'de> Deserialize<'de> for KeyedEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = KeyedEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<KeyedEntries, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, JsonValue>()? {
                    entries.push((k, v));
                }
                Ok(KeyedEntries(entries))
            }

            fn visit_unit<E: de::Error>(self) -> Result<KeyedEntries, E> {
                Ok(KeyedEntries::default())
            }
        }

        deserializer.deserialize_any(EntriesVisitor)
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

pub(crate) fn build(doc: WireDocument) -> Hypergraph {
    let (shape, nodes, edges) = match doc.hypergraph {
        Some(inner) => (DocumentShape::Nested, inner.nodes, inner.edges),
        None => (DocumentShape::Flat, doc.nodes, doc.edges),
    };
    let mut graph = Hypergraph::new(shape);

    for wire in nodes.into_iter().flatten() {
        match wire {
            Lenient::Parsed(n) => match node(n) {
                Some(n) => graph.push_node(n),
                None => tracing::debug!("skipping node without a string label"),
            },
            Lenient::Skipped => tracing::debug!("skipping non-object node entry"),
        }
    }
    for wire in edges.into_iter().flatten() {
        match wire {
            Lenient::Parsed(e) => match edge(e) {
                Some(e) => graph.push_edge(e),
                None => tracing::debug!("skipping edge without a string label"),
            },
            Lenient::Skipped => tracing::debug!("skipping non-object edge entry"),
        }
    }
    for (name, entries) in doc.frames.map(|f| f.0).unwrap_or_default() {
        graph.push_frame(name, frame(&entries));
    }
    graph
}

fn string_field(v: Option<JsonValue>) -> Option<String> {
    match v {
        Some(JsonValue::String(s)) => Some(s),
        _ => None,
    }
}

fn bool_field(v: &Option<JsonValue>) -> Option<bool> {
    v.as_ref().and_then(JsonValue::as_bool)
}

fn node(wire: WireNode) -> Option<Node> {
    let label = string_field(wire.label)?;
    let is_constant = bool_field(&wire.is_constant)
        .or_else(|| bool_field(&wire.constant))
        .unwrap_or(false);
    let value = wire.value.and_then(|v| match v {
        JsonValue::Array(items) => items.first().and_then(Value::from_json),
        other => Value::from_json(&other),
    });
    Some(Node {
        label,
        value,
        is_constant,
        description: string_field(wire.description),
        units: string_field(wire.units),
    })
}

fn edge(wire: WireEdge) -> Option<Edge> {
    let label = string_field(wire.label)?;
    let mut sources = Sources::new();
    match wire.source_nodes.or(wire.sources) {
        Some(WireSources::Positional(items)) => {
            for (i, item) in items.into_iter().enumerate() {
                if let JsonValue::String(l) = item {
                    sources.push(SourceRef::new(i.to_string(), l));
                }
            }
        }
        Some(WireSources::Keyed(entries)) => {
            for (handle, item) in entries.0 {
                if let JsonValue::String(l) = item {
                    sources.push(SourceRef::new(handle, l));
                }
            }
        }
        Some(WireSources::Other(_)) | None => {}
    }
    let weight = wire.weight.or(wire.cost).as_ref().and_then(JsonValue::as_f64);
    Some(Edge {
        label,
        weight,
        sources,
        target: string_field(wire.target).unwrap_or_default(),
        rel: string_field(wire.rel),
    })
}

fn frame(entries: &JsonValue) -> Frame {
    let mut frame = Frame::new();
    let Some(map) = entries.as_object() else {
        return frame;
    };
    for (label, raw) in map {
        let values: FrameValues = match raw {
            JsonValue::Array(items) => items.iter().filter_map(Value::from_json).collect(),
            scalar => Value::from_json(scalar).into_iter().collect::<SmallVec<_>>(),
        };
        frame.insert(label.clone(), values);
    }
    frame
}
