//! End-to-end tests for the tolerant document reader.
//!
//! Each test exercises: text -> parse -> canonical model, and where it
//! applies, canonical JSON -> parse again.

use chg::{parse, Diagnostic, DocumentShape, Error, Hypergraph, Node, Value};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const FLAT: &str = r#"{
    "nodes": [
        {"label": "a", "is_constant": true, "value": 2, "units": "m"},
        {"label": "b", "description": "output"}
    ],
    "edges": [
        {"label": "e1", "source_nodes": {"x": "a"}, "target": "b", "weight": 1.5, "rel": "x * 2"}
    ],
    "frames": {"f0": {"b": [4]}, "f1": {}}
}"#;

const NESTED: &str = r#"{
    "hypergraph": {
        "nodes": [
            {"label": "a", "constant": true, "value": 2, "units": "m"},
            {"label": "b", "description": "output"}
        ],
        "edges": [
            {"label": "e1", "sources": {"x": "a"}, "target": "b", "cost": 1.5, "rel": "x * 2"}
        ]
    },
    "frames": {"f0": {"b": 4}, "f1": {}}
}"#;

// ============================================================================
// 1. Flat and nested documents with the same content parse equal
// ============================================================================

#[test]
fn test_flat_and_nested_equal() {
    let flat = parse(FLAT).unwrap();
    let nested = parse(NESTED).unwrap();

    assert_eq!(flat.shape, DocumentShape::Flat);
    assert_eq!(nested.shape, DocumentShape::Nested);
    assert!(flat.same_content(&nested));
    assert_eq!(flat.to_canonical_json(), nested.to_canonical_json());
}

// ============================================================================
// 2. Canonical re-serialization is idempotent
// ============================================================================

#[test]
fn test_canonical_idempotent() {
    let g = parse(NESTED).unwrap();
    let once = serde_json::to_string_pretty(&g.to_canonical_json()).unwrap();
    let again = parse(&once).unwrap();
    assert!(g.same_content(&again));
    let twice = serde_json::to_string_pretty(&again.to_canonical_json()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_canonical_writes_both_constant_keys() {
    let g = parse(NESTED).unwrap();
    let json = g.to_canonical_json();
    assert_eq!(json["nodes"][0]["is_constant"], serde_json::json!(true));
    assert_eq!(json["nodes"][0]["constant"], serde_json::json!(true));
    assert_eq!(json["edges"][0]["source_nodes"], serde_json::json!({"x": "a"}));
}

fn label() -> impl Strategy<Value = String> {
    "[a-e]{1,2}"
}

fn scalar() -> impl Strategy<Value = serde_json::Value> {
    prop_oneof![
        Just(serde_json::Value::Null),
        any::<bool>().prop_map(serde_json::Value::from),
        (-1000i64..1000).prop_map(serde_json::Value::from),
        "[a-z]{0,3}".prop_map(serde_json::Value::from),
    ]
}

fn document() -> impl Strategy<Value = serde_json::Value> {
    let node = (label(), any::<bool>(), proptest::option::of(scalar())).prop_map(|(l, c, v)| {
        let mut n = serde_json::json!({"label": l, "is_constant": c});
        if let Some(v) = v {
            n["value"] = v;
        }
        n
    });
    let edge = (label(), proptest::collection::vec(label(), 0..3), label())
        .prop_map(|(l, s, t)| serde_json::json!({"label": l, "source_nodes": s, "target": t}));
    let frame = proptest::collection::vec((label(), scalar()), 0..3).prop_map(|entries| {
        let map: serde_json::Map<String, serde_json::Value> = entries.into_iter().collect();
        serde_json::Value::Object(map)
    });
    (
        proptest::collection::vec(node, 0..5),
        proptest::collection::vec(edge, 0..4),
        proptest::collection::vec((label(), frame), 0..3),
        any::<bool>(),
    )
        .prop_map(|(nodes, edges, frames, nested)| {
            let frames: serde_json::Map<String, serde_json::Value> = frames.into_iter().collect();
            if nested {
                serde_json::json!({"hypergraph": {"nodes": nodes, "edges": edges}, "frames": frames})
            } else {
                serde_json::json!({"nodes": nodes, "edges": edges, "frames": frames})
            }
        })
}

proptest! {
    #[test]
    fn prop_canonical_reparse_is_equal(doc in document()) {
        let text = serde_json::to_string(&doc).unwrap();
        let g = parse(&text).unwrap();
        let canonical = serde_json::to_string(&g.to_canonical_json()).unwrap();
        let again = parse(&canonical).unwrap();
        prop_assert!(g.same_content(&again));
    }
}

// ============================================================================
// 3. Duplicates and dangling references are flagged, not repaired
// ============================================================================

#[test]
fn test_duplicates_flagged_without_crash() {
    let g = parse(r#"{
        "nodes": [{"label": "a", "value": 1}, {"label": "a", "value": 2}],
        "edges": [
            {"label": "e", "source_nodes": ["a"], "target": "ghost"},
            {"label": "e", "source_nodes": ["a"], "target": "a"}
        ]
    }"#).unwrap();

    assert_eq!(g.nodes.len(), 2);
    assert_eq!(g.edges.len(), 2);
    // first occurrence wins for lookups
    assert_eq!(g.node("a").unwrap().value, Some(Value::Int(1)));
    assert!(g.is_dangling("ghost"));

    let diags = g.diagnostics();
    assert!(diags.contains(&Diagnostic::DuplicateNodeLabel { label: "a".into() }));
    assert!(diags.contains(&Diagnostic::DuplicateEdgeLabel { label: "e".into() }));
    assert!(diags.iter().any(|d| matches!(d, Diagnostic::DanglingReference { label, .. } if label == "ghost")));
}

#[test]
fn test_duplicate_handles_preserved() {
    let g = parse(r#"{"edges": [{"label": "e", "source_nodes": {"x": "a", "x": "b"}}]}"#).unwrap();
    let e = g.edge("e").unwrap();
    assert_eq!(e.sources.len(), 2);
    assert_eq!(e.duplicate_handles(), vec!["x"]);
    assert!(g.diagnostics().contains(&Diagnostic::DuplicateHandle { edge: "e".into(), handle: "x".into() }));
}

// ============================================================================
// 4. Effective values
// ============================================================================

#[test]
fn test_effective_value_rules() {
    let g = parse(r#"{
        "nodes": [
            {"label": "a", "is_constant": true, "value": 5},
            {"label": "b", "value": 7},
            {"label": "c", "value": 0}
        ],
        "frames": {"f0": {"a": [1], "c": [9]}}
    }"#).unwrap();

    let value = |l: &str| g.effective_value(g.node(l).unwrap(), Some("f0")).cloned();
    assert_eq!(value("a"), Some(Value::Int(5)));
    assert_eq!(value("b"), Some(Value::Int(7)));
    assert_eq!(value("c"), Some(Value::Int(9)));

    let c = g.node("c").unwrap();
    assert_eq!(g.effective_value(c, None), Some(&Value::Int(0)));
    assert_eq!(g.effective_value(c, Some("missing")), Some(&Value::Int(0)));
}

#[test]
fn test_has_any_value_ignores_empty() {
    let mut g = Hypergraph::default();
    g.push_node(Node::new("s").with_value(""));
    g.push_node(Node::new("n"));
    g.push_node(Node::new("z").with_value(0));
    assert!(!g.has_any_value(g.node("s").unwrap(), None));
    assert!(!g.has_any_value(g.node("n").unwrap(), None));
    assert!(g.has_any_value(g.node("z").unwrap(), None));
}

// ============================================================================
// 5. Malformed input is a parse failure
// ============================================================================

#[test]
fn test_shape_failures() {
    for text in [
        "[1, 2]",
        "{\"nodes\": 3}",
        "{\"hypergraph\": 5}",
        "{\"frames\": [1]}",
        "{\"nodes\": [",
    ] {
        assert!(matches!(parse(text), Err(Error::Parse(_))), "{text}");
    }
    assert!(parse("{}").unwrap().is_empty());
    assert!(parse("  \n").unwrap().is_empty());
}
