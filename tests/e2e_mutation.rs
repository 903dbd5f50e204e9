//! End-to-end tests for label-preserving document edits.
//!
//! Each test exercises: text -> mutate -> text -> parse, usually through a
//! `Session` so selection and frame tracking are covered too.

use chg::mutation::{self, NodeText};
use chg::{parse, Error, Selection, Session, SessionConfig, Value};
use pretty_assertions::assert_eq;
use serde_json::{json, Value as JsonValue};

const FLAT: &str = r#"{
  "nodes": [
    {"label": "a", "is_constant": true, "value": 2},
    {"label": "b"},
    {"label": "c"}
  ],
  "edges": [
    {"label": "e1", "source_nodes": {"x": "a", "y": "b"}, "target": "c"},
    {"label": "e2", "source_nodes": ["c", "b"], "target": "b"}
  ],
  "frames": {"f0": {"b": [3], "c": [5]}, "f1": {"b": [4]}}
}
"#;

const NESTED: &str = r#"{
  "hypergraph": {
    "nodes": [{"label": "a", "constant": true, "value": 2}, {"label": "b"}],
    "edges": [{"label": "e1", "sources": ["a"], "target": "b", "cost": 2}]
  },
  "frames": {"f0": {"b": 1}}
}"#;

fn json(text: &str) -> JsonValue {
    serde_json::from_str(text).unwrap()
}

// ============================================================================
// 1. Rename propagates through edges, frames, and selection
// ============================================================================

#[test]
fn test_rename_node_everywhere() {
    let session = Session::new(SessionConfig::default());
    session.on_text_changed(FLAT);
    session.state().set_selection(Some(Selection::node("b")));

    let text = session.rename_node("b", "beta").unwrap();
    let j = json(&text);

    assert_eq!(j["nodes"][1]["label"], json!("beta"));
    assert_eq!(j["edges"][0]["source_nodes"], json!({"x": "a", "y": "beta"}));
    assert_eq!(j["edges"][1]["source_nodes"], json!(["c", "beta"]));
    assert_eq!(j["edges"][1]["target"], json!("beta"));
    assert_eq!(j["frames"]["f0"], json!({"beta": [3], "c": [5]}));
    assert_eq!(j["frames"]["f1"], json!({"beta": [4]}));
    assert_eq!(session.state().selection(), Some(Selection::node("beta")));

    let g = session.model();
    assert!(g.has_node("beta") && !g.has_node("b"));
    assert!(g.dangling_labels().is_empty());
}

#[test]
fn test_rename_dangling_reference() {
    let text = r#"{"edges": [{"label": "e", "source_nodes": ["ghost"], "target": ""}]}"#;
    let out = mutation::mutate(text, |doc| mutation::rename_node(doc, "ghost", "real").map(|_| ())).unwrap();
    let j = json(&out);
    assert_eq!(j["edges"][0]["source_nodes"], json!(["real"]));
    assert!(j.get("nodes").is_none());
    assert!(j.get("frames").is_none());
}

#[test]
fn test_rename_conflict_leaves_text() {
    let session = Session::new(SessionConfig::default());
    session.on_text_changed(FLAT);
    assert!(matches!(session.rename_node("a", "b"), Err(Error::Conflict(_))));
    assert!(matches!(session.rename_node("zz", "q"), Err(Error::NotFound(_))));
    assert_eq!(session.text(), FLAT);
}

#[test]
fn test_rename_edge_follows_selection() {
    let session = Session::new(SessionConfig::default());
    session.on_text_changed(FLAT);
    session.state().set_selection(Some(Selection::edge("e2")));
    session.rename_edge("e2", "rule").unwrap();
    assert_eq!(session.state().selection(), Some(Selection::edge("rule")));
    assert!(session.model().has_edge("rule"));
}

// ============================================================================
// 2. Delete cleans references without repairing them
// ============================================================================

#[test]
fn test_delete_node_cleans_references() {
    let out = mutation::mutate(FLAT, |doc| mutation::delete_node(doc, "b")).unwrap();
    let j = json(&out);
    assert_eq!(j["nodes"].as_array().unwrap().len(), 2);
    assert_eq!(j["edges"][0]["source_nodes"], json!({"x": "a"}));
    assert_eq!(j["edges"][1]["source_nodes"], json!(["c"]));
    assert_eq!(j["edges"][1]["target"], json!(""));
    assert_eq!(j["frames"]["f0"], json!({"c": [5]}));
    assert_eq!(j["frames"]["f1"], json!({}));

    let g = parse(&out).unwrap();
    assert!(g.dangling_labels().is_empty());
    assert_eq!(g.edge("e2").unwrap().target(), None);
}

// ============================================================================
// 3. Nested documents stay nested, legacy keys migrate on touch
// ============================================================================

#[test]
fn test_nested_shape_preserved() {
    let out = mutation::mutate(NESTED, |doc| {
        mutation::add_node(doc, "c")?;
        mutation::set_node_constant(doc, "a", false)?;
        mutation::set_edge_weight(doc, "e1", Some(3.0))?;
        mutation::set_node_text(doc, "b", NodeText::Units, Some("kg"))
    })
    .unwrap();
    let j = json(&out);

    assert!(j.get("nodes").is_none());
    let nodes = &j["hypergraph"]["nodes"];
    assert_eq!(nodes[2]["label"], json!("c"));
    assert_eq!(nodes[0], json!({"label": "a", "value": 2, "is_constant": false}));
    assert_eq!(nodes[1]["units"], json!("kg"));
    assert_eq!(j["hypergraph"]["edges"][0].get("cost"), None);
    assert_eq!(j["hypergraph"]["edges"][0]["weight"], json!(3.0));
}

#[test]
fn test_untouched_keys_keep_order() {
    let out = mutation::mutate(FLAT, |doc| mutation::set_node_value(doc, "b", Some(&Value::Int(9)))).unwrap();
    let keys: Vec<String> = json(&out).as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["nodes", "edges", "frames"]);
    assert!(out.ends_with('\n'));
}

// ============================================================================
// 4. Sources and frames
// ============================================================================

#[test]
fn test_edge_sources() {
    let out = mutation::mutate(FLAT, |doc| {
        assert_eq!(mutation::add_edge_source(doc, "e1", "c")?, "0");
        assert_eq!(mutation::add_edge_source(doc, "e2", "a")?, "2");
        mutation::remove_edge_source(doc, "e1", "x")
    })
    .unwrap();
    let j = json(&out);
    assert_eq!(j["edges"][0]["source_nodes"], json!({"y": "b", "0": "c"}));
    assert_eq!(j["edges"][1]["source_nodes"], json!(["c", "b", "a"]));
}

#[test]
fn test_frame_crud() {
    let session = Session::new(SessionConfig::default());
    session.on_text_changed(FLAT);
    assert_eq!(session.state().current_frame().as_deref(), Some("f0"));

    session.duplicate_frame("f0", "copy").unwrap();
    session.rename_frame("f0", "base").unwrap();
    assert_eq!(session.state().current_frame().as_deref(), Some("base"));
    assert_eq!(session.model().frame_names(), ["base", "f1", "copy"]);
    assert_eq!(session.model().frame("copy"), session.model().frame("base"));

    assert!(matches!(session.add_frame("f1"), Err(Error::Conflict(_))));

    session.delete_frame("base").unwrap();
    assert_eq!(session.state().current_frame().as_deref(), Some("f1"));
}

#[test]
fn test_edge_fields_and_frame_clear() {
    let out = mutation::mutate(FLAT, |doc| {
        mutation::set_edge_target(doc, "e1", "b")?;
        mutation::set_edge_rel(doc, "e1", Some("x + y"))?;
        mutation::set_edge_rel(doc, "e2", None)?;
        mutation::set_edge_target(doc, "e2", "")?;
        mutation::clear_frame_value(doc, "f0", "b")
    })
    .unwrap();
    let j = json(&out);
    assert_eq!(j["edges"][0]["target"], json!("b"));
    assert_eq!(j["edges"][0]["rel"], json!("x + y"));
    assert_eq!(j["edges"][1].get("rel"), None);
    assert_eq!(j["frames"]["f0"], json!({"c": [5]}));

    let g = parse(&out).unwrap();
    assert_eq!(g.edge("e2").unwrap().target(), None);
    assert_eq!(g.edge("e1").unwrap().rel.as_deref(), Some("x + y"));
    assert!(matches!(
        mutation::mutate(FLAT, |doc| mutation::clear_frame_value(doc, "nope", "b")),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn test_add_edge_to_nested() {
    let out = mutation::mutate(NESTED, |doc| {
        mutation::add_edge(doc, "e2")?;
        mutation::add_edge_source(doc, "e2", "b")?;
        mutation::set_edge_target(doc, "e2", "a")
    })
    .unwrap();
    let j = json(&out);
    assert!(j.get("edges").is_none());
    assert_eq!(
        j["hypergraph"]["edges"][1],
        json!({"label": "e2", "source_nodes": ["b"], "target": "a"})
    );
    assert!(matches!(
        mutation::mutate(NESTED, |doc| mutation::add_edge(doc, "e1")),
        Err(Error::Conflict(_))
    ));
}

// ============================================================================
// 5. Documents the raw layer cannot rewrite faithfully
// ============================================================================

#[test]
fn test_repeated_handle_blocks_edits() {
    let text = r#"{
  "nodes": [{"label": "z"}],
  "edges": [{"label": "e", "source_nodes": {"x": "a", "x": "b"}}]
}"#;
    let session = Session::new(SessionConfig::default());
    session.on_text_changed(text);

    let err = session.apply(|doc| mutation::set_node_value(doc, "z", Some(&Value::Int(1)))).unwrap_err();
    assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("'e'") && msg.contains("'x'")));
    assert_eq!(session.text(), text);
    assert_eq!(session.model().edge("e").unwrap().sources.len(), 2);
}

#[test]
fn test_null_wrapper_edits_as_flat() {
    let text = r#"{"hypergraph": null, "nodes": [{"label": "a"}]}"#;
    assert!(parse(text).unwrap().has_node("a"));

    let out = mutation::mutate(text, |doc| mutation::add_node(doc, "b")).unwrap();
    let g = parse(&out).unwrap();
    assert!(g.has_node("a") && g.has_node("b"));
    assert_eq!(json(&out)["nodes"][1]["label"], json!("b"));
}
