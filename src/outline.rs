//! Outline tree data.
//!
//! A host renders this as a collapsible tree next to the document:
//!
//! ```text
//! Nodes
//! ├── a = 2            [constant]
//! ├── b = 4 m
//! └── x                [dangling]
//! Edges
//! └── e1
//!     ├── 0: a
//!     └── → b
//! Frames
//! └── f0               [active]
//!     └── b = 4
//! Path → b             (only while a simulation path is shown)
//! ```

use hashbrown::HashMap;
use serde::Serialize;

use crate::model::{Edge, Hypergraph, Node, SimulationPath};
use crate::state::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineGroup {
    Nodes,
    Edges,
    Frames,
    Path,
}

impl OutlineGroup {
    pub fn title(self) -> &'static str {
        match self {
            OutlineGroup::Nodes => "Nodes",
            OutlineGroup::Edges => "Edges",
            OutlineGroup::Frames => "Frames",
            OutlineGroup::Path => "Path",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutlineFlags {
    pub dangling: bool,
    /// Label appears more than once in its list.
    pub duplicate: bool,
    pub constant: bool,
    /// The active frame.
    pub active: bool,
    pub on_path: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineItem {
    pub label: String,
    pub detail: Option<String>,
    pub flags: OutlineFlags,
    /// What clicking the item selects.
    pub selection: Option<Selection>,
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            detail: None,
            flags: OutlineFlags::default(),
            selection: None,
            children: Vec::new(),
        }
    }

    fn detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    fn selects(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Depth-first search by label.
    pub fn find(&self, label: &str) -> Option<&OutlineItem> {
        if self.label == label {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(label))
    }
}

/// One root per group; the path group is present only while a path is active.
pub fn build(
    graph: &Hypergraph,
    frame: Option<&str>,
    path: Option<&SimulationPath>,
) -> Vec<OutlineItem> {
    let mut roots = vec![
        group(OutlineGroup::Nodes, nodes(graph, frame, path)),
        group(OutlineGroup::Edges, edges(graph, path)),
        group(OutlineGroup::Frames, frames(graph, frame)),
    ];
    if let Some(p) = path {
        let mut root = group(OutlineGroup::Path, path_items(p));
        root.label = format!("{} → {}", OutlineGroup::Path.title(), p.target_node);
        root.detail = p.cost.map(|c| format!("cost {c}"));
        root.selection = Some(Selection::path(p.target_node.clone()));
        roots.push(root);
    }
    roots
}

fn group(kind: OutlineGroup, children: Vec<OutlineItem>) -> OutlineItem {
    let mut item = OutlineItem::leaf(kind.title());
    item.detail = Some(children.len().to_string());
    item.children = children;
    item
}

fn counts<'a>(labels: impl Iterator<Item = &'a str>) -> HashMap<&'a str, usize> {
    let mut out = HashMap::new();
    for label in labels {
        *out.entry(label).or_insert(0) += 1;
    }
    out
}

fn node_detail(graph: &Hypergraph, node: &Node, frame: Option<&str>) -> Option<String> {
    let value = graph.effective_value(node, frame).filter(|v| !v.is_empty());
    match (value, node.units.as_deref()) {
        (Some(v), Some(u)) => Some(format!("= {v} {u}")),
        (Some(v), None) => Some(format!("= {v}")),
        (None, Some(u)) => Some(format!("[{u}]")),
        (None, None) => None,
    }
}

fn nodes(graph: &Hypergraph, frame: Option<&str>, path: Option<&SimulationPath>) -> Vec<OutlineItem> {
    let seen = counts(graph.nodes.iter().map(|n| n.label.as_str()));
    let mut out: Vec<OutlineItem> = graph
        .nodes
        .iter()
        .map(|node| {
            let mut item = OutlineItem::leaf(&node.label)
                .detail(node_detail(graph, node, frame))
                .selects(Selection::node(node.label.clone()));
            item.flags.constant = node.is_constant;
            item.flags.duplicate = seen.get(node.label.as_str()).is_some_and(|&n| n > 1);
            item.flags.on_path = path.is_some_and(|p| p.contains_node(&node.label));
            item
        })
        .collect();

    for label in graph.dangling_labels() {
        let mut item = OutlineItem::leaf(label).selects(Selection::node(label));
        item.flags.dangling = true;
        out.push(item);
    }
    out
}

fn edge_children(graph: &Hypergraph, edge: &Edge) -> Vec<OutlineItem> {
    let mut out: Vec<OutlineItem> = edge
        .sources
        .iter()
        .map(|s| {
            let mut item = OutlineItem::leaf(format!("{}: {}", s.handle, s.label))
                .selects(Selection::node(s.label.clone()));
            item.flags.dangling = !graph.has_node(&s.label);
            item
        })
        .collect();
    if let Some(target) = edge.target() {
        let mut item = OutlineItem::leaf(format!("→ {target}")).selects(Selection::node(target));
        item.flags.dangling = !graph.has_node(target);
        out.push(item);
    }
    out
}

fn edges(graph: &Hypergraph, path: Option<&SimulationPath>) -> Vec<OutlineItem> {
    let seen = counts(graph.edges.iter().map(|e| e.label.as_str()));
    graph
        .edges
        .iter()
        .map(|edge| {
            let mut item = OutlineItem::leaf(&edge.label)
                .detail(edge.rel.clone())
                .selects(Selection::edge(edge.label.clone()));
            item.flags.duplicate = seen.get(edge.label.as_str()).is_some_and(|&n| n > 1)
                || !edge.duplicate_handles().is_empty();
            item.flags.on_path = path.is_some_and(|p| p.contains_edge(&edge.label));
            item.children = edge_children(graph, edge);
            item
        })
        .collect()
}

fn frames(graph: &Hypergraph, active: Option<&str>) -> Vec<OutlineItem> {
    graph
        .frame_names()
        .iter()
        .map(|name| {
            let entries = graph
                .frame(name)
                .map(|f| {
                    f.iter()
                        .map(|(label, values)| {
                            let detail = values.first().map(|v| format!("= {v}"));
                            let mut item = OutlineItem::leaf(label)
                                .detail(detail)
                                .selects(Selection::node(label));
                            item.flags.dangling = !graph.has_node(label);
                            item
                        })
                        .collect()
                })
                .unwrap_or_default();
            let mut item = OutlineItem::leaf(name);
            item.flags.active = active == Some(name.as_str());
            item.children = entries;
            item
        })
        .collect()
}

fn path_items(path: &SimulationPath) -> Vec<OutlineItem> {
    let nodes = path.nodes.iter().map(|n| {
        let mut item = OutlineItem::leaf(n).selects(Selection::node(n.clone()));
        item.flags.on_path = true;
        item
    });
    let edges = path.edges.iter().map(|e| {
        let mut item = OutlineItem::leaf(e).selects(Selection::edge(e.clone()));
        item.flags.on_path = true;
        item
    });
    nodes.chain(edges).collect()
}
