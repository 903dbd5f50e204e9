//! # Focus View
//!
//! Turns a model snapshot plus the current selection into render
//! instructions: elements, links, highlight classes, and positions.
//!
//! ```text
//!            leading                    trailing
//!  sources ─▶ edges ─▶ [ focused node ] ─▶ edges ─▶ targets
//!   x = -2    x = -1        x = 0          x = +1    x = +2
//! ```
//!
//! Three modes, chosen purely by selection:
//!
//! | Selection | Mode | Visible |
//! |-----------|------|---------|
//! | none / path / unresolved label | Overview | everything |
//! | node | NodeFocus | node, leading/trailing edges, their sources/targets |
//! | edge | EdgeFocus | edge, its sources, its target |
//!
//! Elements outside the focus are dimmed, not removed, and keep their
//! overview positions. The simulation-path overlay is applied last, from
//! scratch, on every computation.

pub mod layout;

use hashbrown::HashSet;
use serde::Serialize;

use crate::model::{Edge, Hypergraph, SimulationPath};
use crate::state::{Selection, SelectionKind};

pub use layout::{
    LayoutInput, LayoutRegistry, LayoutStrategy, Point,
    GridLayout, CircleLayout, ConcentricLayout, BreadthFirstLayout,
};

/// Horizontal distance between focus columns.
pub const FOCUS_UNIT: f64 = 200.0;
/// Vertical distance between stacked siblings in a focus column.
pub const FOCUS_SPACING: f64 = 80.0;

// ============================================================================
// View types
// ============================================================================

/// Identity of a rendered vertex. Value nodes and hyperedges live in
/// separate namespaces, so a node and an edge may share a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "label", rename_all = "lowercase")]
pub enum ElementRef {
    Node(String),
    Edge(String),
}

impl ElementRef {
    pub fn label(&self) -> &str {
        match self {
            ElementRef::Node(l) | ElementRef::Edge(l) => l,
        }
    }
}

/// Per-element render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Classes {
    pub dimmed: bool,
    pub label_visible: bool,
    pub focused: bool,
    pub on_path: bool,
    /// Referenced by an edge but missing from the node list.
    pub dangling: bool,
    pub constant: bool,
}

impl Classes {
    /// CSS-style class names for renderers.
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.dimmed, "dimmed"),
            (self.label_visible, "label-visible"),
            (self.focused, "focused"),
            (self.on_path, "on-path"),
            (self.dangling, "dangling"),
            (self.constant, "constant"),
        ]
        .into_iter()
        .filter_map(|(on, name)| on.then_some(name))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewElement {
    pub id: ElementRef,
    pub position: Point,
    pub classes: Classes,
}

/// Which end of a hyperedge a link attaches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "end", rename_all = "lowercase")]
pub enum LinkEnd {
    Source { handle: String },
    Target,
}

/// A rendered connector: source node → edge, or edge → target node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewLink {
    pub edge: String,
    pub end: LinkEnd,
    pub from: ElementRef,
    pub to: ElementRef,
    pub dimmed: bool,
    pub on_path: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "label", rename_all = "camelCase")]
pub enum ViewMode {
    Overview,
    NodeFocus(String),
    EdgeFocus(String),
}

/// Everything a renderer needs for one frame of the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewSnapshot {
    pub mode: ViewMode,
    pub elements: Vec<ViewElement>,
    pub links: Vec<ViewLink>,
}

impl ViewSnapshot {
    pub fn element(&self, id: &ElementRef) -> Option<&ViewElement> {
        self.elements.iter().find(|e| &e.id == id)
    }

    pub fn position_of(&self, id: &ElementRef) -> Option<Point> {
        self.element(id).map(|e| e.position)
    }

    /// Elements that are not dimmed.
    pub fn visible(&self) -> impl Iterator<Item = &ViewElement> {
        self.elements.iter().filter(|e| !e.classes.dimmed)
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Compute the view for a snapshot, selection, and path annotation.
pub fn compute_view(
    graph: &Hypergraph,
    selection: Option<&Selection>,
    path: Option<&SimulationPath>,
    layout: &dyn LayoutStrategy,
) -> ViewSnapshot {
    let mut view = overview(graph, layout);

    match resolve_mode(graph, selection) {
        ViewMode::Overview => {}
        ViewMode::NodeFocus(label) => focus_node(&mut view, graph, &label),
        ViewMode::EdgeFocus(label) => focus_edge(&mut view, graph, &label),
    }

    if let Some(path) = path {
        overlay_path(&mut view, path);
    }
    view
}

/// Unresolvable selections fall back to the overview.
pub fn resolve_mode(graph: &Hypergraph, selection: Option<&Selection>) -> ViewMode {
    match selection {
        Some(Selection { kind: SelectionKind::Node, label }) if graph.has_node(label) => {
            ViewMode::NodeFocus(label.clone())
        }
        Some(Selection { kind: SelectionKind::Edge, label }) if graph.has_edge(label) => {
            ViewMode::EdgeFocus(label.clone())
        }
        _ => ViewMode::Overview,
    }
}

/// All elements, laid out by the strategy, no highlight state.
fn overview(graph: &Hypergraph, layout: &dyn LayoutStrategy) -> ViewSnapshot {
    let mut ids: Vec<ElementRef> = Vec::new();
    let mut classes: Vec<Classes> = Vec::new();
    let mut seen: HashSet<ElementRef> = HashSet::new();

    for node in &graph.nodes {
        let id = ElementRef::Node(node.label.clone());
        if seen.insert(id.clone()) {
            ids.push(id);
            classes.push(Classes { label_visible: true, constant: node.is_constant, ..Classes::default() });
        }
    }
    for label in graph.dangling_labels() {
        let id = ElementRef::Node(label.to_string());
        if seen.insert(id.clone()) {
            ids.push(id);
            classes.push(Classes { label_visible: true, dangling: true, ..Classes::default() });
        }
    }
    for edge in &graph.edges {
        let id = ElementRef::Edge(edge.label.clone());
        if seen.insert(id.clone()) {
            ids.push(id);
            classes.push(Classes::default());
        }
    }

    let mut links = Vec::new();
    let mut emitted: HashSet<&str> = HashSet::new();
    for edge in &graph.edges {
        // duplicate edge labels share one element; the first edge owns it
        if !emitted.insert(edge.label.as_str()) {
            continue;
        }
        links.extend(edge_links(edge));
    }

    let input = {
        let index: hashbrown::HashMap<&ElementRef, usize> =
            ids.iter().enumerate().map(|(i, id)| (id, i)).collect();
        LayoutInput {
            count: ids.len(),
            links: links
                .iter()
                .filter_map(|l: &ViewLink| Some((*index.get(&l.from)?, *index.get(&l.to)?)))
                .collect(),
        }
    };
    let mut positions = layout.place(&input);
    positions.resize(ids.len(), Point::ORIGIN);

    let elements = ids
        .into_iter()
        .zip(classes)
        .zip(positions)
        .map(|((id, classes), position)| ViewElement { id, position, classes })
        .collect();

    ViewSnapshot { mode: ViewMode::Overview, elements, links }
}

fn edge_links(edge: &Edge) -> Vec<ViewLink> {
    let edge_id = ElementRef::Edge(edge.label.clone());
    let mut out: Vec<ViewLink> = edge
        .sources
        .iter()
        .map(|s| ViewLink {
            edge: edge.label.clone(),
            end: LinkEnd::Source { handle: s.handle.clone() },
            from: ElementRef::Node(s.label.clone()),
            to: edge_id.clone(),
            dimmed: false,
            on_path: false,
        })
        .collect();
    if let Some(target) = edge.target() {
        out.push(ViewLink {
            edge: edge.label.clone(),
            end: LinkEnd::Target,
            from: edge_id,
            to: ElementRef::Node(target.to_string()),
            dimmed: false,
            on_path: false,
        });
    }
    out
}

/// Ordered, duplicate-free group of element ids.
fn group<I: IntoIterator<Item = ElementRef>>(items: I) -> Vec<ElementRef> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

/// Positions for focus columns. The first column to claim an element wins.
struct Placement {
    placed: hashbrown::HashMap<ElementRef, Point>,
}

impl Placement {
    fn new(center: ElementRef) -> Self {
        let mut placed = hashbrown::HashMap::new();
        placed.insert(center, Point::ORIGIN);
        Self { placed }
    }

    fn column(&mut self, members: &[ElementRef], units: f64) {
        let fresh: Vec<&ElementRef> = members.iter().filter(|m| !self.placed.contains_key(*m)).collect();
        let ys = layout::stack(fresh.len(), FOCUS_SPACING);
        for (id, y) in fresh.into_iter().zip(ys) {
            self.placed.insert(id.clone(), Point::new(units * FOCUS_UNIT, y));
        }
    }
}

fn focus_node(view: &mut ViewSnapshot, graph: &Hypergraph, label: &str) {
    let neighbors = graph.neighbors_of_node(label);
    let focus = ElementRef::Node(label.to_string());

    let leading = group(neighbors.leading.iter().map(|e| ElementRef::Edge(e.label.clone())));
    let trailing = group(neighbors.trailing.iter().map(|e| ElementRef::Edge(e.label.clone())));
    let sources = group(
        neighbors.leading.iter()
            .flat_map(|e| e.source_labels())
            .map(|l| ElementRef::Node(l.to_string())),
    );
    let targets = group(
        neighbors.trailing.iter()
            .filter_map(|e| e.target())
            .map(|l| ElementRef::Node(l.to_string())),
    );

    let mut placement = Placement::new(focus.clone());
    placement.column(&leading, -1.0);
    placement.column(&trailing, 1.0);
    placement.column(&sources, -2.0);
    placement.column(&targets, 2.0);

    let focus_edges: HashSet<&str> = leading.iter().chain(&trailing).map(ElementRef::label).collect();
    apply_focus(view, &focus, &placement, |link| focus_edges.contains(link.edge.as_str()));

    for el in &mut view.elements {
        if matches!(el.id, ElementRef::Edge(_)) && placement.placed.contains_key(&el.id) {
            el.classes.label_visible = true;
        }
    }
    view.mode = ViewMode::NodeFocus(label.to_string());
}

fn focus_edge(view: &mut ViewSnapshot, graph: &Hypergraph, label: &str) {
    let Some(edge) = graph.edge(label) else {
        return;
    };
    let focus = ElementRef::Edge(label.to_string());
    let sources = group(edge.source_labels().map(|l| ElementRef::Node(l.to_string())));
    let target: Vec<ElementRef> = edge.target().map(|t| ElementRef::Node(t.to_string())).into_iter().collect();

    let mut placement = Placement::new(focus.clone());
    placement.column(&sources, -1.0);
    placement.column(&target, 1.0);

    apply_focus(view, &focus, &placement, |link| link.edge == label);

    if let Some(el) = view.elements.iter_mut().find(|e| e.id == focus) {
        el.classes.label_visible = true;
    }
    view.mode = ViewMode::EdgeFocus(label.to_string());
}

/// Dim everything outside the placement and move the rest into place.
fn apply_focus<F>(view: &mut ViewSnapshot, focus: &ElementRef, placement: &Placement, link_in_focus: F)
where
    F: Fn(&ViewLink) -> bool,
{
    for el in &mut view.elements {
        match placement.placed.get(&el.id) {
            Some(p) => {
                el.position = *p;
                el.classes.focused = &el.id == focus;
            }
            None => el.classes.dimmed = true,
        }
    }
    for link in &mut view.links {
        let ends_visible = placement.placed.contains_key(&link.from) && placement.placed.contains_key(&link.to);
        link.dimmed = !(ends_visible && link_in_focus(link));
    }
}

/// Flag path members, then links whose two ends are both flagged.
fn overlay_path(view: &mut ViewSnapshot, path: &SimulationPath) {
    let mut on_path: HashSet<ElementRef> = HashSet::new();
    for el in &mut view.elements {
        el.classes.on_path = match &el.id {
            ElementRef::Node(l) => path.contains_node(l),
            ElementRef::Edge(l) => path.contains_edge(l),
        };
        if el.classes.on_path {
            on_path.insert(el.id.clone());
        }
    }
    for link in &mut view.links {
        link.on_path = on_path.contains(&link.from) && on_path.contains(&link.to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn graph() -> Hypergraph {
        schema::parse(r#"{
            "nodes": [
                {"label": "a"}, {"label": "b"}, {"label": "c"},
                {"label": "d"}, {"label": "x"}
            ],
            "edges": [
                {"label": "e1", "source_nodes": ["a", "b"], "target": "c"},
                {"label": "e2", "source_nodes": ["c"], "target": "d"},
                {"label": "e3", "source_nodes": ["x"], "target": "ghost"}
            ]
        }"#).unwrap()
    }

    fn node(l: &str) -> ElementRef { ElementRef::Node(l.into()) }
    fn edge(l: &str) -> ElementRef { ElementRef::Edge(l.into()) }

    #[test]
    fn test_overview_shows_everything() {
        let g = graph();
        let v = compute_view(&g, None, None, &GridLayout);
        assert_eq!(v.mode, ViewMode::Overview);
        assert_eq!(v.elements.len(), 9);
        assert!(v.elements.iter().all(|e| !e.classes.dimmed));
        assert!(v.element(&node("ghost")).unwrap().classes.dangling);
        assert!(!v.element(&edge("e1")).unwrap().classes.label_visible);
        assert_eq!(v.links.len(), 7);
    }

    #[test]
    fn test_overview_layout_sees_links() {
        let g = graph();
        let v = compute_view(&g, None, None, &BreadthFirstLayout);
        let x = |id: &ElementRef| v.position_of(id).map(|p| p.x);
        assert_eq!(x(&node("a")), Some(0.0));
        assert_eq!(x(&edge("e1")), Some(layout::SLOT_SPACING));
        assert_eq!(x(&node("c")), Some(2.0 * layout::SLOT_SPACING));
        assert_eq!(x(&node("d")), Some(4.0 * layout::SLOT_SPACING));
        assert_eq!(x(&node("ghost")), Some(2.0 * layout::SLOT_SPACING));
    }

    #[test]
    fn test_node_focus_columns() {
        let g = graph();
        let sel = Selection::node("c");
        let v = compute_view(&g, Some(&sel), None, &GridLayout);
        assert_eq!(v.mode, ViewMode::NodeFocus("c".into()));
        assert_eq!(v.position_of(&node("c")), Some(Point::ORIGIN));
        assert_eq!(v.position_of(&edge("e1")), Some(Point::new(-FOCUS_UNIT, 0.0)));
        assert_eq!(v.position_of(&node("a")), Some(Point::new(-2.0 * FOCUS_UNIT, -FOCUS_SPACING / 2.0)));
        assert_eq!(v.position_of(&node("b")), Some(Point::new(-2.0 * FOCUS_UNIT, FOCUS_SPACING / 2.0)));
        assert_eq!(v.position_of(&edge("e2")), Some(Point::new(FOCUS_UNIT, 0.0)));
        assert_eq!(v.position_of(&node("d")), Some(Point::new(2.0 * FOCUS_UNIT, 0.0)));

        assert!(v.element(&node("x")).unwrap().classes.dimmed);
        assert!(v.element(&edge("e3")).unwrap().classes.dimmed);
        assert!(v.element(&edge("e1")).unwrap().classes.label_visible);
        assert!(v.element(&node("c")).unwrap().classes.focused);
        assert_eq!(v.links.iter().filter(|l| !l.dimmed).count(), 5);
    }

    #[test]
    fn test_edge_focus_columns() {
        let g = graph();
        let sel = Selection::edge("e1");
        let v = compute_view(&g, Some(&sel), None, &GridLayout);
        assert_eq!(v.position_of(&edge("e1")), Some(Point::ORIGIN));
        assert_eq!(v.position_of(&node("a")).unwrap().x, -FOCUS_UNIT);
        assert_eq!(v.position_of(&node("c")), Some(Point::new(FOCUS_UNIT, 0.0)));
        assert!(v.element(&node("d")).unwrap().classes.dimmed);
        assert!(v.element(&edge("e1")).unwrap().classes.label_visible);
        assert_eq!(v.visible().count(), 4);
    }

    #[test]
    fn test_self_loop_placed_once() {
        let g = schema::parse(r#"{"nodes": [{"label": "n"}],
            "edges": [{"label": "loop", "source_nodes": ["n"], "target": "n"}]}"#).unwrap();
        let v = compute_view(&g, Some(&Selection::node("n")), None, &GridLayout);
        assert_eq!(v.position_of(&edge("loop")).unwrap().x, -FOCUS_UNIT);
        assert_eq!(v.position_of(&node("n")), Some(Point::ORIGIN));
    }

    #[test]
    fn test_unresolved_selection_is_overview() {
        let g = graph();
        let v = compute_view(&g, Some(&Selection::node("gone")), None, &GridLayout);
        assert_eq!(v.mode, ViewMode::Overview);
        let v = compute_view(&g, Some(&Selection::node("ghost")), None, &GridLayout);
        assert_eq!(v.mode, ViewMode::Overview);
    }

    #[test]
    fn test_path_overlay_links_need_both_ends() {
        let g = graph();
        let path = SimulationPath {
            nodes: vec!["a".into(), "c".into()],
            edges: vec!["e1".into()],
            ..SimulationPath::new("c")
        };
        let v = compute_view(&g, None, Some(&path), &GridLayout);
        assert!(v.element(&node("a")).unwrap().classes.on_path);
        assert!(!v.element(&node("b")).unwrap().classes.on_path);
        let on: Vec<_> = v.links.iter().filter(|l| l.on_path).map(|l| (&l.from, &l.to)).collect();
        assert_eq!(on, vec![(&node("a"), &edge("e1")), (&edge("e1"), &node("c"))]);
    }

    #[test]
    fn test_class_names() {
        let c = Classes { dimmed: true, on_path: true, ..Classes::default() };
        assert_eq!(c.names(), vec!["dimmed", "on-path"]);
    }
}
