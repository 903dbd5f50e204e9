//! Overview layouts: named, pluggable positioning strategies.
//!
//! The engine hands a strategy the element list and the links between them
//! and gets one position per element back. Strategies know nothing about
//! nodes, edges, or frames.

use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

// =============================================================================
// LAYOUT CONSTANTS
// =============================================================================

/// Distance between neighbouring slots in the built-in layouts.
pub const SLOT_SPACING: f64 = 120.0;

/// Ring capacity growth for the concentric layout.
const RING_GROWTH: usize = 6;

/// A position in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// What a strategy sees: `count` elements and directed links by index.
#[derive(Debug, Clone, Default)]
pub struct LayoutInput {
    pub count: usize,
    pub links: Vec<(usize, usize)>,
}

impl LayoutInput {
    fn degrees(&self) -> Vec<usize> {
        let mut deg = vec![0; self.count];
        for &(a, b) in &self.links {
            deg[a] += 1;
            deg[b] += 1;
        }
        deg
    }
}

/// A positioning algorithm. Must return exactly `input.count` points.
pub trait LayoutStrategy: Send + Sync {
    fn name(&self) -> &str;
    fn place(&self, input: &LayoutInput) -> Vec<Point>;
}

// =============================================================================
// BUILT-IN STRATEGIES
// =============================================================================

/// Row-major square grid.
pub struct GridLayout;

impl LayoutStrategy for GridLayout {
    fn name(&self) -> &str { "grid" }

    fn place(&self, input: &LayoutInput) -> Vec<Point> {
        let cols = (input.count as f64).sqrt().ceil().max(1.0) as usize;
        (0..input.count)
            .map(|i| Point::new((i % cols) as f64 * SLOT_SPACING, (i / cols) as f64 * SLOT_SPACING))
            .collect()
    }
}

/// Evenly spaced on one circle, starting at twelve o'clock.
pub struct CircleLayout;

impl LayoutStrategy for CircleLayout {
    fn name(&self) -> &str { "circle" }

    fn place(&self, input: &LayoutInput) -> Vec<Point> {
        let n = input.count;
        if n <= 1 {
            return vec![Point::ORIGIN; n];
        }
        let radius = (n as f64 * SLOT_SPACING / TAU).max(SLOT_SPACING);
        (0..n)
            .map(|i| {
                let a = i as f64 * TAU / n as f64;
                Point::new(radius * a.sin(), -radius * a.cos())
            })
            .collect()
    }
}

/// Rings by degree: the best-connected element in the middle.
pub struct ConcentricLayout;

impl LayoutStrategy for ConcentricLayout {
    fn name(&self) -> &str { "concentric" }

    fn place(&self, input: &LayoutInput) -> Vec<Point> {
        let deg = input.degrees();
        let mut order: Vec<usize> = (0..input.count).collect();
        // stable: equal degrees keep document order
        order.sort_by(|a, b| deg[*b].cmp(&deg[*a]));

        let mut out = vec![Point::ORIGIN; input.count];
        let mut ring = 0usize;
        let mut rest = order.as_slice();
        while !rest.is_empty() {
            let capacity = if ring == 0 { 1 } else { ring * RING_GROWTH };
            let (members, tail) = rest.split_at(capacity.min(rest.len()));
            let radius = ring as f64 * SLOT_SPACING;
            for (k, &idx) in members.iter().enumerate() {
                let a = k as f64 * TAU / members.len() as f64;
                out[idx] = Point::new(radius * a.sin(), -radius * a.cos());
            }
            rest = tail;
            ring += 1;
        }
        out
    }
}

/// Left-to-right levels from elements with no incoming link.
pub struct BreadthFirstLayout;

impl LayoutStrategy for BreadthFirstLayout {
    fn name(&self) -> &str { "breadthfirst" }

    fn place(&self, input: &LayoutInput) -> Vec<Point> {
        let n = input.count;
        let mut succ = vec![Vec::new(); n];
        let mut has_incoming = vec![false; n];
        for &(a, b) in &input.links {
            succ[a].push(b);
            has_incoming[b] = true;
        }

        let mut depth: Vec<Option<usize>> = vec![None; n];
        let roots = (0..n).filter(|&i| !has_incoming[i]);
        // cycles without a root start from their first element
        let fallback = 0..n;
        for start in roots.chain(fallback) {
            if depth[start].is_some() {
                continue;
            }
            depth[start] = Some(0);
            let mut queue = VecDeque::from([start]);
            while let Some(cur) = queue.pop_front() {
                let d = depth[cur].unwrap_or(0);
                for &next in &succ[cur] {
                    if depth[next].is_none() {
                        depth[next] = Some(d + 1);
                        queue.push_back(next);
                    }
                }
            }
        }

        let levels = depth.iter().map(|d| d.unwrap_or(0)).collect::<Vec<_>>();
        let max_level = levels.iter().copied().max().unwrap_or(0);
        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); max_level + 1];
        for (i, &l) in levels.iter().enumerate() {
            columns[l].push(i);
        }

        let mut out = vec![Point::ORIGIN; n];
        for (level, members) in columns.iter().enumerate() {
            let ys = stack(members.len(), SLOT_SPACING);
            for (&idx, y) in members.iter().zip(ys) {
                out[idx] = Point::new(level as f64 * SLOT_SPACING, y);
            }
        }
        out
    }
}

/// `count` offsets centered on zero, `spacing` apart.
pub fn stack(count: usize, spacing: f64) -> impl Iterator<Item = f64> {
    let mid = (count as f64 - 1.0) / 2.0;
    (0..count).map(move |i| (i as f64 - mid) * spacing)
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Strategies by name. Unknown names fall back to the grid.
#[derive(Clone)]
pub struct LayoutRegistry {
    strategies: HashMap<String, Arc<dyn LayoutStrategy>>,
    fallback: Arc<dyn LayoutStrategy>,
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl LayoutRegistry {
    pub fn with_builtins() -> Self {
        let mut reg = Self {
            strategies: HashMap::new(),
            fallback: Arc::new(GridLayout),
        };
        reg.register(GridLayout);
        reg.register(CircleLayout);
        reg.register(ConcentricLayout);
        reg.register(BreadthFirstLayout);
        reg
    }

    pub fn register<L: LayoutStrategy + 'static>(&mut self, strategy: L) {
        self.strategies.insert(strategy.name().to_string(), Arc::new(strategy));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn get(&self, name: &str) -> &dyn LayoutStrategy {
        match self.strategies.get(name) {
            Some(s) => s.as_ref(),
            None => {
                tracing::warn!(layout = name, "unknown layout, using grid");
                self.fallback.as_ref()
            }
        }
    }
}
