//! Editing session: the reparse-on-every-edit loop.
//!
//! Holds the current document text and drives the [`ViewState`]. Every
//! text change is parsed in full; on success the snapshot is replaced
//! wholesale, on failure the last good snapshot stays in place.
//!
//! ```text
//! host text ─▶ on_text_changed ─▶ schema::parse ─▶ path invalidation ─▶ ViewState::set_data
//!                                      │
//!                                      └─ failure: keep model, report once per streak
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use hashbrown::HashSet;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::focus::{self, LayoutRegistry, ViewSnapshot};
use crate::model::{Diagnostic, Hypergraph, SimulateAffordance, SimulationPath};
use crate::mutation;
use crate::outline::{self, OutlineItem};
use crate::schema::{self, RawDocument};
use crate::simulation::{self, SimulationRequest, Solver};
use crate::state::{Selection, SelectionKind, ViewState, DEFAULT_LAYOUT};
use crate::{Error, Result};

/// Session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Initial overview layout name.
    pub layout: String,
    /// Where the host persists the document; the solver reads from here.
    pub document_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { layout: DEFAULT_LAYOUT.to_string(), document_path: None }
    }
}

/// Result of feeding new text to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReparseOutcome {
    Updated,
    /// The previous model is still active. `first_in_streak` is true only
    /// for the first failure after a success, so hosts report it once.
    Failed { message: String, first_in_streak: bool },
}

/// Removes a node from the in-flight set when the simulation ends.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    node: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.node);
    }
}

pub struct Session {
    config: SessionConfig,
    state: Arc<ViewState>,
    layouts: LayoutRegistry,
    text: Mutex<String>,
    last_error: Mutex<Option<String>>,
    in_flight: Mutex<HashSet<String>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_layouts(config, LayoutRegistry::with_builtins())
    }

    pub fn with_layouts(config: SessionConfig, layouts: LayoutRegistry) -> Self {
        let state = Arc::new(ViewState::new(config.layout.clone()));
        Self {
            config,
            state,
            layouts,
            text: Mutex::new(String::new()),
            last_error: Mutex::new(None),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn state(&self) -> &Arc<ViewState> {
        &self.state
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.layouts
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }

    pub fn model(&self) -> Arc<Hypergraph> {
        self.state.data()
    }

    /// Status line for the host: the current parse failure, if any.
    pub fn status(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    // ========================================================================
    // Reparse loop
    // ========================================================================

    /// Feed the host's current document text.
    pub fn on_text_changed(&self, text: impl Into<String>) -> ReparseOutcome {
        let text = text.into();
        let parsed = schema::parse(&text);
        *self.text.lock() = text;

        match parsed {
            Ok(graph) => {
                self.commit(graph, None);
                ReparseOutcome::Updated
            }
            Err(e) => {
                let message = e.to_string();
                let first_in_streak = self.last_error.lock().replace(message.clone()).is_none();
                if first_in_streak {
                    tracing::warn!(error = %message, "document does not parse, keeping last model");
                }
                ReparseOutcome::Failed { message, first_in_streak }
            }
        }
    }

    /// Install a freshly parsed snapshot. A stale path annotation is cleared
    /// before the data notification so no view sees it against the new model.
    fn commit(&self, graph: Hypergraph, path: Option<SimulationPath>) {
        *self.last_error.lock() = None;
        match path {
            Some(p) => self.state.set_simulation_path(Some(p)),
            None => {
                let stale = self
                    .state
                    .simulation_path()
                    .is_some_and(|p| !graph.has_node(&p.target_node));
                if stale {
                    tracing::debug!("simulation target removed, clearing path");
                    self.state.set_simulation_path(None);
                }
            }
        }
        tracing::debug!(nodes = graph.nodes.len(), edges = graph.edges.len(), "model rebuilt");
        self.state.set_data(Arc::new(graph));
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    pub fn view(&self) -> ViewSnapshot {
        let data = self.state.data();
        let selection = self.state.selection();
        let path = self.state.simulation_path();
        let layout = self.layouts.get(&self.state.layout());
        focus::compute_view(&data, selection.as_ref(), path.as_ref(), layout)
    }

    pub fn outline(&self) -> Vec<OutlineItem> {
        let data = self.state.data();
        let frame = self.state.current_frame();
        let path = self.state.simulation_path();
        outline::build(&data, frame.as_deref(), path.as_ref())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.state.data().diagnostics()
    }

    pub fn simulate_affordance(&self, node: &str) -> Option<SimulateAffordance> {
        let data = self.state.data();
        let frame = self.state.current_frame();
        let path = self.state.simulation_path();
        data.node(node)
            .map(|n| data.simulate_affordance(n, frame.as_deref(), path.as_ref()))
    }

    // ========================================================================
    // Edits
    // ========================================================================

    /// Run an edit against the current text and reparse the result.
    /// Returns the new text for the host to write back.
    pub fn apply<F>(&self, edit: F) -> Result<String>
    where
        F: FnOnce(&mut RawDocument) -> Result<()>,
    {
        self.apply_with_path(edit, None)
    }

    /// As [`Session::apply`], replacing the path annotation in the same commit.
    fn apply_with_path<F>(&self, edit: F, path: Option<SimulationPath>) -> Result<String>
    where
        F: FnOnce(&mut RawDocument) -> Result<()>,
    {
        let text = mutation::mutate(&self.text(), edit)?;
        let graph = schema::parse(&text)?;
        *self.text.lock() = text.clone();
        self.commit(graph, path);
        Ok(text)
    }

    /// Rename a node everywhere, selection and path annotation included.
    pub fn rename_node(&self, old: &str, new: &str) -> Result<String> {
        let path = self.state.simulation_path().and_then(|p| p.renamed_node(old, new));
        let text = self.apply_with_path(|doc| mutation::rename_node(doc, old, new).map(|_| ()), path)?;
        self.follow_rename(SelectionKind::Node, old, new);
        Ok(text)
    }

    pub fn rename_edge(&self, old: &str, new: &str) -> Result<String> {
        let path = self.state.simulation_path().and_then(|p| p.renamed_edge(old, new));
        let text = self.apply_with_path(|doc| mutation::rename_edge(doc, old, new), path)?;
        self.follow_rename(SelectionKind::Edge, old, new);
        Ok(text)
    }

    pub fn rename_frame(&self, old: &str, new: &str) -> Result<String> {
        let was_active = self.state.current_frame().as_deref() == Some(old);
        let text = self.apply(|doc| mutation::rename_frame(doc, old, new))?;
        if was_active {
            self.state.set_current_frame(Some(new.to_string()));
        }
        Ok(text)
    }

    /// Delete a node; edges keep their slots with the reference removed.
    pub fn delete_node(&self, label: &str) -> Result<String> {
        let text = self.apply(|doc| mutation::delete_node(doc, label))?;
        self.drop_selection(SelectionKind::Node, label);
        Ok(text)
    }

    pub fn delete_edge(&self, label: &str) -> Result<String> {
        let text = self.apply(|doc| mutation::delete_edge(doc, label))?;
        self.drop_selection(SelectionKind::Edge, label);
        Ok(text)
    }

    pub fn add_frame(&self, name: &str) -> Result<String> {
        self.apply(|doc| mutation::add_frame(doc, name))
    }

    pub fn duplicate_frame(&self, from: &str, new: &str) -> Result<String> {
        self.apply(|doc| mutation::duplicate_frame(doc, from, new))
    }

    /// The store moves to the first remaining frame if the active one goes.
    pub fn delete_frame(&self, name: &str) -> Result<String> {
        self.apply(|doc| mutation::delete_frame(doc, name))
    }

    fn follow_rename(&self, kind: SelectionKind, old: &str, new: &str) {
        if let Some(sel) = self.state.selection() {
            if sel.kind == kind && sel.label == old {
                self.state.set_selection(Some(Selection { kind, label: new.to_string() }));
            }
        }
    }

    fn drop_selection(&self, kind: SelectionKind, label: &str) {
        let hit = self
            .state
            .selection()
            .is_some_and(|sel| sel.kind == kind && sel.label == label);
        if hit {
            self.state.set_selection(None);
        }
    }

    // ========================================================================
    // Simulation
    // ========================================================================

    pub fn clear_simulation_path(&self) {
        self.state.set_simulation_path(None);
    }

    /// Ask the solver for a node's value, then write the value and the
    /// path annotation back together.
    ///
    /// A second request for a node that is still running is rejected;
    /// different nodes may run concurrently. The result is merged against
    /// the document as it is when the solver finishes.
    pub async fn simulate(&self, solver: &dyn Solver, node: &str) -> Result<SimulationPath> {
        let file_path = self.config.document_path.clone().ok_or_else(|| Error::Simulation {
            message: "document has no file path".into(),
            remediation: Some("save the document first".into()),
        })?;
        if !self.in_flight.lock().insert(node.to_string()) {
            return Err(Error::SimulationInProgress(node.to_string()));
        }
        let _guard = InFlight { set: &self.in_flight, node: node.to_string() };

        let request = SimulationRequest {
            file_path,
            node: node.to_string(),
            frame: self.state.current_frame().unwrap_or_default(),
        };
        let result = solver.simulate(&request).await?;

        let data = self.state.data();
        let frame = self.state.current_frame();
        let merged = simulation::merge(&self.text(), &data, frame.as_deref(), node, result)?;
        let graph = schema::parse(&merged.text)?;

        tracing::info!(node, value = %merged.value, "simulation merged");
        *self.text.lock() = merged.text;
        self.commit(graph, Some(merged.path.clone()));
        Ok(merged.path)
    }
}
