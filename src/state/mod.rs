//! Selection and view state.
//!
//! A single-writer store with five observable fields. Every setter is
//! synchronous and notifies once; there is no batching. Observers run after
//! the state lock is released and may read the store (or write to it) from
//! inside their callback.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::model::{Hypergraph, SimulationPath};

pub const DEFAULT_LAYOUT: &str = "grid";

/// What is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionKind {
    Node,
    Edge,
    Path,
}

/// A selection is held by label, so it survives a full reparse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub kind: SelectionKind,
    pub label: String,
}

impl Selection {
    pub fn node(label: impl Into<String>) -> Self {
        Self { kind: SelectionKind::Node, label: label.into() }
    }

    pub fn edge(label: impl Into<String>) -> Self {
        Self { kind: SelectionKind::Edge, label: label.into() }
    }

    pub fn path(target: impl Into<String>) -> Self {
        Self { kind: SelectionKind::Path, label: target.into() }
    }
}

/// Observable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Data,
    Selection,
    /// Explicit frame changes only. When [`ViewState::set_data`] moves the
    /// active frame, only the `Data` event fires, with `frame_changed` set.
    Frame,
    Layout,
    SimulationPath,
}

/// Change notification. Carries the new value of the field.
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// A new snapshot. `frame_changed` is set when the active frame was
    /// re-defaulted as part of the same call.
    Data { frame_changed: bool },
    Selection(Option<Selection>),
    Frame(Option<String>),
    Layout(String),
    SimulationPath(Option<SimulationPath>),
}

impl StateEvent {
    pub fn field(&self) -> Field {
        match self {
            StateEvent::Data { .. } => Field::Data,
            StateEvent::Selection(_) => Field::Selection,
            StateEvent::Frame(_) => Field::Frame,
            StateEvent::Layout(_) => Field::Layout,
            StateEvent::SimulationPath(_) => Field::SimulationPath,
        }
    }
}

/// Handle returned by [`ViewState::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

type Callback = Arc<dyn Fn(&StateEvent) + Send + Sync>;

struct Observer {
    id: SubscriptionId,
    field: Field,
    callback: Callback,
}

struct Inner {
    data: Arc<Hypergraph>,
    selection: Option<Selection>,
    frame: Option<String>,
    layout: String,
    path: Option<SimulationPath>,
}

/// The single source of truth for rendering consumers.
pub struct ViewState {
    inner: Mutex<Inner>,
    observers: RwLock<Vec<Observer>>,
    next_id: AtomicU64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_LAYOUT)
    }
}

impl ViewState {
    pub fn new(layout: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                data: Arc::new(Hypergraph::default()),
                selection: None,
                frame: None,
                layout: layout.into(),
                path: None,
            }),
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub fn subscribe<F>(&self, field: Field, callback: F) -> SubscriptionId
    where
        F: Fn(&StateEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push(Observer { id, field, callback: Arc::new(callback) });
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| o.id != id);
        observers.len() != before
    }

    /// A panicking observer is logged and skipped; the rest still run.
    fn notify(&self, event: StateEvent) {
        let field = event.field();
        let targets: Vec<(SubscriptionId, Callback)> = self
            .observers
            .read()
            .iter()
            .filter(|o| o.field == field)
            .map(|o| (o.id, o.callback.clone()))
            .collect();
        for (id, callback) in targets {
            if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                tracing::error!(subscription = id.0, ?field, "state observer panicked");
            }
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn data(&self) -> Arc<Hypergraph> {
        self.inner.lock().data.clone()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.inner.lock().selection.clone()
    }

    pub fn current_frame(&self) -> Option<String> {
        self.inner.lock().frame.clone()
    }

    pub fn layout(&self) -> String {
        self.inner.lock().layout.clone()
    }

    pub fn simulation_path(&self) -> Option<SimulationPath> {
        self.inner.lock().path.clone()
    }

    // ========================================================================
    // Setters
    // ========================================================================

    /// Replace the snapshot. Keeps the active frame if it still exists,
    /// otherwise selects the first frame, or none when there are no frames.
    pub fn set_data(&self, data: Arc<Hypergraph>) {
        let frame_changed = {
            let mut inner = self.inner.lock();
            let keep = inner
                .frame
                .as_deref()
                .is_some_and(|f| data.frame(f).is_some());
            let next = if keep {
                inner.frame.clone()
            } else {
                data.frame_names().first().cloned()
            };
            let changed = next != inner.frame;
            inner.frame = next;
            inner.data = data;
            changed
        };
        self.notify(StateEvent::Data { frame_changed });
    }

    pub fn set_selection(&self, selection: Option<Selection>) {
        self.inner.lock().selection = selection.clone();
        self.notify(StateEvent::Selection(selection));
    }

    pub fn set_current_frame(&self, frame: Option<String>) {
        self.inner.lock().frame = frame.clone();
        self.notify(StateEvent::Frame(frame));
    }

    pub fn set_layout(&self, layout: impl Into<String>) {
        let layout = layout.into();
        self.inner.lock().layout = layout.clone();
        self.notify(StateEvent::Layout(layout));
    }

    pub fn set_simulation_path(&self, path: Option<SimulationPath>) {
        self.inner.lock().path = path.clone();
        self.notify(StateEvent::SimulationPath(path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use std::sync::atomic::AtomicUsize;

    fn graph(text: &str) -> Arc<Hypergraph> {
        Arc::new(schema::parse(text).unwrap())
    }

    #[test]
    fn test_frame_defaults_to_first() {
        let state = ViewState::default();
        state.set_data(graph(r#"{"frames": {"b": {}, "a": {}}}"#));
        assert_eq!(state.current_frame().as_deref(), Some("b"));

        state.set_current_frame(Some("a".into()));
        state.set_data(graph(r#"{"frames": {"b": {}, "a": {}, "c": {}}}"#));
        assert_eq!(state.current_frame().as_deref(), Some("a"));

        state.set_data(graph(r#"{"frames": {"c": {}}}"#));
        assert_eq!(state.current_frame().as_deref(), Some("c"));

        state.set_data(graph("{}"));
        assert_eq!(state.current_frame(), None);
    }

    #[test]
    fn test_frame_reset_reported_on_data() {
        let state = ViewState::default();
        state.set_data(graph(r#"{"frames": {"f0": {}}}"#));

        let frame_hits = Arc::new(AtomicUsize::new(0));
        let h = frame_hits.clone();
        state.subscribe(Field::Frame, move |_| { h.fetch_add(1, Ordering::SeqCst); });
        let flags = Arc::new(Mutex::new(Vec::new()));
        let f = flags.clone();
        state.subscribe(Field::Data, move |event| {
            if let StateEvent::Data { frame_changed } = event {
                f.lock().push(*frame_changed);
            }
        });

        state.set_data(graph(r#"{"frames": {"f0": {}}}"#));
        state.set_data(graph(r#"{"frames": {"f1": {}}}"#));
        assert_eq!(*flags.lock(), vec![false, true]);
        assert_eq!(frame_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_one_notification_per_setter() {
        let state = ViewState::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        state.subscribe(Field::Selection, move |_| { h.fetch_add(1, Ordering::SeqCst); });

        state.set_selection(Some(Selection::node("a")));
        state.set_selection(Some(Selection::node("a")));
        state.set_layout("circle");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_observer_does_not_block_others() {
        let state = ViewState::default();
        let hits = Arc::new(AtomicUsize::new(0));
        state.subscribe(Field::Layout, |_| panic!("observer failure"));
        let h = hits.clone();
        state.subscribe(Field::Layout, move |_| { h.fetch_add(1, Ordering::SeqCst); });
        state.set_layout("circle");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(state.layout(), "circle");
    }

    #[test]
    fn test_observer_can_read_store() {
        let state = Arc::new(ViewState::default());
        let seen = Arc::new(Mutex::new(None));
        let (s, out) = (Arc::downgrade(&state), seen.clone());
        state.subscribe(Field::Frame, move |_| {
            if let Some(s) = s.upgrade() {
                *out.lock() = s.current_frame();
            }
        });
        state.set_current_frame(Some("f1".into()));
        assert_eq!(seen.lock().as_deref(), Some("f1"));
    }

    #[test]
    fn test_unsubscribe() {
        let state = ViewState::default();
        let id = state.subscribe(Field::Data, |_| {});
        assert!(state.unsubscribe(id));
        assert!(!state.unsubscribe(id));
    }
}
