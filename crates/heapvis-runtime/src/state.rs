use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use heapvis_graph::prune;
use heapvis_layout::{DotStyle, LayoutEngine};
use heapvis_types::{BoundsDump, GraphDump, SnapshotDump};
use parking_lot::Mutex;

use crate::collab::{Host, SnapshotProvider};
use crate::surface::SurfaceBackend;
use crate::view::{Scene, ViewContext, ViewKind, Views};
use crate::{History, Registry, RuntimeConfig, ViewState};

/// The external collaborators the runtime is wired to.
#[derive(Clone)]
pub struct Collaborators {
    pub provider: Arc<dyn SnapshotProvider>,
    pub engine: Arc<dyn LayoutEngine>,
    pub host: Arc<dyn Host>,
    pub backend: Arc<dyn SurfaceBackend>,
}

/// Everything shared between the reactor and the input side.
///
/// Each cell has its own lock and no code path holds two of them at once.
pub struct AppState {
    pub config: RuntimeConfig,
    pub style: DotStyle,
    pub registry: Mutex<Registry>,
    pub history: Mutex<History>,
    pub view_state: Mutex<ViewState>,
    pub views: Mutex<Views>,
    running: AtomicBool,
    failed_exports: AtomicUsize,
    pub provider: Arc<dyn SnapshotProvider>,
    pub engine: Arc<dyn LayoutEngine>,
    pub host: Arc<dyn Host>,
    pub backend: Arc<dyn SurfaceBackend>,
}

impl AppState {
    pub fn new(config: RuntimeConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            provider,
            engine,
            host,
            backend,
        } = collaborators;
        Self {
            style: config.dot_style(),
            history: Mutex::new(History::new(config.history_limit)),
            config,
            registry: Mutex::new(Registry::default()),
            view_state: Mutex::new(ViewState::default()),
            views: Mutex::new(Views::default()),
            running: AtomicBool::new(true),
            failed_exports: AtomicUsize::new(0),
            provider,
            engine,
            host,
            backend,
        }
    }

    pub fn view_context(&self) -> ViewContext<'_> {
        ViewContext {
            engine: self.engine.as_ref(),
            style: &self.style,
            retention: self.config.root_retention,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub(crate) fn set_running(&self, running: bool) -> bool {
        self.running.swap(running, Ordering::AcqRel)
    }

    /// Exports queued through a handle that the reactor could not complete.
    pub fn failed_exports(&self) -> usize {
        self.failed_exports.load(Ordering::Acquire)
    }

    pub(crate) fn record_failed_export(&self) {
        self.failed_exports.fetch_add(1, Ordering::AcqRel);
    }

    pub fn scene(&self, kind: ViewKind) -> Scene {
        self.views.lock().scene(kind).clone()
    }

    /// The snapshot on display, its pruned graph and the active view's
    /// drawables.
    pub fn dump(&self) -> SnapshotDump {
        let snapshot = self.history.lock().current();
        let active = self.view_state.lock().active;
        let scene = self.scene(active);
        let layout = scene.layout();
        let pruned = prune(&snapshot.graph, self.config.root_retention);
        SnapshotDump {
            sequence: snapshot.sequence,
            captured_at_ms: snapshot.captured_at_ms(),
            graph: GraphDump::from(&snapshot.graph),
            pruned: GraphDump::from(&pruned),
            canvas: (!layout.canvas.is_empty()).then_some(layout.canvas),
            bounds: layout
                .bounds
                .iter()
                .map(|(id, rect)| BoundsDump { id: *id, rect: *rect })
                .collect(),
            ops: layout.items.clone(),
        }
    }
}
