//! The signal reactor: sole consumer of [`Signal`]s and sole writer of the
//! registry, the history and the active view.

use std::sync::Arc;
use std::time::SystemTime;

use heapvis_graph::build_graph;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::collab::Canvas;
use crate::state::{AppState, Collaborators};
use crate::{Handle, RuntimeConfig, Signal, Snapshot, ViewKind};


/// Starts the reactor on the current tokio runtime.
///
/// The reactor exits after [`Handle::shutdown`] or once every handle has
/// been dropped.
pub fn start(config: RuntimeConfig, collaborators: Collaborators) -> (Handle, JoinHandle<()>) {
    let state = Arc::new(AppState::new(config, collaborators));
    let (tx, rx) = mpsc::channel(1);
    let shutdown = Arc::new(Notify::new());
    let reactor = Reactor {
        state: state.clone(),
        rx,
        tx: tx.downgrade(),
        shutdown: shutdown.clone(),
    };
    let task = tokio::spawn(reactor.run());
    (Handle::new(tx, state, shutdown), task)
}

struct Reactor {
    state: Arc<AppState>,
    rx: mpsc::Receiver<Signal>,
    /// Weak so that dropping the last handle closes the channel.
    tx: mpsc::WeakSender<Signal>,
    shutdown: Arc<Notify>,
}

impl Reactor {
    async fn run(mut self) {
        let wait = self.state.config.signal_timeout;
        info!(timeout_ms = wait.as_millis() as u64, "reactor started");
        loop {
            let received = tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("reactor shut down");
                    break;
                }
                received = timeout(wait, self.rx.recv()) => received,
            };
            match received {
                Ok(Some(signal)) => self.handle(signal).await,
                Ok(None) => {
                    info!("all handles dropped, reactor stopping");
                    break;
                }
                Err(_) => self.idle().await,
            }
        }
    }

    /// Receive timed out. A suspended reactor resumes and refreshes.
    async fn idle(&self) {
        if self.state.set_running(true) {
            return;
        }
        info!("reactor resumed");
        let Some(tx) = self.tx.upgrade() else {
            return;
        };
        let wait = self.state.config.signal_timeout;
        if timeout(wait, tx.send(Signal::Update)).await.is_err() {
            debug!(signal = "update", "queue full, resume refresh dropped");
        }
    }

    async fn handle(&self, signal: Signal) {
        debug!(signal = signal.name(), "handling signal");
        match signal {
            Signal::NewObject(tracked) => {
                let label = tracked.label.clone();
                if !self.state.registry.lock().insert(tracked) {
                    debug!(%label, "already tracked");
                }
                self.blocking(|state| rebuild(state, true)).await;
            }
            Signal::Clear => {
                self.state.registry.lock().clear();
                self.state.history.lock().clear();
                self.state.views.lock().clear();
                request_redraws(&self.state);
                info!("cleared");
            }
            Signal::Update => {
                self.blocking(|state| rebuild(state, false)).await;
            }
            Signal::SwitchView => self.switch_view().await,
            Signal::MoveHistory(delta) => {
                let cursor = {
                    let mut history = self.state.history.lock();
                    history.step(delta);
                    history.cursor()
                };
                debug!(delta, cursor, "moved through history");
                self.blocking(refresh_current).await;
            }
            Signal::Export(format, path) => {
                let shown = path.display().to_string();
                let result = self
                    .blocking(move |state| {
                        let active = state.view_state.lock().active;
                        let scene = state.views.lock().scene(active).clone();
                        scene.export(state.backend.as_ref(), format, &path)
                    })
                    .await;
                match result {
                    Some(Ok(())) => info!(path = %shown, %format, "exported"),
                    Some(Err(e)) => {
                        self.state.record_failed_export();
                        warn!(path = %shown, "export failed: {e}");
                    }
                    None => self.state.record_failed_export(),
                }
            }
        }
    }

    async fn switch_view(&self) {
        let target = self.state.view_state.lock().active.toggled();
        if target == ViewKind::Graph {
            let available = self.blocking(|state| state.engine.is_available()).await;
            if available != Some(true) {
                warn!(
                    program = %self.state.config.dot_program,
                    "layout engine unavailable, staying in list view"
                );
                return;
            }
        }
        self.state.view_state.lock().active = target;
        info!(view = ?target, "switched view");
        self.blocking(refresh_current).await;
    }

    /// Runs `work` on the blocking pool and waits for it. `None` if the
    /// task panicked.
    async fn blocking<T, F>(&self, work: F) -> Option<T>
    where
        F: FnOnce(&AppState) -> T + Send + 'static,
        T: Send + 'static,
    {
        let state = self.state.clone();
        match tokio::task::spawn_blocking(move || work(&state)).await {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("reactor work failed: {e}");
                None
            }
        }
    }
}

// ── Rebuild ─────────────────────────────────────────────────────

/// Takes a fresh snapshot of every tracked object and pushes it. With
/// `show_latest` the cursor jumps to it.
fn rebuild(state: &AppState, show_latest: bool) {
    state.provider.collect_hint();
    let tracked = state.registry.lock().tracked().to_vec();
    let roots: Vec<_> = tracked.iter().map(|t| t.object.clone()).collect();
    let heap = match state.provider.snapshot(&roots, state.config.traversal_depth) {
        Ok(heap) => heap,
        Err(e) => {
            warn!(roots = roots.len(), "snapshot failed: {e}");
            return;
        }
    };
    let graph = build_graph(&heap, &tracked);

    let current = {
        let mut history = state.history.lock();
        let snapshot = Snapshot {
            sequence: history.next_sequence(),
            captured_at: SystemTime::now(),
            graph,
            heap: Arc::new(heap),
            tracked,
        };
        debug!(
            sequence = snapshot.sequence,
            entries = snapshot.heap.len(),
            nodes = snapshot.graph.nodes.len(),
            "snapshot taken"
        );
        if show_latest {
            history.push_latest(snapshot);
        } else {
            history.push(snapshot);
        }
        history.current()
    };
    refresh_views(state, &current);
}

/// Re-derives the active view from the snapshot on display.
fn refresh_current(state: &AppState) {
    let current = state.history.lock().current();
    refresh_views(state, &current);
}

fn refresh_views(state: &AppState, snapshot: &Snapshot) {
    let active = state.view_state.lock().active;
    // Lay out on a copy so redraws keep painting the old drawables meanwhile.
    let mut views = state.views.lock().clone();
    views.update_objects(active, snapshot, &state.view_context());
    *state.views.lock() = views;
    request_redraws(state);
}

fn request_redraws(state: &AppState) {
    state.host.request_redraw(Canvas::Main);
    state.host.request_redraw(Canvas::Legend);
}
