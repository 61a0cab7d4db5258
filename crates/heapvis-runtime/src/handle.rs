use std::path::PathBuf;
use std::sync::Arc;

use heapvis_types::{ObjectRef, Point, Size, SnapshotDump, TrackedObject};
use tokio::sync::{Notify, mpsc};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::collab::Canvas;
use crate::state::AppState;
use crate::surface::ExportFormat;
use crate::view::{Frame, Scene, legend_layout};
use crate::{KeyPress, ScrollDirection, Signal, Snapshot, ViewKind};

/// Cloneable entry point to a running reactor.
///
/// Structural requests are queued as signals; input events mutate the
/// viewport directly and only queue a signal when they need a new snapshot.
#[derive(Clone)]
pub struct Handle {
    tx: mpsc::Sender<Signal>,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
}

impl Handle {
    pub(crate) fn new(tx: mpsc::Sender<Signal>, state: Arc<AppState>, shutdown: Arc<Notify>) -> Self {
        Self { tx, state, shutdown }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Queues `signal`, dropping it if the queue stays full for the
    /// configured timeout.
    async fn send(&self, signal: Signal) {
        let name = signal.name();
        match timeout(self.state.config.signal_timeout, self.tx.send(signal)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => debug!(signal = name, "reactor gone, signal dropped"),
            Err(_) => debug!(signal = name, "signal queue full, signal dropped"),
        }
    }

    // ── Structural requests ─────────────────────────────────────

    pub async fn register(&self, object: ObjectRef, label: impl Into<String>) {
        self.send(Signal::NewObject(TrackedObject::new(object, label)))
            .await;
    }

    pub async fn request_update(&self) {
        self.send(Signal::Update).await;
    }

    pub async fn clear(&self) {
        self.send(Signal::Clear).await;
    }

    pub async fn switch_view(&self) {
        self.send(Signal::SwitchView).await;
    }

    /// Positive deltas go back in time.
    pub async fn move_history(&self, delta: isize) {
        self.send(Signal::MoveHistory(delta)).await;
    }

    /// Exports the active view. The format comes from the extension; an
    /// unknown one, or one the surface backend cannot write, is rejected
    /// here and nothing is queued.
    pub async fn export_to(&self, path: impl Into<PathBuf>) -> Result<(), String> {
        let path = path.into();
        let format = ExportFormat::from_path(&path)?;
        if !self.state.backend.supports(format) {
            return Err(format!(
                "cannot export to {}: no {format} support in this surface backend",
                path.display()
            ));
        }
        self.send(Signal::Export(format, path)).await;
        Ok(())
    }

    /// Marks the reactor stopped. It resumes, and refreshes, at its next
    /// idle timeout.
    pub fn suspend(&self) {
        self.state.set_running(false);
        debug!("reactor suspended");
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    // ── Input ───────────────────────────────────────────────────

    /// Pans while a button is held, otherwise updates the hover highlight.
    pub fn pointer_moved(&self, at: Point, canvas: Size) {
        let (panned, view) = {
            let mut view = self.state.view_state.lock();
            (view.move_to(at), view.clone())
        };
        let repaint = panned
            || self
                .state
                .views
                .lock()
                .scene_mut(view.active)
                .hover(canvas, &view);
        if repaint {
            self.state.host.request_redraw(Canvas::Main);
        }
    }

    pub fn button_pressed(&self, at: Point) {
        self.state.view_state.lock().press(at);
    }

    /// Ends a press. A release without movement is a click: the object under
    /// the pointer is forced and a refresh is requested. Returns the clicked
    /// object.
    pub async fn button_released(&self, at: Point, canvas: Size) -> Option<ObjectRef> {
        let (click, view) = {
            let mut view = self.state.view_state.lock();
            (view.release(at), view.clone())
        };
        if !click {
            return None;
        }
        let object = self
            .state
            .views
            .lock()
            .scene(view.active)
            .click(canvas, &view)?;

        let provider = self.state.provider.clone();
        let target = object.clone();
        match tokio::task::spawn_blocking(move || provider.force(&target)).await {
            Ok(Ok(())) => debug!(?object, "forced"),
            Ok(Err(e)) => warn!(?object, "force failed: {e}"),
            Err(e) => warn!(?object, "force task failed: {e}"),
        }
        self.request_update().await;
        Some(object)
    }

    pub fn scrolled(&self, direction: ScrollDirection) {
        let anchor = self.state.config.zoom_anchor;
        self.state.view_state.lock().scroll(direction, anchor);
        self.state.host.request_redraw(Canvas::Main);
    }

    /// Returns whether the key was bound.
    pub fn key_pressed(&self, press: KeyPress) -> bool {
        let anchor = self.state.config.zoom_anchor;
        let changed = self.state.view_state.lock().key(press, anchor);
        if changed {
            self.state.host.request_redraw(Canvas::Main);
        }
        changed
    }

    /// Paints one canvas of `size`.
    pub fn redraw(&self, canvas: Canvas, size: Size) -> Frame {
        match canvas {
            Canvas::Main => {
                let view = self.state.view_state.lock().clone();
                self.state.views.lock().scene(view.active).redraw(size, &view)
            }
            Canvas::Legend => {
                let (current, cursor, len) = {
                    let history = self.state.history.lock();
                    (history.current(), history.cursor(), history.len())
                };
                let layout = legend_layout(
                    &current,
                    cursor,
                    len,
                    &self.state.config.font,
                    self.state.config.font_size,
                );
                Frame {
                    scale: 1.0,
                    offset: Point::ORIGIN,
                    size: layout.canvas,
                    items: layout.items,
                }
            }
        }
    }

    // ── Inspection ──────────────────────────────────────────────

    pub fn active_view(&self) -> ViewKind {
        self.state.view_state.lock().active
    }

    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.state.history.lock().current()
    }

    pub fn scene(&self, kind: ViewKind) -> Scene {
        self.state.scene(kind)
    }

    /// See [`AppState::dump`].
    pub fn dump(&self) -> SnapshotDump {
        self.state.dump()
    }
}
