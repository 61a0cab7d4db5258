use heapvis_graph::prune;
use heapvis_layout::{Layout, layout_graph};
use tracing::{debug, warn};

use super::{Scene, ViewContext};
use crate::Snapshot;

/// The pruned reference graph, laid out by the layout engine and scaled to
/// fit the canvas.
#[derive(Debug, Clone)]
pub struct GraphView {
    pub(super) scene: Scene,
}

impl GraphView {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(true),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Prunes and lays out the snapshot's graph. A layout failure keeps the
    /// previous drawables.
    pub fn update_objects(&mut self, snapshot: &Snapshot, ctx: &ViewContext<'_>) {
        let pruned = prune(&snapshot.graph, ctx.retention);
        if pruned.is_empty() {
            debug!(sequence = snapshot.sequence, "nothing reachable, graph view cleared");
            self.scene.set_layout(Layout::default());
            return;
        }
        match layout_graph(ctx.engine, &pruned, &snapshot.heap, ctx.style) {
            Ok(layout) => {
                debug!(
                    sequence = snapshot.sequence,
                    nodes = pruned.nodes.len(),
                    ops = layout.items.len(),
                    "graph view laid out"
                );
                self.scene.set_layout(layout);
            }
            Err(e) => warn!(sequence = snapshot.sequence, "graph layout failed: {e}"),
        }
    }
}

impl Default for GraphView {
    fn default() -> Self {
        Self::new()
    }
}
