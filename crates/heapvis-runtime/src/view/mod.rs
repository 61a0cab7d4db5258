//! The two interchangeable views of a snapshot.
//!
//! Both views reduce a snapshot to a [`Layout`] (drawing operations plus
//! clickable boxes) held in a [`Scene`]; what differs is how they get there.
//! The graph view goes through the layout engine, the list view writes
//! terms line by line.

mod graph;
mod legend;
mod list;
mod text;

use std::path::Path;

use heapvis_graph::RootRetention;
use heapvis_layout::{DotStyle, Layout, LayoutEngine};
use heapvis_types::{Color, DrawItem, DrawOp, NodeId, ObjectRef, Point, Size};

use crate::surface::{ExportFormat, SurfaceBackend, with_surface};
use crate::{Snapshot, ViewState};

pub use graph::GraphView;
pub use legend::legend_layout;
pub use list::ListView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewKind {
    #[default]
    List,
    Graph,
}

impl ViewKind {
    pub fn toggled(self) -> Self {
        match self {
            ViewKind::List => ViewKind::Graph,
            ViewKind::Graph => ViewKind::List,
        }
    }
}

/// What a view needs from the runtime to rebuild its drawables.
pub struct ViewContext<'a> {
    pub engine: &'a dyn LayoutEngine,
    pub style: &'a DotStyle,
    pub retention: RootRetention,
}

/// One paint of a canvas: operations in content coordinates plus the
/// transform that maps them onto the canvas (`screen = content * scale + offset`).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub scale: f64,
    pub offset: Point,
    pub size: Size,
    pub items: Vec<DrawItem>,
}

impl Frame {
    pub fn to_screen(&self, p: Point) -> Point {
        p * self.scale + self.offset
    }
}

// ── Scene ───────────────────────────────────────────────────────

/// Drawables of one view plus its hover state.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    layout: Layout,
    hover: Option<NodeId>,
    /// Scale the content to fit the canvas before applying the zoom.
    fit: bool,
}

impl Scene {
    fn new(fit: bool) -> Self {
        Self {
            fit,
            ..Self::default()
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hover
    }

    pub(crate) fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        self.hover = None;
    }

    fn transform(&self, canvas: Size, view: &ViewState) -> (f64, Point) {
        let content = self.layout.canvas;
        let fit = if self.fit && !content.is_empty() && !canvas.is_empty() {
            (canvas.width / content.width).min(canvas.height / content.height)
        } else {
            1.0
        };
        (fit * view.zoom, view.pan)
    }

    fn to_content(&self, canvas: Size, view: &ViewState, p: Point) -> Point {
        let (scale, offset) = self.transform(canvas, view);
        (p - offset) * (1.0 / scale)
    }

    pub fn redraw(&self, canvas: Size, view: &ViewState) -> Frame {
        let (scale, offset) = self.transform(canvas, view);
        Frame {
            scale,
            offset,
            size: self.layout.canvas,
            items: highlight(&self.layout.items, self.hover),
        }
    }

    /// Object under the last pointer position, if any.
    pub fn click(&self, canvas: Size, view: &ViewState) -> Option<ObjectRef> {
        let at = self.to_content(canvas, view, view.pointer);
        self.layout.hit(at).map(|b| b.object.clone())
    }

    /// Updates the hovered node. Returns whether it changed.
    pub fn hover(&mut self, canvas: Size, view: &ViewState) -> bool {
        let at = self.to_content(canvas, view, view.pointer);
        let node = self
            .layout
            .hit(at)
            .map(|b| b.node)
            .or_else(|| self.layout.node_at(at));
        let changed = node != self.hover;
        self.hover = node;
        changed
    }

    /// Replays the drawables, unzoomed, onto a surface the size of the content.
    pub fn export(
        &self,
        backend: &dyn SurfaceBackend,
        format: ExportFormat,
        path: &Path,
    ) -> Result<(), String> {
        with_surface(backend, format, path, self.layout.canvas, |surface| {
            for item in &self.layout.items {
                surface.draw(&item.op)?;
            }
            Ok(())
        })
        .map_err(|e| format!("export {}: {e}", path.display()))
    }
}

/// Repaints the operations owned by `hover` with the highlight colour,
/// restoring the previous pen and fill afterwards.
fn highlight(items: &[DrawItem], hover: Option<NodeId>) -> Vec<DrawItem> {
    let Some(hover) = hover else {
        return items.to_vec();
    };
    let fill = Color::rgba(
        Color::HIGHLIGHT.r,
        Color::HIGHLIGHT.g,
        Color::HIGHLIGHT.b,
        0x40,
    );
    let mut out = Vec::with_capacity(items.len() + 4);
    let mut pen = Color::BLACK;
    let mut brush = Color::TRANSPARENT;
    let mut inside = false;

    for item in items {
        let owned = item.owner == Some(hover);
        if owned && !inside {
            out.push(DrawItem::new(
                Some(hover),
                DrawOp::PenColor {
                    color: Color::HIGHLIGHT,
                },
            ));
            inside = true;
        } else if !owned && inside {
            out.push(DrawItem::new(None, DrawOp::PenColor { color: pen }));
            out.push(DrawItem::new(None, DrawOp::FillColor { color: brush }));
            inside = false;
        }

        match &item.op {
            DrawOp::PenColor { .. } if owned => continue,
            DrawOp::FillColor { color } if owned => {
                if !color.is_transparent() {
                    out.push(DrawItem::new(item.owner, DrawOp::FillColor { color: fill }));
                    continue;
                }
            }
            DrawOp::PenColor { color } => pen = *color,
            DrawOp::FillColor { color } => brush = *color,
            _ => {}
        }
        out.push(item.clone());
    }
    out
}

// ── Views ───────────────────────────────────────────────────────

/// Both views, dispatched on [`ViewKind`].
#[derive(Debug, Clone)]
pub struct Views {
    pub list: ListView,
    pub graph: GraphView,
}

impl Default for Views {
    fn default() -> Self {
        Self {
            list: ListView::new(),
            graph: GraphView::new(),
        }
    }
}

impl Views {
    pub fn scene(&self, kind: ViewKind) -> &Scene {
        match kind {
            ViewKind::List => &self.list.scene,
            ViewKind::Graph => &self.graph.scene,
        }
    }

    pub fn scene_mut(&mut self, kind: ViewKind) -> &mut Scene {
        match kind {
            ViewKind::List => &mut self.list.scene,
            ViewKind::Graph => &mut self.graph.scene,
        }
    }

    pub fn update_objects(&mut self, kind: ViewKind, snapshot: &Snapshot, ctx: &ViewContext<'_>) {
        match kind {
            ViewKind::List => self.list.update_objects(snapshot, ctx),
            ViewKind::Graph => self.graph.update_objects(snapshot, ctx),
        }
    }

    pub fn clear(&mut self) {
        self.list.scene.set_layout(Layout::default());
        self.graph.scene.set_layout(Layout::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapvis_layout::ClickBox;
    use heapvis_types::Rect;
    use std::sync::Arc;

    fn scene_with_box(object: &Arc<u8>, fit: bool) -> Scene {
        let mut scene = Scene::new(fit);
        scene.set_layout(Layout {
            items: vec![
                DrawItem::new(None, DrawOp::PenColor { color: Color::BLACK }),
                DrawItem::new(Some(0), DrawOp::PenColor { color: Color::BLACK }),
                DrawItem::new(Some(0), DrawOp::FillColor { color: Color::WHITE }),
                DrawItem::new(
                    Some(0),
                    DrawOp::Polygon {
                        filled: true,
                        points: Rect::new(0.0, 0.0, 10.0, 10.0).corners().to_vec(),
                    },
                ),
                DrawItem::new(
                    None,
                    DrawOp::Polyline {
                        points: vec![Point::new(10.0, 5.0), Point::new(20.0, 5.0)],
                    },
                ),
            ],
            boxes: vec![ClickBox {
                object: ObjectRef::new(object),
                node: 0,
                rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            }],
            bounds: [(0, Rect::new(0.0, 0.0, 10.0, 10.0))].into_iter().collect(),
            canvas: Size::new(20.0, 10.0),
        });
        scene
    }

    #[test]
    fn fit_scale_times_zoom_and_pan_offset() {
        let value = Arc::new(0u8);
        let scene = scene_with_box(&value, true);
        let view = ViewState {
            zoom: 2.0,
            pan: Point::new(3.0, 4.0),
            ..ViewState::default()
        };
        let frame = scene.redraw(Size::new(200.0, 50.0), &view);
        // min(200/20, 50/10) = 5, times zoom 2.
        assert_eq!(frame.scale, 10.0);
        assert_eq!(frame.offset, Point::new(3.0, 4.0));
        assert_eq!(frame.to_screen(Point::new(1.0, 1.0)), Point::new(13.0, 14.0));

        let unfitted = scene_with_box(&value, false);
        assert_eq!(unfitted.redraw(Size::new(200.0, 50.0), &view).scale, 2.0);
    }

    #[test]
    fn click_maps_pointer_back_to_content() {
        let value = Arc::new(0u8);
        let scene = scene_with_box(&value, true);
        let mut view = ViewState {
            pointer: Point::new(25.0, 25.0),
            ..ViewState::default()
        };
        // Scale 5: (25,25) is content (5,5), inside the box.
        assert_eq!(
            scene.click(Size::new(100.0, 50.0), &view),
            Some(ObjectRef::new(&value))
        );
        view.pointer = Point::new(75.0, 25.0);
        assert_eq!(scene.click(Size::new(100.0, 50.0), &view), None);
    }

    #[test]
    fn hover_recolours_owned_ops_only() {
        let value = Arc::new(0u8);
        let mut scene = scene_with_box(&value, false);
        let view = ViewState {
            pointer: Point::new(5.0, 5.0),
            ..ViewState::default()
        };
        assert!(scene.hover(Size::new(20.0, 10.0), &view));
        assert!(!scene.hover(Size::new(20.0, 10.0), &view));
        assert_eq!(scene.hovered(), Some(0));

        let frame = scene.redraw(Size::new(20.0, 10.0), &view);
        let pens: Vec<_> = frame
            .items
            .iter()
            .filter_map(|item| match item.op {
                DrawOp::PenColor { color } => Some(color),
                _ => None,
            })
            .collect();
        assert_eq!(pens, vec![Color::BLACK, Color::HIGHLIGHT, Color::BLACK]);
        assert!(frame.items.iter().any(|item| matches!(
            item.op,
            DrawOp::FillColor { color } if color.r == Color::HIGHLIGHT.r && color.a == 0x40
        )));
        // The edge after the node is painted with the restored pen.
        assert!(matches!(
            frame.items.last().map(|item| &item.op),
            Some(DrawOp::Polyline { .. })
        ));
    }

    #[test]
    fn toggling_views() {
        assert_eq!(ViewKind::List.toggled(), ViewKind::Graph);
        assert_eq!(ViewKind::Graph.toggled().toggled(), ViewKind::Graph);
        assert_eq!(ViewKind::default(), ViewKind::List);
    }
}
