use std::collections::BTreeMap;

use heapvis_types::{
    DrawItem, EntryId, Graph, HeapSnapshot, NodeId, ObjectRef, Point, Rect, Size, is_name_node,
};
use tracing::debug;

use crate::xdot::{Attrs, Statement, parse_floats};
use crate::{DotStyle, LayoutEngine, LayoutError, parse_ops, parse_xdot, to_dot};

/// Attributes that carry drawing operations, in paint order.
const DRAW_ATTRS: [&str; 6] = ["_draw_", "_ldraw_", "_hdraw_", "_tdraw_", "_hldraw_", "_tldraw_"];

const POINTS_PER_INCH: f64 = 72.0;

/// A region that resolves a click to the object drawn there.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickBox {
    pub object: ObjectRef,
    pub node: NodeId,
    pub rect: Rect,
}

/// Everything the graph view needs to paint and hit-test one snapshot.
/// Coordinates use a top-left origin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub items: Vec<DrawItem>,
    pub boxes: Vec<ClickBox>,
    pub bounds: BTreeMap<NodeId, Rect>,
    pub canvas: Size,
}

impl Layout {
    /// The topmost clickable box containing `point`.
    pub fn hit(&self, point: Point) -> Option<&ClickBox> {
        self.boxes.iter().rev().find(|b| b.rect.contains(point))
    }

    /// The entry node whose bounds contain `point`.
    pub fn node_at(&self, point: Point) -> Option<NodeId> {
        self.bounds
            .iter()
            .rev()
            .find(|(id, rect)| !is_name_node(**id) && rect.contains(point))
            .map(|(id, _)| *id)
    }
}

/// Lay out a pruned graph with `engine`.
///
/// `heap` is the unpruned snapshot the graph came from; it supplies the
/// object handles behind the clickable boxes.
pub fn layout_graph(
    engine: &dyn LayoutEngine,
    graph: &Graph,
    heap: &HeapSnapshot,
    style: &DotStyle,
) -> Result<Layout, LayoutError> {
    let dot = to_dot(graph, style);
    let xdot = engine.layout(&dot)?;
    let layout = from_xdot(&xdot, heap)?;
    debug!(
        nodes = graph.nodes.len(),
        ops = layout.items.len(),
        boxes = layout.boxes.len(),
        "graph laid out"
    );
    Ok(layout)
}

/// Converts an xdot document into a [`Layout`].
pub fn from_xdot(xdot: &str, heap: &HeapSnapshot) -> Result<Layout, LayoutError> {
    let doc = parse_xdot(xdot)?;

    let bb = doc
        .graph
        .get("bb")
        .ok_or_else(|| LayoutError::Parse("graph has no bb attribute".into()))?;
    let corners = parse_floats(bb)?;
    let &[llx, lly, urx, ury] = corners.as_slice() else {
        return Err(LayoutError::Parse(format!("bb should have four numbers: {bb:?}")));
    };
    let flip = move |p: Point| Point::new(p.x - llx, ury - p.y);

    let mut layout = Layout {
        canvas: Size::new(urx - llx, ury - lly),
        ..Layout::default()
    };

    push_ops(&mut layout.items, None, &doc.graph, &flip)?;

    for statement in &doc.statements {
        match statement {
            Statement::Node { id, attrs } => {
                let node = match id.parse::<NodeId>() {
                    Ok(node) => Some(node),
                    Err(_) => {
                        debug!(id = %id, "node id is not numeric");
                        None
                    }
                };
                push_ops(&mut layout.items, node, attrs, &flip)?;
                let Some(node) = node else {
                    continue;
                };
                if let Some(rect) = node_rect(attrs, &flip)? {
                    layout.bounds.insert(node, rect);
                }
            }
            Statement::Edge { attrs, .. } => push_ops(&mut layout.items, None, attrs, &flip)?,
        }
    }

    for (&node, &rect) in &layout.bounds {
        if is_name_node(node) {
            continue;
        }
        let object = heap
            .get(node as EntryId)
            .and_then(|entry| entry.object.clone());
        if let Some(object) = object {
            layout.boxes.push(ClickBox { object, node, rect });
        }
    }

    Ok(layout)
}

fn push_ops(
    items: &mut Vec<DrawItem>,
    owner: Option<NodeId>,
    attrs: &Attrs,
    flip: &impl Fn(Point) -> Point,
) -> Result<(), LayoutError> {
    for key in DRAW_ATTRS {
        let Some(script) = attrs.get(key) else {
            continue;
        };
        for mut op in parse_ops(script)? {
            op.map_points(flip);
            items.push(DrawItem::new(owner, op));
        }
    }
    Ok(())
}

/// Node rectangle from `pos` (points) and `width`/`height` (inches).
fn node_rect(attrs: &Attrs, flip: &impl Fn(Point) -> Point) -> Result<Option<Rect>, LayoutError> {
    let (Some(pos), Some(width), Some(height)) =
        (attrs.get("pos"), attrs.get("width"), attrs.get("height"))
    else {
        return Ok(None);
    };
    let center = parse_floats(pos.trim_end_matches('!'))?;
    let &[x, y] = center.as_slice() else {
        return Err(LayoutError::Parse(format!("node pos should be x,y: {pos:?}")));
    };
    let inches = |value: &str| {
        value
            .parse::<f64>()
            .map_err(|e| LayoutError::Parse(format!("bad node size {value:?}: {e}")))
    };
    let size = Size::new(
        inches(width)? * POINTS_PER_INCH,
        inches(height)? * POINTS_PER_INCH,
    );
    Ok(Some(Rect::centered(flip(Point::new(x, y)), size)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapvis_types::{Closure, DrawOp, Entry, GraphEdge, NodeLabel};
    use std::sync::{Arc, Mutex};

    const LIST_XDOT: &str = r#"digraph heap {
	graph [_draw_="c 9 -#fffffe00 C 7 -#ffffff P 4 0 0 0 116 62 116 62 0 ",
		bb="0,0,62,116",
		bgcolor=transparent
	];
	"-1"	[height=0.05, pos="27,112", shape=point, style=invis, width=0.05];
	"0"	[_draw_="c 7 -#000000 p 4 0 0 0 36 54 36 54 0 ",
		_ldraw_="F 10 9 -Helvetica T 9 14.3 0 7 1 -: ",
		height=0.5, pos="27,18", shape=record, width=0.75];
	"-1" -> "0"	[_draw_="c 7 -#000000 B 4 27 107 27 98 27 77 27 57 ",
		_ldraw_="F 8 9 -Helvetica T 32 80 -1 10 2 -xs ", label=xs];
}
"#;

    struct CannedEngine {
        seen: Mutex<Vec<String>>,
    }

    impl LayoutEngine for CannedEngine {
        fn is_available(&self) -> bool {
            true
        }

        fn layout(&self, dot: &str) -> Result<String, LayoutError> {
            self.seen.lock().unwrap().push(dot.to_string());
            Ok(LIST_XDOT.to_string())
        }
    }

    fn heap_with(object: &Arc<u8>) -> HeapSnapshot {
        HeapSnapshot::new([
            Entry::new(0, Closure::Fields(vec![":".into()]), vec![]).with_object(ObjectRef::new(object)),
        ])
    }

    #[test]
    fn converts_to_top_left_origin() {
        let value = Arc::new(1u8);
        let layout = from_xdot(LIST_XDOT, &heap_with(&value)).unwrap();
        assert_eq!(layout.canvas, Size::new(62.0, 116.0));

        // pos 27,18 with a 54x36 box sits at the bottom of a 116-high canvas.
        assert_eq!(layout.bounds[&0], Rect::new(0.0, 80.0, 54.0, 36.0));
        let root = layout.bounds[&-1];
        assert!((root.center().y - 4.0).abs() < 1e-9);
    }

    #[test]
    fn ops_keep_order_and_owners() {
        let value = Arc::new(1u8);
        let layout = from_xdot(LIST_XDOT, &heap_with(&value)).unwrap();
        let owners: Vec<_> = layout.items.iter().map(|item| item.owner).collect();
        assert_eq!(
            owners,
            vec![
                None, None, None, // graph background
                Some(0),
                Some(0),
                Some(0),
                Some(0), // node outline and label
                None,
                None,
                None,
                None, // edge spline and label
            ]
        );
        match &layout.items[6].op {
            DrawOp::Text { at, text, .. } => {
                assert_eq!(text, ":");
                assert!((at.y - (116.0 - 14.3)).abs() < 1e-9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clickable_boxes_come_from_entries_with_objects() {
        let value = Arc::new(1u8);
        let layout = from_xdot(LIST_XDOT, &heap_with(&value)).unwrap();
        assert_eq!(layout.boxes.len(), 1);
        assert_eq!(layout.boxes[0].node, 0);
        assert_eq!(layout.boxes[0].object, ObjectRef::new(&value));

        let hit = layout.hit(Point::new(10.0, 100.0)).map(|b| b.node);
        assert_eq!(hit, Some(0));
        assert!(layout.hit(Point::new(60.0, 10.0)).is_none());
        assert_eq!(layout.node_at(Point::new(27.0, 98.0)), Some(0));

        let bare = HeapSnapshot::new([Entry::new(0, Closure::Fields(vec![]), vec![])]);
        assert!(from_xdot(LIST_XDOT, &bare).unwrap().boxes.is_empty());
    }

    #[test]
    fn layout_graph_feeds_dot_to_the_engine() {
        let engine = CannedEngine {
            seen: Mutex::new(Vec::new()),
        };
        let mut graph = Graph::default();
        graph.nodes.insert(-1, NodeLabel::name());
        graph.nodes.insert(
            0,
            NodeLabel {
                fields: vec![":".into()],
                port_count: 0,
            },
        );
        graph.edges.push(GraphEdge {
            from: -1,
            to: 0,
            name: "xs".into(),
            slot: 0,
        });
        let value = Arc::new(1u8);
        let layout =
            layout_graph(&engine, &graph, &heap_with(&value), &DotStyle::default()).unwrap();
        assert_eq!(layout.bounds.len(), 2);
        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].contains("\"-1\" -> \"0\""));
    }

    #[test]
    fn missing_bounding_box_is_an_error() {
        let err = from_xdot("digraph { a; }", &HeapSnapshot::default()).unwrap_err();
        assert!(matches!(err, LayoutError::Parse(_)));
    }
}
