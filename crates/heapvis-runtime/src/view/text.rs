use heapvis_layout::{ClickBox, Layout};
use heapvis_types::{Color, DrawItem, DrawOp, NodeId, ObjectRef, Point, Rect, Size, TextAlign};

/// Average glyph advance as a fraction of the font size.
const CHAR_WIDTH: f64 = 0.6;
const LINE_HEIGHT: f64 = 1.4;

/// Lays out text spans left to right, one line at a time, with a
/// monospace width estimate.
pub(super) struct LineWriter {
    font: String,
    font_size: f64,
    line: usize,
    x: f64,
    widest: f64,
    layout: Layout,
}

impl LineWriter {
    pub(super) fn new(font: &str, font_size: f64) -> Self {
        let mut layout = Layout::default();
        layout.items.push(DrawItem::new(
            None,
            DrawOp::Font {
                size: font_size,
                name: font.to_string(),
            },
        ));
        layout.items.push(DrawItem::new(
            None,
            DrawOp::PenColor {
                color: Color::BLACK,
            },
        ));
        Self {
            font: font.to_string(),
            font_size,
            line: 0,
            x: 0.0,
            widest: 0.0,
            layout,
        }
    }

    fn margin(&self) -> f64 {
        self.font_size
    }

    fn line_height(&self) -> f64 {
        self.font_size * LINE_HEIGHT
    }

    /// Writes `text` at the current position. `object` makes the span
    /// clickable; `owner` ties it to a node for hovering.
    pub(super) fn span(&mut self, text: &str, owner: Option<NodeId>, object: Option<ObjectRef>) {
        if text.is_empty() {
            return;
        }
        let width = text.chars().count() as f64 * self.font_size * CHAR_WIDTH;
        let margin = self.margin();
        let top = margin + self.line as f64 * self.line_height();
        let baseline = top + self.font_size;
        let left = margin + self.x;
        self.layout.items.push(DrawItem::new(
            owner,
            DrawOp::Text {
                at: Point::new(left, baseline),
                align: TextAlign::Left,
                width,
                text: text.to_string(),
            },
        ));

        let rect = Rect::new(left, top, width, self.line_height());
        if let Some(node) = owner {
            self.layout.bounds.entry(node).or_insert(rect);
            if let Some(object) = object {
                self.layout.boxes.push(ClickBox { object, node, rect });
            }
        }
        self.x += width;
        self.widest = self.widest.max(self.x);
    }

    pub(super) fn plain(&mut self, text: &str) {
        self.span(text, None, None);
    }

    pub(super) fn newline(&mut self) {
        self.line += 1;
        self.x = 0.0;
    }

    pub(super) fn font(&self) -> &str {
        &self.font
    }

    pub(super) fn finish(mut self) -> Layout {
        let lines = if self.x > 0.0 { self.line + 1 } else { self.line };
        let margin = self.margin();
        self.layout.canvas = if lines == 0 {
            Size::default()
        } else {
            Size::new(
                self.widest + 2.0 * margin,
                lines as f64 * self.line_height() + 2.0 * margin,
            )
        };
        self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn spans_advance_and_lines_stack() {
        let value = Arc::new(0u8);
        let mut writer = LineWriter::new("Courier", 10.0);
        writer.plain("xs = ");
        writer.span("Nil", Some(3), Some(ObjectRef::new(&value)));
        writer.newline();
        writer.span("ab", Some(4), None);
        let layout = writer.finish();

        // 5 chars at 6pt each, after a 10pt margin.
        assert_eq!(layout.bounds[&3], Rect::new(40.0, 10.0, 18.0, 14.0));
        assert_eq!(layout.bounds[&4], Rect::new(10.0, 24.0, 12.0, 14.0));
        assert_eq!(layout.boxes.len(), 1);
        assert_eq!(layout.canvas, Size::new(48.0 + 20.0, 28.0 + 20.0));
        assert!(matches!(
            layout.items[0].op,
            DrawOp::Font { size, .. } if size == 10.0
        ));
    }

    #[test]
    fn empty_writer_has_no_canvas() {
        assert!(LineWriter::new("Courier", 10.0).finish().canvas.is_empty());
    }
}
