//! The xdot drawing-operation language found in `_draw_`-style attributes.

use heapvis_types::{Color, DrawOp, Point, Rect, TextAlign};
use tracing::debug;

use crate::LayoutError;

/// Parses one xdot operation string into typed operations, in order.
///
/// Coordinates are left in the engine's bottom-left origin; the caller
/// flips them once the canvas height is known. Colour operations the
/// viewer cannot represent (gradients) are skipped.
pub fn parse_ops(src: &str) -> Result<Vec<DrawOp>, LayoutError> {
    let mut reader = Reader { src, pos: 0 };
    let mut ops = Vec::new();

    while let Some(code) = reader.word() {
        let op = match code {
            "E" | "e" => {
                let center = reader.point()?;
                let rx = reader.number()?;
                let ry = reader.number()?;
                DrawOp::Ellipse {
                    filled: code == "E",
                    center,
                    rx,
                    ry,
                }
            }
            "P" | "p" => DrawOp::Polygon {
                filled: code == "P",
                points: reader.points()?,
            },
            "L" => DrawOp::Polyline {
                points: reader.points()?,
            },
            "B" | "b" => DrawOp::Bezier {
                filled: code == "b",
                points: reader.points()?,
            },
            "T" => {
                let at = reader.point()?;
                let align = match reader.number()? as i64 {
                    -1 => TextAlign::Left,
                    1 => TextAlign::Right,
                    _ => TextAlign::Center,
                };
                let width = reader.number()?;
                let text = reader.text()?.to_string();
                DrawOp::Text {
                    at,
                    align,
                    width,
                    text,
                }
            }
            "C" | "c" => {
                let spec = reader.text()?;
                let Some(color) = Color::parse(spec) else {
                    debug!(color = spec, "skipping unsupported colour");
                    continue;
                };
                if code == "C" {
                    DrawOp::FillColor { color }
                } else {
                    DrawOp::PenColor { color }
                }
            }
            "F" => {
                let size = reader.number()?;
                let name = reader.text()?.to_string();
                DrawOp::Font { size, name }
            }
            "S" => DrawOp::Style {
                style: reader.text()?.to_string(),
            },
            "t" => DrawOp::FontFlags {
                flags: reader.number()? as u32,
            },
            "I" => {
                let corner = reader.point()?;
                let width = reader.number()?;
                let height = reader.number()?;
                let name = reader.text()?.to_string();
                // Stored by its top edge so a y flip lands on the top-left corner.
                DrawOp::Image {
                    rect: Rect::new(corner.x, corner.y + height, width, height),
                    name,
                }
            }
            other => {
                return Err(LayoutError::Parse(format!(
                    "unknown xdot operation {other:?} at byte {}",
                    reader.pos
                )));
            }
        };
        ops.push(op);
    }

    Ok(ops)
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn skip_space(&mut self) {
        let rest = &self.src[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    /// Next whitespace-delimited word, or `None` at end of input.
    fn word(&mut self) -> Option<&'a str> {
        self.skip_space();
        let src = self.src;
        let rest = &src[self.pos..];
        if rest.is_empty() {
            return None;
        }
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.pos += len;
        Some(&rest[..len])
    }

    fn number(&mut self) -> Result<f64, LayoutError> {
        let word = self
            .word()
            .ok_or_else(|| LayoutError::Parse("expected number, found end of input".into()))?;
        word.parse::<f64>()
            .map_err(|e| LayoutError::Parse(format!("bad number {word:?}: {e}")))
    }

    fn count(&mut self) -> Result<usize, LayoutError> {
        let n = self.number()?;
        if n < 0.0 || n.fract() != 0.0 {
            return Err(LayoutError::Parse(format!("bad count {n}")));
        }
        Ok(n as usize)
    }

    fn point(&mut self) -> Result<Point, LayoutError> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Point::new(x, y))
    }

    /// `n x1 y1 ... xn yn`
    fn points(&mut self) -> Result<Vec<Point>, LayoutError> {
        let n = self.count()?;
        (0..n).map(|_| self.point()).collect()
    }

    /// `n -bytes`: exactly `n` bytes following the dash.
    fn text(&mut self) -> Result<&'a str, LayoutError> {
        let n = self.count()?;
        self.skip_space();
        let src = self.src;
        let Some(rest) = src[self.pos..].strip_prefix('-') else {
            return Err(LayoutError::Parse(format!(
                "expected '-' before text at byte {}",
                self.pos
            )));
        };
        let text = rest.get(..n).ok_or_else(|| {
            LayoutError::Parse(format!("text of {n} bytes runs past the end or splits a character"))
        })?;
        self.pos += 1 + n;
        Ok(text)
    }
}
