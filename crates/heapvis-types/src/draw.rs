use facet::Facet;

use crate::{NodeId, Point, Rect};

// ── Colours ─────────────────────────────────────────────────────

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(255, 255, 255, 0);
    /// Pen colour used for the node under the pointer.
    pub const HIGHLIGHT: Color = Color::rgb(0x1f, 0x6f, 0xd0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rrggbb`, `#rrggbbaa`, `#rgb`, or one of the few colour names
    /// the layout engine emits for our graphs.
    pub fn parse(value: &str) -> Option<Color> {
        let value = value.trim();
        if let Some(hex) = value.strip_prefix('#') {
            return parse_hex(hex);
        }
        let named = match value.to_ascii_lowercase().as_str() {
            "black" => Color::BLACK,
            "white" => Color::WHITE,
            "transparent" | "none" | "invis" => Color::TRANSPARENT,
            "red" => Color::rgb(255, 0, 0),
            "green" => Color::rgb(0, 255, 0),
            "blue" => Color::rgb(0, 0, 255),
            "gray" | "grey" => Color::rgb(192, 192, 192),
            "lightgray" | "lightgrey" => Color::rgb(211, 211, 211),
            _ => return None,
        };
        Some(named)
    }

    /// `#rrggbb` form, ignoring alpha.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn opacity(&self) -> f64 {
        f64::from(self.a) / 255.0
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let byte = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_digit(16));
            let r = digits.next()?? as u8;
            let g = digits.next()?? as u8;
            let b = digits.next()?? as u8;
            Some(Color::rgb(r * 17, g * 17, b * 17))
        }
        6 => Some(Color::rgb(
            byte(hex.get(0..2)?)?,
            byte(hex.get(2..4)?)?,
            byte(hex.get(4..6)?)?,
        )),
        8 => Some(Color::rgba(
            byte(hex.get(0..2)?)?,
            byte(hex.get(2..4)?)?,
            byte(hex.get(4..6)?)?,
            byte(hex.get(6..8)?)?,
        )),
        _ => None,
    }
}

// ── Drawing operations ──────────────────────────────────────────

#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// One typed paint operation. Colour, font and style operations change the
/// state used by the shape operations that follow them.
#[derive(Facet, Debug, Clone, PartialEq)]
#[repr(u8)]
pub enum DrawOp {
    Ellipse {
        filled: bool,
        center: Point,
        rx: f64,
        ry: f64,
    },
    Polygon {
        filled: bool,
        points: Vec<Point>,
    },
    Polyline {
        points: Vec<Point>,
    },
    /// Cubic B-spline control points: `p0, (c1, c2, p)*`.
    Bezier {
        filled: bool,
        points: Vec<Point>,
    },
    /// Text anchored at its baseline.
    Text {
        at: Point,
        align: TextAlign,
        width: f64,
        text: String,
    },
    FillColor {
        color: Color,
    },
    PenColor {
        color: Color,
    },
    Font {
        size: f64,
        name: String,
    },
    Style {
        style: String,
    },
    FontFlags {
        flags: u32,
    },
    Image {
        rect: Rect,
        name: String,
    },
}

impl DrawOp {
    /// Applies `f` to every coordinate of the operation.
    pub fn map_points(&mut self, f: impl Fn(Point) -> Point) {
        match self {
            DrawOp::Ellipse { center, .. } => *center = f(*center),
            DrawOp::Polygon { points, .. }
            | DrawOp::Polyline { points }
            | DrawOp::Bezier { points, .. } => {
                for point in points.iter_mut() {
                    *point = f(*point);
                }
            }
            DrawOp::Text { at, .. } => *at = f(*at),
            DrawOp::Image { rect, .. } => {
                let origin = f(Point::new(rect.x, rect.y));
                rect.x = origin.x;
                rect.y = origin.y;
            }
            DrawOp::FillColor { .. }
            | DrawOp::PenColor { .. }
            | DrawOp::Font { .. }
            | DrawOp::Style { .. }
            | DrawOp::FontFlags { .. } => {}
        }
    }
}

/// A drawing operation together with the node that owns it. Graph-level and
/// edge operations have no owner.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct DrawItem {
    pub owner: Option<NodeId>,
    pub op: DrawOp,
}

impl DrawItem {
    pub fn new(owner: Option<NodeId>, op: DrawOp) -> Self {
        Self { owner, op }
    }
}
