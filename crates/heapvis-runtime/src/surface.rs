//! Export surfaces.
//!
//! A [`Surface`] replays drawing operations into a file. SVG and PostScript
//! are plain text and written here; PDF and PNG need a rasterising backend
//! supplied by the host.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use heapvis_types::{Color, DrawOp, Point, Size, TextAlign};
use tracing::debug;

// ── Formats ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Svg,
    Pdf,
    Png,
    Ps,
}

impl ExportFormat {
    /// Format named by the path's extension, compared case-insensitively.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("svg") => Ok(Self::Svg),
            Some("pdf") => Ok(Self::Pdf),
            Some("png") => Ok(Self::Png),
            Some("ps") => Ok(Self::Ps),
            _ => Err(format!(
                "cannot export to {}: expected a .svg, .pdf, .png or .ps file",
                path.display()
            )),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Pdf => "pdf",
            Self::Png => "png",
            Self::Ps => "ps",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

// ── Surfaces ────────────────────────────────────────────────────

pub trait Surface: Send {
    fn draw(&mut self, op: &DrawOp) -> io::Result<()>;

    /// Completes the output. Dropping a surface without finishing it
    /// releases it without completing the file.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

pub trait SurfaceBackend: Send + Sync {
    /// Whether `open` can produce `format` at all.
    fn supports(&self, _format: ExportFormat) -> bool {
        true
    }

    fn open(&self, format: ExportFormat, path: &Path, size: Size) -> io::Result<Box<dyn Surface>>;
}

/// Opens a surface, runs `paint` on it and finishes it. The surface is
/// released on every path out, finished only when `paint` succeeds.
pub fn with_surface<F>(
    backend: &dyn SurfaceBackend,
    format: ExportFormat,
    path: &Path,
    size: Size,
    paint: F,
) -> io::Result<()>
where
    F: FnOnce(&mut dyn Surface) -> io::Result<()>,
{
    let mut surface = backend.open(format, path, size)?;
    match paint(surface.as_mut()) {
        Ok(()) => surface.finish(),
        Err(e) => {
            drop(surface);
            Err(e)
        }
    }
}

/// Writes SVG and PostScript files; refuses PDF and PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileBackend;

impl SurfaceBackend for FileBackend {
    fn supports(&self, format: ExportFormat) -> bool {
        matches!(format, ExportFormat::Svg | ExportFormat::Ps)
    }

    fn open(&self, format: ExportFormat, path: &Path, size: Size) -> io::Result<Box<dyn Surface>> {
        let open = || File::create(path).map(BufWriter::new);
        match format {
            ExportFormat::Svg => Ok(Box::new(SvgSurface::new(open()?, size)?)),
            ExportFormat::Ps => Ok(Box::new(PsSurface::new(open()?, size)?)),
            ExportFormat::Pdf | ExportFormat::Png => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{format} export needs a rendering backend"),
            )),
        }
    }
}

/// Graphics state shared by the text surfaces.
#[derive(Debug, Clone)]
struct Pen {
    stroke: Color,
    fill: Color,
    font: String,
    font_size: f64,
    dash: Option<&'static str>,
    line_width: f64,
    invisible: bool,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            stroke: Color::BLACK,
            fill: Color::TRANSPARENT,
            font: "Helvetica".to_string(),
            font_size: 14.0,
            dash: None,
            line_width: 1.0,
            invisible: false,
        }
    }
}

impl Pen {
    /// Applies a state operation. Returns false for shape operations.
    fn apply(&mut self, op: &DrawOp) -> bool {
        match op {
            DrawOp::PenColor { color } => self.stroke = *color,
            DrawOp::FillColor { color } => self.fill = *color,
            DrawOp::Font { size, name } => {
                self.font_size = *size;
                self.font = name.clone();
            }
            DrawOp::Style { style } => {
                for part in style.split(',').map(str::trim) {
                    match part {
                        "dashed" => self.dash = Some("5,2"),
                        "dotted" => self.dash = Some("1,5"),
                        "solid" => {
                            self.dash = None;
                            self.invisible = false;
                        }
                        "invis" | "invisible" => self.invisible = true,
                        "bold" => self.line_width = 2.0,
                        _ => {
                            if let Some(width) = part
                                .strip_prefix("setlinewidth(")
                                .and_then(|rest| rest.strip_suffix(')'))
                                .and_then(|w| w.parse::<f64>().ok())
                            {
                                self.line_width = width;
                            }
                        }
                    }
                }
            }
            DrawOp::FontFlags { .. } => {}
            _ => return false,
        }
        true
    }
}

// ── SVG ─────────────────────────────────────────────────────────

pub struct SvgSurface<W: Write> {
    out: W,
    pen: Pen,
}

impl<W: Write> SvgSurface<W> {
    pub fn new(mut out: W, size: Size) -> io::Result<Self> {
        writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = size.width,
            h = size.height
        )?;
        Ok(Self {
            out,
            pen: Pen::default(),
        })
    }

    /// Closes the document and hands back the writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        writeln!(self.out, "</svg>")?;
        self.out.flush()?;
        Ok(self.out)
    }

    fn paint(&self, filled: bool) -> String {
        let stroke = &self.pen.stroke;
        let mut attrs = format!(
            r#"stroke="{}" stroke-opacity="{}" stroke-width="{}""#,
            stroke.to_hex(),
            stroke.opacity(),
            self.pen.line_width
        );
        if filled && !self.pen.fill.is_transparent() {
            attrs.push_str(&format!(
                r#" fill="{}" fill-opacity="{}""#,
                self.pen.fill.to_hex(),
                self.pen.fill.opacity()
            ));
        } else {
            attrs.push_str(r#" fill="none""#);
        }
        if let Some(dash) = self.pen.dash {
            attrs.push_str(&format!(r#" stroke-dasharray="{dash}""#));
        }
        attrs
    }
}

fn svg_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn svg_bezier(points: &[Point]) -> String {
    let Some((first, rest)) = points.split_first() else {
        return String::new();
    };
    let mut d = format!("M{},{}", first.x, first.y);
    for curve in rest.chunks(3) {
        if let [c1, c2, p] = curve {
            d.push_str(&format!(" C{},{} {},{} {},{}", c1.x, c1.y, c2.x, c2.y, p.x, p.y));
        }
    }
    d
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

impl<W: Write + Send> Surface for SvgSurface<W> {
    fn draw(&mut self, op: &DrawOp) -> io::Result<()> {
        if self.pen.apply(op) || self.pen.invisible {
            return Ok(());
        }
        match op {
            DrawOp::Ellipse {
                filled,
                center,
                rx,
                ry,
            } => writeln!(
                self.out,
                r#"<ellipse cx="{}" cy="{}" rx="{rx}" ry="{ry}" {}/>"#,
                center.x,
                center.y,
                self.paint(*filled)
            ),
            DrawOp::Polygon { filled, points } => writeln!(
                self.out,
                r#"<polygon points="{}" {}/>"#,
                svg_points(points),
                self.paint(*filled)
            ),
            DrawOp::Polyline { points } => writeln!(
                self.out,
                r#"<polyline points="{}" {}/>"#,
                svg_points(points),
                self.paint(false)
            ),
            DrawOp::Bezier { filled, points } => writeln!(
                self.out,
                r#"<path d="{}" {}/>"#,
                svg_bezier(points),
                self.paint(*filled)
            ),
            DrawOp::Text {
                at, align, text, ..
            } => {
                let anchor = match align {
                    TextAlign::Left => "start",
                    TextAlign::Center => "middle",
                    TextAlign::Right => "end",
                };
                writeln!(
                    self.out,
                    r#"<text x="{}" y="{}" text-anchor="{anchor}" font-family="{}" font-size="{}" fill="{}">{}</text>"#,
                    at.x,
                    at.y,
                    xml_escape(&self.pen.font),
                    self.pen.font_size,
                    self.pen.stroke.to_hex(),
                    xml_escape(text)
                )
            }
            DrawOp::Image { rect, name } => writeln!(
                self.out,
                r#"<image x="{}" y="{}" width="{}" height="{}" href="{}"/>"#,
                rect.x,
                rect.y,
                rect.width,
                rect.height,
                xml_escape(name)
            ),
            _ => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        self.into_inner().map(drop)
    }
}

// ── PostScript ──────────────────────────────────────────────────

pub struct PsSurface<W: Write> {
    out: W,
    pen: Pen,
    height: f64,
}

impl<W: Write> PsSurface<W> {
    pub fn new(mut out: W, size: Size) -> io::Result<Self> {
        writeln!(out, "%!PS-Adobe-3.0 EPSF-3.0")?;
        writeln!(
            out,
            "%%BoundingBox: 0 0 {} {}",
            size.width.ceil(),
            size.height.ceil()
        )?;
        writeln!(out, "%%EndComments")?;
        Ok(Self {
            out,
            pen: Pen::default(),
            height: size.height,
        })
    }

    pub fn into_inner(mut self) -> io::Result<W> {
        writeln!(self.out, "showpage")?;
        writeln!(self.out, "%%EOF")?;
        self.out.flush()?;
        Ok(self.out)
    }

    /// PostScript's origin is bottom-left.
    fn xy(&self, p: Point) -> (f64, f64) {
        (p.x, self.height - p.y)
    }

    fn set_color(&mut self, color: Color) -> io::Result<()> {
        writeln!(
            self.out,
            "{:.4} {:.4} {:.4} setrgbcolor",
            f64::from(color.r) / 255.0,
            f64::from(color.g) / 255.0,
            f64::from(color.b) / 255.0
        )
    }

    fn path(&mut self, points: &[Point], close: bool) -> io::Result<()> {
        write!(self.out, "newpath")?;
        for (i, p) in points.iter().enumerate() {
            let (x, y) = self.xy(*p);
            let verb = if i == 0 { "moveto" } else { "lineto" };
            write!(self.out, " {x} {y} {verb}")?;
        }
        if close {
            write!(self.out, " closepath")?;
        }
        writeln!(self.out)
    }

    fn paint(&mut self, filled: bool) -> io::Result<()> {
        writeln!(self.out, "{} setlinewidth", self.pen.line_width)?;
        if filled && !self.pen.fill.is_transparent() {
            writeln!(self.out, "gsave")?;
            self.set_color(self.pen.fill)?;
            writeln!(self.out, "fill grestore")?;
        }
        self.set_color(self.pen.stroke)?;
        writeln!(self.out, "stroke")
    }
}

fn ps_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('(');
    for c in text.chars() {
        match c {
            '(' | ')' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_ascii() => out.push(c),
            _ => out.push('?'),
        }
    }
    out.push(')');
    out
}

impl<W: Write + Send> Surface for PsSurface<W> {
    fn draw(&mut self, op: &DrawOp) -> io::Result<()> {
        if self.pen.apply(op) || self.pen.invisible {
            return Ok(());
        }
        match op {
            DrawOp::Ellipse {
                filled,
                center,
                rx,
                ry,
            } => {
                let (x, y) = self.xy(*center);
                writeln!(
                    self.out,
                    "newpath gsave {x} {y} translate {rx} {ry} scale 0 0 1 0 360 arc grestore"
                )?;
                self.paint(*filled)
            }
            DrawOp::Polygon { filled, points } => {
                self.path(points, true)?;
                self.paint(*filled)
            }
            DrawOp::Polyline { points } => {
                self.path(points, false)?;
                self.paint(false)
            }
            DrawOp::Bezier { filled, points } => {
                let Some((first, rest)) = points.split_first() else {
                    return Ok(());
                };
                let (x, y) = self.xy(*first);
                write!(self.out, "newpath {x} {y} moveto")?;
                for curve in rest.chunks(3) {
                    if let [c1, c2, p] = curve {
                        let (x1, y1) = self.xy(*c1);
                        let (x2, y2) = self.xy(*c2);
                        let (x3, y3) = self.xy(*p);
                        write!(self.out, " {x1} {y1} {x2} {y2} {x3} {y3} curveto")?;
                    }
                }
                writeln!(self.out)?;
                self.paint(*filled)
            }
            DrawOp::Text {
                at, align, text, ..
            } => {
                let (x, y) = self.xy(*at);
                let font = self.pen.font.replace(' ', "-");
                writeln!(
                    self.out,
                    "/{font} findfont {} scalefont setfont",
                    self.pen.font_size
                )?;
                self.set_color(self.pen.stroke)?;
                let s = ps_string(text);
                let shift = match align {
                    TextAlign::Left => String::new(),
                    TextAlign::Center => format!("{s} stringwidth pop 2 div neg 0 rmoveto "),
                    TextAlign::Right => format!("{s} stringwidth pop neg 0 rmoveto "),
                };
                writeln!(self.out, "{x} {y} moveto {shift}{s} show")
            }
            DrawOp::Image { name, .. } => {
                debug!(image = %name, "images are not embedded in PostScript output");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn finish(self: Box<Self>) -> io::Result<()> {
        self.into_inner().map(drop)
    }
}
