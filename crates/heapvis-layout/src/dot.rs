use std::fmt::Write as _;

use heapvis_types::{Graph, GraphEdge, NodeId, NodeLabel, is_name_node};

/// Fonts used in the emitted script.
#[derive(Debug, Clone, PartialEq)]
pub struct DotStyle {
    pub font: String,
    pub font_size: f64,
    pub edge_font_size: f64,
}

impl DotStyle {
    pub fn new(font: impl Into<String>, font_size: f64) -> Self {
        Self {
            font: font.into(),
            font_size,
            edge_font_size: (font_size * 0.8).max(1.0),
        }
    }
}

impl Default for DotStyle {
    fn default() -> Self {
        Self::new("Helvetica", 10.0)
    }
}

/// Render `graph` as a DOT script.
///
/// Entry nodes become `record` shapes: their fields, then one empty port
/// field per slot. Each pointer edge leaves the centre of the port matching
/// its slot. Name nodes are invisible points whose edge carries the label.
pub fn to_dot(graph: &Graph, style: &DotStyle) -> String {
    let font = quote(&style.font);
    let mut out = String::new();
    out.push_str("digraph heap {\n");
    let _ = writeln!(
        out,
        "  graph [bgcolor=transparent, fontname={font}, fontsize={}];",
        style.font_size
    );
    let _ = writeln!(
        out,
        "  node [fontname={font}, fontsize={}];",
        style.font_size
    );
    let _ = writeln!(
        out,
        "  edge [fontname={font}, fontsize={}];",
        style.edge_font_size
    );

    for (id, label) in &graph.nodes {
        write_node(&mut out, *id, label);
    }
    for edge in &graph.edges {
        write_edge(&mut out, edge);
    }

    out.push_str("}\n");
    out
}

fn write_node(out: &mut String, id: NodeId, label: &NodeLabel) {
    if is_name_node(id) {
        let _ = writeln!(
            out,
            "  \"{id}\" [shape=point, style=invis, label=\"\"];"
        );
        return;
    }
    let _ = writeln!(
        out,
        "  \"{id}\" [shape=record, label={}];",
        quote_record(&record_label(label))
    );
}

fn write_edge(out: &mut String, edge: &GraphEdge) {
    let from = edge.from;
    let to = edge.to;
    let label = quote(&edge.name);
    if is_name_node(from) {
        let _ = writeln!(
            out,
            "  \"{from}\" -> \"{to}\" [label={label}, tailclip=false];"
        );
    } else {
        let _ = writeln!(
            out,
            "  \"{from}\" -> \"{to}\" [label={label}, tailport=\"{}:c\", tailclip=false];",
            edge.slot
        );
    }
}

/// `field|field|<0>|<1>` with record metacharacters escaped.
fn record_label(label: &NodeLabel) -> String {
    let fields = label.fields.iter().map(|field| escape_record(field));
    let ports = (0..label.port_count).map(|port| format!("<{port}>"));
    fields.chain(ports).collect::<Vec<_>>().join("|")
}

fn escape_record(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if matches!(c, '{' | '}' | '|' | '<' | '>' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Double-quoted DOT string for an escString attribute such as an edge label.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Record labels are already escaped for the record parser, which passes
/// backslashes through, so only the quote itself needs escaping here.
fn quote_record(label: &str) -> String {
    format!("\"{}\"", label.replace('"', "\\\"").replace('\n', "\\n"))
}
