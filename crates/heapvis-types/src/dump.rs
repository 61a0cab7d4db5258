//! Serializable views of the model, used by `heapvis dump`.

use facet::Facet;

use crate::{DrawItem, Graph, NodeId, Rect, Size};

#[derive(Facet, Debug, Clone)]
pub struct NodeDump {
    pub id: NodeId,
    pub fields: Vec<String>,
    pub port_count: u64,
}

#[derive(Facet, Debug, Clone)]
pub struct EdgeDump {
    pub from: NodeId,
    pub to: NodeId,
    pub name: String,
    pub slot: u64,
}

#[derive(Facet, Debug, Clone)]
pub struct GraphDump {
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

impl From<&Graph> for GraphDump {
    fn from(graph: &Graph) -> Self {
        Self {
            nodes: graph
                .nodes
                .iter()
                .map(|(id, label)| NodeDump {
                    id: *id,
                    fields: label.fields.clone(),
                    port_count: label.port_count as u64,
                })
                .collect(),
            edges: graph
                .edges
                .iter()
                .map(|edge| EdgeDump {
                    from: edge.from,
                    to: edge.to,
                    name: edge.name.clone(),
                    slot: edge.slot as u64,
                })
                .collect(),
        }
    }
}

#[derive(Facet, Debug, Clone)]
pub struct BoundsDump {
    pub id: NodeId,
    pub rect: Rect,
}

/// One captured snapshot as the CLI prints it.
#[derive(Facet, Debug, Clone)]
pub struct SnapshotDump {
    pub sequence: u64,
    pub captured_at_ms: u64,
    pub graph: GraphDump,
    pub pruned: GraphDump,
    pub canvas: Option<Size>,
    pub bounds: Vec<BoundsDump>,
    pub ops: Vec<DrawItem>,
}
