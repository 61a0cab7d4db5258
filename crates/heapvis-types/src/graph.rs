use std::collections::{BTreeMap, BTreeSet};

/// Node identifier in a [`Graph`].
///
/// Entry nodes reuse their non-negative [`EntryId`](crate::EntryId); name nodes
/// (one per tracked object) use negative ids so the two never collide.
pub type NodeId = i64;

/// Whether `id` belongs to a synthetic name node.
pub fn is_name_node(id: NodeId) -> bool {
    id < 0
}

/// Label of a graph node: the record fields followed by `port_count` ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLabel {
    pub fields: Vec<String>,
    pub port_count: usize,
}

impl NodeLabel {
    /// Label carried by name nodes.
    pub fn name() -> Self {
        Self {
            fields: vec![String::new()],
            port_count: 0,
        }
    }
}

/// A directed edge. `slot` is the port index on the source node the edge
/// leaves from; `name` is the visible edge label (empty for heap pointers).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub name: String,
    pub slot: usize,
}

/// Labeled directed multigraph of one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub nodes: BTreeMap<NodeId, NodeLabel>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ids of all name nodes, closest to zero first.
    pub fn name_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().rev().copied().filter(|id| is_name_node(*id))
    }

    /// Outgoing adjacency, deduplicated, in deterministic order.
    pub fn adjacency(&self) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
        let mut adj: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for id in self.nodes.keys() {
            adj.entry(*id).or_default();
        }
        for edge in &self.edges {
            adj.entry(edge.from).or_default().insert(edge.to);
        }
        adj
    }

    /// Removes every node not in `keep` along with all edges touching one.
    pub fn retain_nodes(&mut self, keep: &BTreeSet<NodeId>) {
        self.nodes.retain(|id, _| keep.contains(id));
        self.edges
            .retain(|edge| keep.contains(&edge.from) && keep.contains(&edge.to));
    }

    /// Same node and edge sets, ignoring edge order.
    pub fn same_structure(&self, other: &Graph) -> bool {
        if self.nodes != other.nodes {
            return false;
        }
        let mut a = self.edges.clone();
        let mut b = other.edges.clone();
        a.sort();
        b.sort();
        a == b
    }
}
