use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::str::FromStr;

use heapvis_types::{Graph, NodeId};
use tracing::debug;

// ── Configuration ───────────────────────────────────────────────

/// Whether name nodes belong to their own closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootRetention {
    /// Each name node is kept along with everything it reaches.
    #[default]
    Reflexive,
    /// Only nodes strictly downstream of some name node are kept. A name node
    /// survives only if another root reaches it.
    Downstream,
}

impl FromStr for RootRetention {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reflexive" => Ok(Self::Reflexive),
            "downstream" => Ok(Self::Downstream),
            other => Err(format!(
                "unknown root retention {other:?} (expected reflexive or downstream)"
            )),
        }
    }
}

// ── Public API ──────────────────────────────────────────────────

/// Ids of every node some name node reaches.
pub fn reachable_set(graph: &Graph, retention: RootRetention) -> BTreeSet<NodeId> {
    let adjacency = graph.adjacency();
    let mut reachable = BTreeSet::new();
    for root in graph.name_nodes() {
        if retention == RootRetention::Reflexive {
            reachable.insert(root);
        }
        reachable.extend(successors(root, &adjacency));
    }
    reachable
}

/// Drop nodes no tracked root reaches, along with their edges.
pub fn prune(graph: &Graph, retention: RootRetention) -> Graph {
    let keep = reachable_set(graph, retention);
    let mut pruned = graph.clone();
    pruned.retain_nodes(&keep);
    debug!(
        before = graph.nodes.len(),
        after = pruned.nodes.len(),
        "pruned unreachable nodes"
    );
    pruned
}

// ── Closure ─────────────────────────────────────────────────────

/// Direct and transitive successors of `start`, not including `start` itself
/// unless a cycle leads back to it.
fn successors(start: NodeId, adjacency: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> BTreeSet<NodeId> {
    let mut seen: BTreeSet<NodeId> = BTreeSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        let Some(next) = adjacency.get(&node) else {
            continue;
        };
        for &target in next {
            if seen.insert(target) {
                queue.push_back(target);
            }
        }
    }
    seen
}
