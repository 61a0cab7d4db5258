//! Reference-graph construction for heapvis.
//!
//! Converts a raw [`HeapSnapshot`](heapvis_types::HeapSnapshot) plus the list
//! of tracked objects into a labeled multigraph, then restricts that graph to
//! the part the tracked roots can still reach.

mod builder;
mod prune;

pub use builder::build_graph;
pub use prune::{RootRetention, prune, reachable_set};
