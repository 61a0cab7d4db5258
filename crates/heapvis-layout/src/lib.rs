//! Layout adapter for heapvis.
//!
//! A pruned [`Graph`](heapvis_types::Graph) is written out as a DOT script,
//! handed to a [`LayoutEngine`] (Graphviz `dot -Txdot` in production), and
//! the resulting xdot drawing script is parsed back into typed drawing
//! operations, clickable boxes and per-node bounds.

mod dot;
mod engine;
mod layout;
mod ops;
mod xdot;

pub use dot::{DotStyle, to_dot};
pub use engine::{Graphviz, LayoutEngine, LayoutError};
pub use layout::{ClickBox, Layout, from_xdot, layout_graph};
pub use ops::parse_ops;
pub use xdot::{XdotDocument, parse_xdot};
