//! Core model types for heapvis.
//!
//! Everything that crosses a crate boundary lives here: weak object handles,
//! raw heap entries as produced by a snapshot provider, the labeled multigraph
//! built from them, and the typed drawing operations the layout step emits.

mod draw;
mod dump;
mod geometry;
mod graph;
mod heap;
mod object;

pub use draw::*;
pub use dump::*;
pub use geometry::*;
pub use graph::*;
pub use heap::*;
pub use object::*;
