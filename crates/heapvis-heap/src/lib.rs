//! An in-process managed heap that heapvis can observe.
//!
//! Cells hold integers, constructor applications, byte-code objects or
//! thunks. Thunks are overwritten with their value when forced, which is
//! what clicking one in a view does.

mod cell;
mod demo;
mod heap;
mod provider;

pub use cell::{Cell, Code, Node, Obj};
pub use demo::Demo;
pub use heap::{Heap, int_list};
pub use provider::{HeapProvider, snapshot};
