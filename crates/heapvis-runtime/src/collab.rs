//! Interfaces to the world outside the runtime.

use heapvis_types::{HeapSnapshot, ObjectRef};

/// Source of raw heap snapshots.
pub trait SnapshotProvider: Send + Sync {
    /// Called before every snapshot; a provider backed by a collector can
    /// use it to run a collection first.
    fn collect_hint(&self) {}

    /// Captures everything reachable from `roots`, following at most `depth`
    /// references from any root. Roots that are no longer alive are skipped.
    fn snapshot(&self, roots: &[ObjectRef], depth: usize) -> Result<HeapSnapshot, String>;

    /// Evaluates the object if it is a suspended computation.
    fn force(&self, object: &ObjectRef) -> Result<(), String> {
        let _ = object;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Canvas {
    Main,
    Legend,
}

/// The windowing side. Only ever asked to schedule repaints.
pub trait Host: Send + Sync {
    fn request_redraw(&self, canvas: Canvas);
}

/// A host without a window, for batch use.
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl Host for Headless {
    fn request_redraw(&self, _canvas: Canvas) {}
}
