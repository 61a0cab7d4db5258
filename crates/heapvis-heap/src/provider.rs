use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use heapvis_runtime::SnapshotProvider;
use heapvis_types::{Closure, Entry, EntryId, HeapSnapshot, ObjectRef};
use tracing::debug;

use crate::Heap;
use crate::cell::{Cell, Obj, Shape};

/// Exposes a [`Heap`] to the runtime.
#[derive(Clone)]
pub struct HeapProvider {
    heap: Arc<Heap>,
}

impl HeapProvider {
    pub fn new(heap: Arc<Heap>) -> Self {
        Self { heap }
    }
}

impl SnapshotProvider for HeapProvider {
    fn collect_hint(&self) {
        let live = self.heap.collect();
        debug!(live, "collection before snapshot");
    }

    fn snapshot(&self, roots: &[ObjectRef], depth: usize) -> Result<HeapSnapshot, String> {
        Ok(snapshot(roots, depth))
    }

    fn force(&self, object: &ObjectRef) -> Result<(), String> {
        let cell = object
            .downcast::<Cell>()
            .ok_or_else(|| format!("{object:?} is not a live heap cell"))?;
        self.heap.force(&cell);
        Ok(())
    }
}

/// Breadth-first walk from `roots`, numbering cells in discovery order.
///
/// Cells more than `depth` references away from every root are left out
/// and the slots pointing at them come back empty. Roots that are not live
/// cells are skipped.
pub fn snapshot(roots: &[ObjectRef], depth: usize) -> HeapSnapshot {
    let mut walk = Walk::default();
    for root in roots {
        match root.downcast::<Cell>() {
            Some(cell) => {
                walk.reach(&cell, 0);
            }
            None => debug!(?root, "root is not a live heap cell"),
        }
    }

    let mut entries = Vec::new();
    while let Some((cell, level)) = walk.queue.pop_front() {
        let id = walk.ids[&addr(&cell)];
        let mut follow = |target: &Obj| {
            if level < depth {
                Some(walk.reach(target, level + 1))
            } else {
                walk.ids.get(&addr(target)).copied()
            }
        };
        let (closure, pointers) = match cell.shape() {
            Shape::Fields { fields, refs } => {
                let pointers = refs.iter().map(&mut follow).collect();
                (Closure::Fields(fields), pointers)
            }
            Shape::Bytecode(groups) => {
                let instructions: Vec<Vec<Option<EntryId>>> = groups
                    .iter()
                    .map(|group| group.iter().map(|op| op.as_ref().and_then(&mut follow)).collect())
                    .collect();
                let pointers = instructions.iter().flatten().copied().collect();
                (Closure::Bytecode { instructions }, pointers)
            }
        };
        entries.push(Entry::new(id, closure, pointers).with_object(ObjectRef::new(&cell)));
    }
    debug!(roots = roots.len(), entries = entries.len(), depth, "heap walked");
    HeapSnapshot::new(entries)
}

fn addr(cell: &Obj) -> usize {
    Arc::as_ptr(cell) as usize
}

#[derive(Default)]
struct Walk {
    ids: HashMap<usize, EntryId>,
    queue: VecDeque<(Obj, usize)>,
}

impl Walk {
    /// Id of `cell`, queueing it at `level` on first sight.
    fn reach(&mut self, cell: &Obj, level: usize) -> EntryId {
        if let Some(id) = self.ids.get(&addr(cell)) {
            return *id;
        }
        let id = self.ids.len();
        self.ids.insert(addr(cell), id);
        self.queue.push_back((cell.clone(), level));
        id
    }
}
