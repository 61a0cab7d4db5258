use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::cell::{Cell, Code, Node, Obj};

/// Allocator for cells. Keeps weak references to everything it handed
/// out so it can report what is still alive.
#[derive(Default)]
pub struct Heap {
    cells: Mutex<Vec<Weak<Cell>>>,
    forced: AtomicUsize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&self, node: Node) -> Obj {
        let obj = Cell::new(node);
        self.cells.lock().push(Arc::downgrade(&obj));
        obj
    }

    // ── Construction ────────────────────────────────────────────

    pub fn int(&self, n: i64) -> Obj {
        self.alloc(Node::Int(n))
    }

    pub fn con(&self, name: &str, args: Vec<Obj>) -> Obj {
        self.alloc(Node::Con {
            name: name.to_string(),
            args,
        })
    }

    /// A `:`/`[]` list of `items`.
    pub fn list(&self, items: impl IntoIterator<Item = Obj>) -> Obj {
        let items: Vec<Obj> = items.into_iter().collect();
        items
            .into_iter()
            .rev()
            .fold(self.con("[]", Vec::new()), |tail, head| {
                self.con(":", vec![head, tail])
            })
    }

    pub fn thunk(
        &self,
        label: &str,
        captured: Vec<Obj>,
        code: impl Fn(&[Obj]) -> Node + Send + Sync + 'static,
    ) -> Obj {
        let code: Code = Arc::new(code);
        self.alloc(Node::Thunk {
            label: label.to_string(),
            captured,
            code,
        })
    }

    pub fn bytecode(&self, name: &str, instructions: Vec<Vec<Option<Obj>>>) -> Obj {
        self.alloc(Node::Bytecode {
            name: name.to_string(),
            instructions,
        })
    }

    /// Overwrites argument `index` of a constructor cell. This is how
    /// cyclic structures are tied.
    pub fn set_arg(&self, cell: &Obj, index: usize, value: Obj) -> Result<(), String> {
        cell.set_arg(index, value)
    }

    // ── Evaluation ──────────────────────────────────────────────

    /// Forces `cell`, counting evaluations. Returns whether anything was
    /// evaluated.
    pub fn force(&self, cell: &Obj) -> bool {
        let forced = cell.force();
        if forced {
            self.forced.fetch_add(1, Ordering::Relaxed);
        }
        forced
    }

    pub fn forced(&self) -> usize {
        self.forced.load(Ordering::Relaxed)
    }

    // ── Liveness ────────────────────────────────────────────────

    /// Forgets cells nobody holds any more. Returns how many are alive.
    pub fn collect(&self) -> usize {
        let mut cells = self.cells.lock();
        let before = cells.len();
        cells.retain(|cell| cell.strong_count() > 0);
        let live = cells.len();
        if live < before {
            debug!(freed = before - live, live, "heap collected");
        }
        live
    }

    pub fn live(&self) -> usize {
        self.cells
            .lock()
            .iter()
            .filter(|cell| cell.strong_count() > 0)
            .count()
    }
}

/// Integers of a fully evaluated list of `I#` cells, forcing thunks on the
/// way. `None` if the cell is not such a list.
pub fn int_list(cell: &Obj) -> Option<Vec<i64>> {
    let mut out = Vec::new();
    let mut cursor = cell.clone();
    loop {
        cursor.force();
        let next = match cursor.node() {
            Node::Con { name, args } if name == "[]" && args.is_empty() => return Some(out),
            Node::Con { name, args } if name == ":" && args.len() == 2 => {
                args[0].force();
                match args[0].node() {
                    Node::Int(n) => out.push(n),
                    _ => return None,
                }
                args[1].clone()
            }
            _ => return None,
        };
        cursor = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_are_cons_cells_ending_in_nil() {
        let heap = Heap::new();
        let xs = heap.list([heap.int(1), heap.int(2)]);
        assert_eq!(int_list(&xs), Some(vec![1, 2]));
        // Two ints, two conses and a nil.
        assert_eq!(heap.live(), 5);
    }

    #[test]
    fn forcing_overwrites_in_place() {
        let heap = Heap::new();
        let xs = heap.list([heap.int(1), heap.int(2)]);
        let total = heap.thunk("sum", vec![xs], |captured| {
            Node::Int(int_list(&captured[0]).unwrap_or_default().iter().sum())
        });
        let before = Arc::as_ptr(&total);

        assert!(total.is_thunk());
        assert!(heap.force(&total));
        assert!(!heap.force(&total));
        assert!(matches!(total.node(), Node::Int(3)));
        assert_eq!(Arc::as_ptr(&total), before);
        assert_eq!(heap.forced(), 1);
    }

    #[test]
    fn set_arg_ties_cycles_and_checks_arity() {
        let heap = Heap::new();
        let ones = heap.con(":", vec![heap.int(1), heap.con("[]", vec![])]);
        heap.set_arg(&ones, 1, ones.clone()).unwrap();
        let Node::Con { args, .. } = ones.node() else {
            panic!("not a constructor");
        };
        assert!(Arc::ptr_eq(&args[1], &ones));

        assert!(heap.set_arg(&ones, 2, heap.int(0)).is_err());
        assert!(heap.set_arg(&heap.int(0), 0, heap.int(0)).is_err());
        // Untie so the test does not leak the cycle.
        ones.set_arg(1, heap.con("[]", vec![])).unwrap();
    }

    #[test]
    fn collect_forgets_dropped_cells() {
        let heap = Heap::new();
        let kept = heap.int(1);
        drop(heap.int(2));
        assert_eq!(heap.collect(), 1);
        assert_eq!(heap.live(), 1);
        drop(kept);
        assert_eq!(heap.collect(), 0);
    }
}
