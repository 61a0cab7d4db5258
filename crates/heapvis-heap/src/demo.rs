use std::sync::Arc;

use crate::{Heap, Node, Obj, int_list};

/// A small heap with a bit of everything: a list, a thunk over it, sharing,
/// a cycle and a byte-code object.
pub struct Demo {
    pub heap: Arc<Heap>,
    /// Labelled roots in the order they should be registered.
    pub bindings: Vec<(String, Obj)>,
}

impl Demo {
    pub fn build() -> Result<Self, String> {
        let heap = Arc::new(Heap::new());

        let xs = heap.list([heap.int(1), heap.int(2), heap.int(3)]);
        let total = heap.thunk("sum xs", vec![xs.clone()], |captured| {
            Node::Int(int_list(&captured[0]).unwrap_or_default().iter().sum())
        });
        let pair = heap.con("(,)", vec![xs.clone(), total.clone()]);

        let one = heap.int(1);
        let ones = heap.con(":", vec![one.clone(), one]);
        // Tying the knot; the cycle lives as long as the process.
        heap.set_arg(&ones, 1, ones.clone())
            .map_err(|e| format!("tie ones: {e}"))?;

        let double = heap.bytecode(
            "double",
            vec![vec![Some(heap.int(2)), None], vec![Some(total.clone())]],
        );

        let bindings = [
            ("xs", xs),
            ("total", total),
            ("pair", pair),
            ("ones", ones),
            ("double", double),
        ]
        .into_iter()
        .map(|(label, obj)| (label.to_string(), obj))
        .collect();
        Ok(Self { heap, bindings })
    }

    pub fn get(&self, label: &str) -> Option<&Obj> {
        self.bindings
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, obj)| obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_lazy_until_forced() {
        let demo = Demo::build().unwrap();
        let total = demo.get("total").unwrap();
        assert!(total.is_thunk());
        assert!(demo.heap.force(total));
        assert!(matches!(total.node(), Node::Int(6)));
        assert!(demo.get("missing").is_none());
    }

    #[test]
    fn ones_refers_to_itself() {
        let demo = Demo::build().unwrap();
        let ones = demo.get("ones").unwrap();
        let Node::Con { name, args } = ones.node() else {
            panic!("ones is not a constructor");
        };
        assert_eq!(name, ":");
        assert!(Arc::ptr_eq(&args[1], ones));
        assert!(matches!(args[0].node(), Node::Int(1)));
    }
}
