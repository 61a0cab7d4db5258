use heapvis_types::{Graph, GraphEdge, HeapSnapshot, NodeId, NodeLabel, TrackedObject};
use tracing::debug;

/// Build the reference graph of one snapshot.
///
/// Every entry becomes a node labeled with its fields and one port per slot,
/// every filled slot becomes an edge leaving that port, and every tracked
/// object gets a name node whose single edge carries the bound label.
pub fn build_graph(heap: &HeapSnapshot, tracked: &[TrackedObject]) -> Graph {
    let mut graph = Graph::default();

    for entry in heap.entries() {
        let slots = entry.slots();
        let source = entry.id as NodeId;
        graph.nodes.insert(
            source,
            NodeLabel {
                fields: entry.fields(),
                port_count: slots.len(),
            },
        );
        for (slot, target) in slots.iter().enumerate() {
            let Some(target) = target else {
                continue;
            };
            graph.edges.push(GraphEdge {
                from: source,
                to: *target as NodeId,
                name: String::new(),
                slot,
            });
        }
    }

    // Most recent registration gets -1, the one before it -2, and so on.
    for (index, object) in tracked.iter().rev().enumerate() {
        let name_id = -(index as NodeId) - 1;
        graph.nodes.insert(name_id, NodeLabel::name());
        match heap.entry_of(&object.object) {
            Some(target) => graph.edges.push(GraphEdge {
                from: name_id,
                to: target as NodeId,
                name: object.label.clone(),
                slot: 0,
            }),
            None => debug!(label = %object.label, "tracked object missing from snapshot"),
        }
    }

    // Slots can point past what the traversal bound kept.
    let dangling = graph
        .edges
        .iter()
        .filter(|edge| !graph.nodes.contains_key(&edge.to))
        .count();
    if dangling > 0 {
        debug!(dangling, "dropping edges to entries outside the snapshot");
        let nodes = &graph.nodes;
        graph.edges.retain(|edge| nodes.contains_key(&edge.to));
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapvis_types::{Closure, Entry, ObjectRef, is_name_node};
    use std::sync::Arc;

    fn fields(items: &[&str]) -> Closure {
        Closure::Fields(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn two_element_list_produces_cells_and_slot_edges() {
        let list = Arc::new("b");
        let heap = HeapSnapshot::new([
            Entry::new(0, fields(&[":"]), vec![Some(1), Some(2)])
                .with_object(ObjectRef::new(&list)),
            Entry::new(1, fields(&["I#", "1"]), vec![]),
            Entry::new(2, fields(&[":"]), vec![Some(3), Some(4)]),
            Entry::new(3, fields(&["I#", "2"]), vec![]),
            Entry::new(4, fields(&["[]"]), vec![]),
        ]);
        let tracked = vec![TrackedObject::new(ObjectRef::new(&list), "b")];
        let graph = build_graph(&heap, &tracked);

        let names: Vec<_> = graph.name_nodes().collect();
        assert_eq!(names, vec![-1]);
        assert_eq!(graph.nodes.len(), 6);
        assert_eq!(graph.nodes[&-1], NodeLabel::name());
        assert_eq!(graph.nodes[&0].port_count, 2);

        let root_edge = graph.edges.iter().find(|e| e.from == -1).unwrap();
        assert_eq!(root_edge.to, 0);
        assert_eq!(root_edge.name, "b");
        assert_eq!(root_edge.slot, 0);

        let cell_edges: Vec<_> = graph
            .edges
            .iter()
            .filter(|e| e.from == 0)
            .map(|e| (e.to, e.slot))
            .collect();
        assert_eq!(cell_edges, vec![(1, 0), (2, 1)]);
    }

    #[test]
    fn every_entry_edge_leaves_an_existing_port() {
        let heap = HeapSnapshot::new([
            Entry::new(0, fields(&["T"]), vec![Some(1), None, Some(0), Some(1)]),
            Entry::new(
                1,
                Closure::Bytecode {
                    instructions: vec![vec![Some(0)], vec![None, Some(1)]],
                },
                vec![Some(0), Some(1)],
            ),
        ]);
        let graph = build_graph(&heap, &[]);
        for edge in graph.edges.iter().filter(|e| !is_name_node(e.from)) {
            assert!(edge.slot < graph.nodes[&edge.from].port_count, "{edge:?}");
        }
        // Multigraph: both slot 0 and slot 3 of entry 0 point at entry 1.
        let to_one = graph
            .edges
            .iter()
            .filter(|e| e.from == 0 && e.to == 1)
            .count();
        assert_eq!(to_one, 2);
    }

    #[test]
    fn bytecode_label_counts_all_instruction_slots() {
        let heap = HeapSnapshot::new([
            Entry::new(
                0,
                Closure::Bytecode {
                    instructions: vec![vec![Some(1), None], vec![Some(1)], vec![]],
                },
                vec![Some(1)],
            ),
            Entry::new(1, fields(&["()"]), vec![]),
        ]);
        let graph = build_graph(&heap, &[]);
        assert_eq!(
            graph.nodes[&0],
            NodeLabel {
                fields: vec!["BCO".to_string()],
                port_count: 3
            }
        );
        let slots: Vec<_> = graph.edges.iter().map(|e| e.slot).collect();
        assert_eq!(slots, vec![0, 2]);
    }

    #[test]
    fn name_ids_follow_reverse_registration_order() {
        let a = Arc::new(1u8);
        let b = Arc::new(2u8);
        let c = Arc::new(3u8);
        let heap = HeapSnapshot::new([
            Entry::new(0, fields(&["a"]), vec![]).with_object(ObjectRef::new(&a)),
            Entry::new(1, fields(&["b"]), vec![]).with_object(ObjectRef::new(&b)),
            Entry::new(2, fields(&["c"]), vec![]).with_object(ObjectRef::new(&c)),
        ]);
        let tracked = vec![
            TrackedObject::new(ObjectRef::new(&a), "a"),
            TrackedObject::new(ObjectRef::new(&b), "b"),
            TrackedObject::new(ObjectRef::new(&c), "c"),
        ];
        let graph = build_graph(&heap, &tracked);
        let label_of = |id: NodeId| {
            graph
                .edges
                .iter()
                .find(|e| e.from == id)
                .map(|e| e.name.clone())
                .unwrap()
        };
        assert_eq!(label_of(-1), "c");
        assert_eq!(label_of(-2), "b");
        assert_eq!(label_of(-3), "a");
    }

    #[test]
    fn collected_object_keeps_its_name_node_without_edge() {
        let gone = Arc::new(0u8);
        let handle = ObjectRef::new(&gone);
        drop(gone);
        let graph = build_graph(
            &HeapSnapshot::default(),
            &[TrackedObject::new(handle, "gone")],
        );
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn edges_past_the_traversal_bound_are_dropped() {
        let heap = HeapSnapshot::new([Entry::new(0, fields(&["Just"]), vec![Some(7)])]);
        let graph = build_graph(&heap, &[]);
        assert_eq!(graph.nodes[&0].port_count, 1);
        assert!(graph.edges.is_empty());
    }
}
