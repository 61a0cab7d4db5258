use std::collections::{BTreeSet, HashMap, VecDeque};

use heapvis_types::{EntryId, HeapSnapshot, NodeId};
use tracing::debug;

use super::text::LineWriter;
use super::{Scene, ViewContext};
use crate::Snapshot;

/// Nesting beyond this is elided.
const MAX_TERM_DEPTH: usize = 64;

/// Each tracked value written as a term, one binding per line.
///
/// Entries referenced more than once get a name (`t0`, `t1`, ...) and are
/// written on their own line, which also keeps cycles finite.
#[derive(Debug, Clone)]
pub struct ListView {
    pub(super) scene: Scene,
}

impl ListView {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(false),
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn update_objects(&mut self, snapshot: &Snapshot, ctx: &ViewContext<'_>) {
        let mut writer = LineWriter::new(&ctx.style.font, ctx.style.font_size);
        write_terms(&mut writer, snapshot);
        debug!(
            font = writer.font(),
            tracked = snapshot.tracked.len(),
            "list view rebuilt"
        );
        self.scene.set_layout(writer.finish());
    }
}

impl Default for ListView {
    fn default() -> Self {
        Self::new()
    }
}

fn write_terms(writer: &mut LineWriter, snapshot: &Snapshot) {
    let heap = &snapshot.heap;
    let roots: Vec<Option<EntryId>> = snapshot
        .tracked
        .iter()
        .map(|t| heap.entry_of(&t.object))
        .collect();
    let shared = shared_entries(heap, &roots);
    let names: HashMap<EntryId, String> = shared
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, format!("t{i}")))
        .collect();
    let terms = Terms { heap, names: &names };

    for (tracked, root) in snapshot.tracked.iter().zip(&roots) {
        writer.plain(&format!("{} = ", tracked.label));
        match root {
            Some(id) => terms.reference(writer, *id, false, 0),
            None => writer.plain("<collected>"),
        }
        writer.newline();
    }
    for id in &shared {
        writer.plain(&format!("{} = ", names[id]));
        terms.body(writer, *id, false, 0);
        writer.newline();
    }
}

/// Entries reached more than once from the roots, in discovery order.
fn shared_entries(heap: &HeapSnapshot, roots: &[Option<EntryId>]) -> Vec<EntryId> {
    let mut counts: HashMap<EntryId, usize> = HashMap::new();
    let mut order = Vec::new();
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::new();

    let mut visit = |id: EntryId, queue: &mut VecDeque<EntryId>| {
        if heap.get(id).is_none() {
            return;
        }
        *counts.entry(id).or_default() += 1;
        if seen.insert(id) {
            order.push(id);
            queue.push_back(id);
        }
    };

    for root in roots.iter().flatten() {
        visit(*root, &mut queue);
    }
    while let Some(id) = queue.pop_front() {
        let Some(entry) = heap.get(id) else {
            continue;
        };
        for target in entry.slots().iter().flatten() {
            visit(*target, &mut queue);
        }
    }

    order.into_iter().filter(|id| counts[id] > 1).collect()
}

struct Terms<'a> {
    heap: &'a HeapSnapshot,
    names: &'a HashMap<EntryId, String>,
}

impl Terms<'_> {
    /// A use of `id`: its name if it has one, otherwise its body inline.
    fn reference(&self, writer: &mut LineWriter, id: EntryId, nested: bool, depth: usize) {
        if let Some(name) = self.names.get(&id) {
            let object = self.heap.get(id).and_then(|e| e.object.clone());
            writer.span(name, Some(id as NodeId), object);
            return;
        }
        self.body(writer, id, nested, depth);
    }

    /// Constructor and payload fields followed by one argument per slot.
    fn body(&self, writer: &mut LineWriter, id: EntryId, nested: bool, depth: usize) {
        let Some(entry) = self.heap.get(id) else {
            writer.plain("…");
            return;
        };
        if depth > MAX_TERM_DEPTH {
            writer.plain("…");
            return;
        }
        let owner = Some(id as NodeId);
        let fields = entry.fields();
        let slots = entry.slots();
        let parens = nested && fields.len() + slots.len() > 1;

        if parens {
            writer.plain("(");
        }
        let (head, payload) = match fields.split_first() {
            Some((head, payload)) => (head.as_str(), payload),
            None => ("_", &[][..]),
        };
        writer.span(head, owner, entry.object.clone());
        for field in payload {
            writer.plain(" ");
            writer.span(field, owner, None);
        }
        for slot in slots.iter() {
            writer.plain(" ");
            match slot {
                Some(target) if self.heap.get(*target).is_some() => {
                    self.reference(writer, *target, true, depth + 1)
                }
                Some(_) => writer.plain("…"),
                None => writer.plain("_"),
            }
        }
        if parens {
            writer.plain(")");
        }
    }
}
