use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use crate::ObjectRef;

/// Identifier of an entry inside one raw heap snapshot. Always non-negative.
pub type EntryId = usize;

// ── Decoded closures ────────────────────────────────────────────

/// Decoded representation of an entry's payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Closure {
    /// An ordinary closure, described by its field strings (constructor name,
    /// unboxed payload, and so on).
    Fields(Vec<String>),
    /// A byte-code object. Each instruction group lists the heap slots its
    /// instructions refer to; the concatenation of all groups is the object's
    /// outgoing pointer list.
    Bytecode { instructions: Vec<Vec<Option<EntryId>>> },
}

/// One node of a raw snapshot.
#[derive(Clone, Debug)]
pub struct Entry {
    pub id: EntryId,
    /// Handle to the object this entry was decoded from, if the provider has one.
    pub object: Option<ObjectRef>,
    pub closure: Closure,
    /// Outgoing references in slot order. `None` marks a slot whose target is
    /// unknown or was cut off by the traversal bound.
    pub pointers: Vec<Option<EntryId>>,
}

impl Entry {
    pub fn new(id: EntryId, closure: Closure, pointers: Vec<Option<EntryId>>) -> Self {
        Self {
            id,
            object: None,
            closure,
            pointers,
        }
    }

    pub fn with_object(mut self, object: ObjectRef) -> Self {
        self.object = Some(object);
        self
    }

    pub fn is_bytecode(&self) -> bool {
        matches!(self.closure, Closure::Bytecode { .. })
    }

    /// The slots that back this entry's ports, in port order.
    pub fn slots(&self) -> Cow<'_, [Option<EntryId>]> {
        match &self.closure {
            Closure::Fields(_) => Cow::Borrowed(&self.pointers),
            Closure::Bytecode { instructions } => {
                Cow::Owned(instructions.iter().flatten().copied().collect())
            }
        }
    }

    /// Field strings shown in front of the ports.
    pub fn fields(&self) -> Vec<String> {
        match &self.closure {
            Closure::Fields(fields) => fields.clone(),
            Closure::Bytecode { .. } => vec!["BCO".to_string()],
        }
    }
}

// ── Raw snapshot ────────────────────────────────────────────────

/// A map of entries captured at one instant, plus an identity index from
/// object handles to entry ids.
#[derive(Clone, Debug, Default)]
pub struct HeapSnapshot {
    entries: BTreeMap<EntryId, Entry>,
    by_object: HashMap<ObjectRef, EntryId>,
}

impl HeapSnapshot {
    pub fn new(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut snapshot = Self::default();
        for entry in entries {
            snapshot.insert(entry);
        }
        snapshot
    }

    pub fn insert(&mut self, entry: Entry) {
        if let Some(object) = &entry.object {
            self.by_object.insert(object.clone(), entry.id);
        }
        self.entries.insert(entry.id, entry);
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(&id)
    }

    /// Entry id of the given object, if the snapshot reached it.
    pub fn entry_of(&self, object: &ObjectRef) -> Option<EntryId> {
        self.by_object.get(object).copied()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn bytecode_slots_concatenate_instruction_groups() {
        let entry = Entry::new(
            0,
            Closure::Bytecode {
                instructions: vec![vec![Some(1), None], vec![Some(2)]],
            },
            vec![],
        );
        assert_eq!(entry.slots().as_ref(), &[Some(1), None, Some(2)]);
        assert_eq!(entry.fields(), vec!["BCO".to_string()]);
    }

    #[test]
    fn snapshot_indexes_entries_by_object_identity() {
        let a = Arc::new(1u8);
        let b = Arc::new(1u8);
        let snapshot = HeapSnapshot::new([
            Entry::new(0, Closure::Fields(vec!["I#".into(), "1".into()]), vec![])
                .with_object(ObjectRef::new(&a)),
        ]);
        assert_eq!(snapshot.entry_of(&ObjectRef::new(&a)), Some(0));
        assert_eq!(snapshot.entry_of(&ObjectRef::new(&b)), None);
    }
}
