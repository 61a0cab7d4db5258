use heapvis_types::{ObjectRef, TrackedObject};

/// Tracked objects in registration order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    objects: Vec<TrackedObject>,
}

impl Registry {
    /// Appends `object` unless the same handle is already registered under
    /// the same label. Returns whether it was added.
    pub fn insert(&mut self, object: TrackedObject) -> bool {
        if self.objects.contains(&object) {
            return false;
        }
        self.objects.push(object);
        true
    }

    pub fn clear(&mut self) {
        self.objects.clear();
    }

    pub fn tracked(&self) -> &[TrackedObject] {
        &self.objects
    }

    /// Handles of every tracked object, in registration order.
    pub fn roots(&self) -> Vec<ObjectRef> {
        self.objects.iter().map(|t| t.object.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn rejects_identical_pairs_only() {
        let a = Arc::new(1u8);
        let b = Arc::new(1u8);
        let mut registry = Registry::default();
        assert!(registry.insert(TrackedObject::new(ObjectRef::new(&a), "a")));
        assert!(!registry.insert(TrackedObject::new(ObjectRef::new(&a), "a")));
        // Same object under another name, and an equal value elsewhere, are both new.
        assert!(registry.insert(TrackedObject::new(ObjectRef::new(&a), "alias")));
        assert!(registry.insert(TrackedObject::new(ObjectRef::new(&b), "a")));
        assert_eq!(registry.len(), 3);

        let labels: Vec<_> = registry.tracked().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["a", "alias", "a"]);
        assert_eq!(registry.roots()[1], ObjectRef::new(&a));

        registry.clear();
        assert!(registry.is_empty());
    }
}
