use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

// ── Object handles ──────────────────────────────────────────────

/// A weak, non-owning handle to a live object.
///
/// Two handles are equal when they point at the same allocation. Because the
/// handle keeps the allocation's weak count up, the address cannot be reused
/// by another object while any handle to it exists.
#[derive(Clone)]
pub struct ObjectRef {
    inner: Weak<dyn Any + Send + Sync>,
}

impl ObjectRef {
    /// Downgrades a strong reference into a handle.
    pub fn new<T: Any + Send + Sync>(value: &Arc<T>) -> Self {
        let weak: Weak<T> = Arc::downgrade(value);
        Self { inner: weak }
    }

    /// Allocation address, used as the identity of the handle.
    pub fn addr(&self) -> usize {
        self.inner.as_ptr() as *const () as usize
    }

    /// Whether the object is still alive.
    pub fn is_live(&self) -> bool {
        self.inner.strong_count() > 0
    }

    pub fn upgrade(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        self.inner.upgrade()
    }

    /// Upgrades and downcasts in one step. `None` if the object is gone or has
    /// a different type.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner.upgrade()?.downcast::<T>().ok()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ObjectRef {}

impl Hash for ObjectRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x}", self.addr())?;
        if !self.is_live() {
            f.write_str(", dead")?;
        }
        f.write_str(")")
    }
}

// ── Tracked objects ─────────────────────────────────────────────

/// An object the user asked to watch, together with the name it was bound to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackedObject {
    pub object: ObjectRef,
    pub label: String,
}

impl TrackedObject {
    pub fn new(object: ObjectRef, label: impl Into<String>) -> Self {
        Self {
            object,
            label: label.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_identity_not_structure() {
        let a = Arc::new(vec![1, 2, 3]);
        let b = Arc::new(vec![1, 2, 3]);
        assert_eq!(ObjectRef::new(&a), ObjectRef::new(&a));
        assert_ne!(ObjectRef::new(&a), ObjectRef::new(&b));
    }

    #[test]
    fn handle_does_not_keep_object_alive() {
        let a = Arc::new(String::from("x"));
        let handle = ObjectRef::new(&a);
        assert!(handle.is_live());
        assert_eq!(handle.downcast::<String>().as_deref().map(String::as_str), Some("x"));
        drop(a);
        assert!(!handle.is_live());
        assert!(handle.downcast::<String>().is_none());
    }

    #[test]
    fn downcast_to_wrong_type_is_none() {
        let a = Arc::new(5u32);
        let handle = ObjectRef::new(&a);
        assert!(handle.downcast::<String>().is_none());
        assert_eq!(handle.downcast::<u32>().map(|v| *v), Some(5));
    }
}
