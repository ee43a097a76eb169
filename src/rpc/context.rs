//! Request-scoped value chain.
//!
//! A [`Context`] is immutable. Adding a value derives a new context that
//! points back at its parent, so a context handed to inner middleware never
//! changes under the caller's feet. Keys are types: a key type that is
//! private to a module cannot collide with anyone else's.

use std::any::{Any, TypeId};
use std::sync::Arc;

struct Entry {
    key: TypeId,
    value: Arc<dyn Any + Send + Sync>,
    parent: Option<Arc<Entry>>,
}

/// Immutable, cheaply cloned chain of typed values.
#[derive(Clone, Default)]
pub struct Context {
    head: Option<Arc<Entry>>,
}

impl Context {
    /// The empty root context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context that carries `value` under key type `K`.
    ///
    /// An older value under the same key is shadowed, not replaced.
    pub fn with_value<K: 'static, V: Send + Sync + 'static>(&self, value: V) -> Self {
        Self {
            head: Some(Arc::new(Entry {
                key: TypeId::of::<K>(),
                value: Arc::new(value),
                parent: self.head.clone(),
            })),
        }
    }

    /// The nearest value stored under `K`, if it has type `V`.
    ///
    /// A value of another type under `K` reads as absent.
    pub fn value<K: 'static, V: 'static>(&self) -> Option<&V> {
        let key = TypeId::of::<K>();
        let mut node = self.head.as_deref();
        while let Some(entry) = node {
            if entry.key == key {
                return entry.value.downcast_ref::<V>();
            }
            node = entry.parent.as_deref();
        }
        None
    }

    /// Number of values in the chain, shadowed ones included.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut node = self.head.as_deref();
        while let Some(entry) = node {
            depth += 1;
            node = entry.parent.as_deref();
        }
        depth
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").field("depth", &self.depth()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NameKey;
    struct OtherKey;

    #[test]
    fn background_is_empty() {
        let ctx = Context::background();
        assert_eq!(ctx.depth(), 0);
        assert!(ctx.value::<NameKey, String>().is_none());
    }

    #[test]
    fn derived_context_leaves_parent_untouched() {
        let parent = Context::background();
        let child = parent.with_value::<NameKey, _>("svc".to_owned());

        assert_eq!(child.value::<NameKey, String>().map(String::as_str), Some("svc"));
        assert!(parent.value::<NameKey, String>().is_none());
    }

    #[test]
    fn nearest_value_wins() {
        let ctx = Context::background()
            .with_value::<NameKey, _>(1u32)
            .with_value::<OtherKey, _>("x")
            .with_value::<NameKey, _>(2u32);

        assert_eq!(ctx.value::<NameKey, u32>(), Some(&2));
        assert_eq!(ctx.value::<OtherKey, &str>(), Some(&"x"));
        assert_eq!(ctx.depth(), 3);
    }

    #[test]
    fn wrong_type_reads_as_absent() {
        let ctx = Context::background().with_value::<NameKey, _>(7i64);
        assert!(ctx.value::<NameKey, u32>().is_none());
    }
}
