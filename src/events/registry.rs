use std::any::TypeId;
use std::sync::Arc;

use parking_lot::RwLock;

use super::link::Binding;
use super::types::AsyncPool;

/// The shared binding list, kept sorted by ascending priority ordinal.
///
/// Reads take a snapshot: the current `Arc` is cloned under a briefly-held
/// read lock and iterated without any lock, so concurrent `fire` calls never
/// serialize against each other or against writers. Writers rebuild the
/// vector and swap the `Arc`; an iteration in flight observes either the
/// pre- or post-mutation list, never a partial insert.
pub(crate) struct Registry {
    bindings: RwLock<Arc<Vec<Arc<Binding>>>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            bindings: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<Binding>>> {
        Arc::clone(&self.bindings.read())
    }

    /// Appends bindings and re-sorts by priority. The sort is stable, so
    /// bindings sharing a priority keep their registration order.
    pub(crate) fn insert(&self, incoming: Vec<Binding>) {
        let mut guard = self.bindings.write();
        let mut next: Vec<Arc<Binding>> = guard.iter().cloned().collect();
        next.extend(incoming.into_iter().map(Arc::new));
        next.sort_by_key(|binding| binding.priority());
        *guard = Arc::new(next);
    }

    /// Removes every binding owned by the given container type. Returns the
    /// number removed; zero matches is not an error.
    pub(crate) fn remove_owner(&self, owner: TypeId) -> usize {
        let mut guard = self.bindings.write();
        let next: Vec<Arc<Binding>> = guard
            .iter()
            .filter(|binding| binding.owner() != owner)
            .cloned()
            .collect();
        let removed = guard.len() - next.len();
        *guard = Arc::new(next);
        removed
    }

    pub(crate) fn contains_owner(&self, owner: TypeId) -> bool {
        self.bindings
            .read()
            .iter()
            .any(|binding| binding.owner() == owner)
    }

    /// Whether any registered binding is routed through the given pool.
    pub(crate) fn has_pool(&self, pool: AsyncPool) -> bool {
        self.bindings
            .read()
            .iter()
            .any(|binding| binding.pool() == Some(pool))
    }

    pub(crate) fn len(&self) -> usize {
        self.bindings.read().len()
    }
}
