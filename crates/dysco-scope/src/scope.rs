//! The logical scope owned by one frame.

use std::fmt;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError, Weak};

use dysco_types::{FrameId, Namespace, ScopeId};
use indexmap::IndexMap;

use crate::registry::RegistryState;

/// Bounds on keys bound in a scope.
pub trait ScopeKey: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> ScopeKey for T where T: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static {}

/// Bounds on values bound in a scope.
pub trait ScopeValue: Clone + Send + Sync + 'static {}

impl<T> ScopeValue for T where T: Clone + Send + Sync + 'static {}

/// Bindings of one (frame, namespace) pair.
///
/// Bindings keep insertion order. Overwriting a key keeps its position;
/// removing a key keeps the order of the rest.
///
/// A `ScopeFrame` is owned by its frame's storage. When the last strong
/// reference drops, it removes itself from the registry that created it.
pub struct ScopeFrame<K, V> {
    id: ScopeId,
    frame: FrameId,
    namespace: Namespace,
    bindings: RwLock<IndexMap<K, V>>,
    registry: Weak<RegistryState>,
}

impl<K: ScopeKey, V: ScopeValue> ScopeFrame<K, V> {
    pub(crate) fn new(
        id: ScopeId,
        frame: FrameId,
        namespace: Namespace,
        registry: Weak<RegistryState>,
    ) -> Self {
        Self {
            id,
            frame,
            namespace,
            bindings: RwLock::new(IndexMap::new()),
            registry,
        }
    }

    /// Tag folded into the scope identity so that families with different
    /// key or value types never collide.
    pub fn bindings_tag() -> &'static str {
        std::any::type_name::<(K, V)>()
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.read().get(key).cloned()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.read().contains_key(key)
    }

    /// Bind `key`, returning the previous value if there was one.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.write().insert(key, value)
    }

    /// Unbind `key`, returning its value if it was bound.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.write().shift_remove(key)
    }

    /// All bindings in insertion order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// All bound keys in insertion order.
    pub fn keys(&self) -> Vec<K> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<K, V>> {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<K, V>> {
        self.bindings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, V> ScopeFrame<K, V> {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// The frame whose storage owns this scope.
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Display name, e.g. `_dysco_requests_1a2b3c4d`.
    pub fn name(&self) -> String {
        let slug = self.namespace.slug();
        if slug.is_empty() {
            format!("_dysco_{}", self.id.short_hex())
        } else {
            format!("_dysco_{slug}_{}", self.id.short_hex())
        }
    }
}

impl<K, V> Drop for ScopeFrame<K, V> {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.release(self.frame, self.id);
        }
    }
}

impl<K, V> fmt::Debug for ScopeFrame<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ScopeFrame")
            .field("id", &self.id)
            .field("frame", &self.frame)
            .field("namespace", &self.namespace)
            .field("bindings", &bound)
            .finish()
    }
}
