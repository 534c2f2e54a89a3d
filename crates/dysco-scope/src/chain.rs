//! Walking from a scope to the scopes that enclose it.
//!
//! The current scope is created eagerly; enclosing scopes are only found,
//! never created. A scope is materialized only for a frame that performed
//! an access itself.

use std::sync::Arc;

use dysco_types::Namespace;

use crate::frame::FrameStorage;
use crate::registry::ScopeRegistry;
use crate::scope::{ScopeFrame, ScopeKey, ScopeValue};

/// Find the nearest existing scope enclosing `scope`.
///
/// `frames` are the frames outward of the ones already consumed to reach
/// `scope`, innermost first. Returns the parent together with the frames
/// outward of it, or `None` when no frame in `frames` owns a scope in the
/// same namespace.
pub fn find_parent_scope<'f, K: ScopeKey, V: ScopeValue>(
    registry: &ScopeRegistry,
    scope: &Arc<ScopeFrame<K, V>>,
    frames: &'f [Arc<FrameStorage>],
) -> Option<(Arc<ScopeFrame<K, V>>, &'f [Arc<FrameStorage>])> {
    frames.iter().enumerate().find_map(|(i, frame)| {
        let parent = registry.find_existing::<K, V>(frame, scope.namespace())?;
        (!Arc::ptr_eq(&parent, scope)).then(|| (parent, &frames[i + 1..]))
    })
}

/// The scope chain of a stack snapshot: the current scope, then each
/// enclosing scope, innermost first.
///
/// Parents are looked up lazily as the chain advances. The chain owns its
/// snapshot, so frames left after it was taken stay alive until the chain
/// is dropped.
pub struct ScopeChain<K, V> {
    registry: ScopeRegistry,
    frames: Vec<Arc<FrameStorage>>,
    cursor: usize,
    current: Arc<ScopeFrame<K, V>>,
    next: Option<Arc<ScopeFrame<K, V>>>,
}

impl<K: ScopeKey, V: ScopeValue> ScopeChain<K, V> {
    /// A chain starting at `current`, whose enclosing scopes are searched
    /// for in `frames` (innermost first, excluding `current`'s own frame).
    pub fn new(
        registry: ScopeRegistry,
        current: Arc<ScopeFrame<K, V>>,
        frames: Vec<Arc<FrameStorage>>,
    ) -> Self {
        Self {
            registry,
            frames,
            cursor: 0,
            next: Some(Arc::clone(&current)),
            current,
        }
    }

    /// Resolve the scope of `frame` in `namespace`, creating it if needed,
    /// and start a chain there.
    pub fn start(
        registry: ScopeRegistry,
        frame: &FrameStorage,
        frames: Vec<Arc<FrameStorage>>,
        namespace: &Namespace,
    ) -> Self {
        let current = registry.resolve::<K, V>(frame, namespace);
        Self::new(registry, current, frames)
    }

    /// The scope the chain started at.
    pub fn current(&self) -> &Arc<ScopeFrame<K, V>> {
        &self.current
    }
}

impl<K: ScopeKey, V: ScopeValue> Iterator for ScopeChain<K, V> {
    type Item = Arc<ScopeFrame<K, V>>;

    fn next(&mut self) -> Option<Self::Item> {
        let scope = self.next.take()?;
        let remaining = self.frames.get(self.cursor..).unwrap_or_default();
        if let Some((parent, rest)) = find_parent_scope(&self.registry, &scope, remaining) {
            self.cursor = self.frames.len() - rest.len();
            self.next = Some(parent);
        }
        Some(scope)
    }
}
