//! Weak index of live scopes.
//!
//! [`ScopeRegistry`] maps scope identities to scopes and frames to the
//! identities created against them. It never owns a scope: entries point
//! at scopes weakly and are removed by [`ScopeFrame`]'s `Drop`, so the
//! registry shrinks back as frames are left.
//!
//! # Concurrency
//!
//! Both tables sit behind one `RwLock`. Lookups take the read lock,
//! creation and release take the write lock. A strong reference upgraded
//! under the lock is never the last one dropped under it, because dropping
//! the last reference re-enters the registry to release the scope. An
//! entry whose weak reference no longer upgrades counts as a miss.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use dysco_types::{FrameId, Namespace, ScopeId};
use tracing::{debug, trace};

use crate::frame::{ErasedScope, FrameStorage, LocalKey};
use crate::scope::{ScopeFrame, ScopeKey, ScopeValue};

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Default)]
struct Tables {
    scopes: HashMap<ScopeId, Weak<dyn Any + Send + Sync>>,
    names_by_frame: HashMap<FrameId, HashSet<ScopeId>>,
}

impl Tables {
    /// The live scope registered as `id` for `frame`, if any.
    fn live(&self, frame: FrameId, id: &ScopeId) -> Option<ErasedScope> {
        if !self.names_by_frame.get(&frame)?.contains(id) {
            return None;
        }
        self.scopes.get(id)?.upgrade()
    }
}

pub(crate) struct RegistryState {
    id: u64,
    tables: RwLock<Tables>,
}

impl RegistryState {
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget a scope whose last strong reference is gone.
    pub(crate) fn release(&self, frame: FrameId, id: ScopeId) {
        let mut tables = self.write();
        let dead = tables
            .scopes
            .get(&id)
            .is_some_and(|scope| scope.strong_count() == 0);
        if !dead {
            return;
        }
        tables.scopes.remove(&id);
        if let Some(names) = tables.names_by_frame.get_mut(&frame) {
            names.remove(&id);
            if names.is_empty() {
                tables.names_by_frame.remove(&frame);
            }
        }
        trace!(scope = %id, %frame, "released scope");
    }
}

/// Shared handle to a scope registry.
///
/// Cloning the handle shares the underlying tables. [`ScopeRegistry::global`]
/// is the process-wide default; handles built with [`ScopeRegistry::new`]
/// are fully independent of it.
#[derive(Clone)]
pub struct ScopeRegistry {
    state: Arc<RegistryState>,
}

impl ScopeRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RegistryState {
                id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
                tables: RwLock::new(Tables::default()),
            }),
        }
    }

    /// The process-wide registry.
    pub fn global() -> &'static ScopeRegistry {
        static GLOBAL: OnceLock<ScopeRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ScopeRegistry::new)
    }

    /// Returns the scope `frame` owns in `namespace`, creating it on a miss.
    ///
    /// Idempotent while the frame is alive: repeated calls return the same
    /// allocation.
    pub fn resolve<K: ScopeKey, V: ScopeValue>(
        &self,
        frame: &FrameStorage,
        namespace: &Namespace,
    ) -> Arc<ScopeFrame<K, V>> {
        if let Some(existing) = self.find_existing(frame, namespace) {
            return existing;
        }

        let id = ScopeId::derive(frame.id(), namespace, ScopeFrame::<K, V>::bindings_tag());
        let key = self.local_key(id);

        // Anything displaced here is dropped after the write lock is gone.
        let mut stale = None;
        let (scope, displaced) = {
            let mut tables = self.state.write();

            // Another thread holding this frame's storage may have created
            // the scope since the lookup.
            if let Some(live) = tables.live(frame.id(), &id) {
                if frame.holds(&key, addr(&live)) {
                    match live.downcast::<ScopeFrame<K, V>>() {
                        Ok(scope) => return scope,
                        Err(other) => stale = Some(other),
                    }
                } else {
                    stale = Some(live);
                }
            }

            let scope = Arc::new(ScopeFrame::<K, V>::new(
                id,
                frame.id(),
                namespace.clone(),
                Arc::downgrade(&self.state),
            ));
            let erased: ErasedScope = scope.clone();
            tables.scopes.insert(id, Arc::downgrade(&erased));
            tables.names_by_frame.entry(frame.id()).or_default().insert(id);
            let displaced = frame.store_local(key, erased);
            debug!(scope = %id, frame = %frame.id(), namespace = %namespace, "created scope");
            (scope, displaced)
        };
        drop(displaced);
        drop(stale);
        scope
    }

    /// Returns the scope `frame` owns in `namespace` without creating one.
    pub fn find_existing<K: ScopeKey, V: ScopeValue>(
        &self,
        frame: &FrameStorage,
        namespace: &Namespace,
    ) -> Option<Arc<ScopeFrame<K, V>>> {
        let id = ScopeId::derive(frame.id(), namespace, ScopeFrame::<K, V>::bindings_tag());
        let candidate = self.state.read().live(frame.id(), &id)?;
        if !frame.holds(&self.local_key(id), addr(&candidate)) {
            return None;
        }
        let scope = candidate.downcast::<ScopeFrame<K, V>>().ok()?;
        (scope.namespace() == namespace).then_some(scope)
    }

    /// Number of live scopes.
    pub fn len(&self) -> usize {
        self.state.read().scopes.len()
    }

    /// Returns `true` if no scope is live.
    pub fn is_empty(&self) -> bool {
        self.state.read().scopes.is_empty()
    }

    /// Returns `true` if the scope `id` is still registered.
    pub fn contains(&self, id: &ScopeId) -> bool {
        self.state.read().scopes.contains_key(id)
    }

    /// Number of frames owning at least one live scope.
    pub fn frame_count(&self) -> usize {
        self.state.read().names_by_frame.len()
    }

    /// Number of live scopes owned by `frame`.
    pub fn scopes_for_frame(&self, frame: FrameId) -> usize {
        self.state
            .read()
            .names_by_frame
            .get(&frame)
            .map_or(0, HashSet::len)
    }

    fn local_key(&self, id: ScopeId) -> LocalKey {
        (self.state.id, id)
    }
}

fn addr(scope: &ErasedScope) -> *const () {
    Arc::as_ptr(scope) as *const ()
}

impl Default for ScopeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScopeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.state.read();
        f.debug_struct("ScopeRegistry")
            .field("scope_count", &tables.scopes.len())
            .field("frame_count", &tables.names_by_frame.len())
            .finish()
    }
}
