//! Per-frame local storage.
//!
//! A [`FrameStorage`] is pushed for every entered frame. Its `locals` table
//! owns the scopes created against the frame; everything else (the
//! registry, chain walks, dynamic scope handles) only observes them.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dysco_types::{FrameId, Namespace, ScopeId};

pub(crate) type ErasedScope = Arc<dyn Any + Send + Sync>;

/// Key of one frame-local slot: the registry that created the scope, plus
/// the scope's identity.
pub(crate) type LocalKey = (u64, ScopeId);

/// What pushed a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// Bottom of a thread's stack. Lives until the thread exits.
    Root,
    /// An ordinary frame entered by caller code.
    Call,
    /// A frame belonging to accessor machinery. Chain walks in the given
    /// namespace skip it.
    HiddenFrom(Namespace),
}

/// The local storage block of one frame.
pub struct FrameStorage {
    id: FrameId,
    kind: FrameKind,
    label: Option<String>,
    locals: Mutex<HashMap<LocalKey, ErasedScope>>,
}

impl FrameStorage {
    pub(crate) fn new(kind: FrameKind, label: Option<String>) -> Self {
        Self {
            id: FrameId::next(),
            kind,
            label,
            locals: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> FrameId {
        self.id
    }

    pub fn kind(&self) -> &FrameKind {
        &self.kind
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.kind == FrameKind::Root
    }

    /// Returns `true` if chain walks in `namespace` must not see this frame.
    pub fn is_hidden_from(&self, namespace: &Namespace) -> bool {
        matches!(&self.kind, FrameKind::HiddenFrom(ns) if ns == namespace)
    }

    /// Number of scopes this frame currently owns.
    pub fn local_count(&self) -> usize {
        self.locals().len()
    }

    /// Take ownership of a scope, returning whatever the slot held before.
    ///
    /// The displaced scope is handed back so the caller can drop it outside
    /// any registry lock.
    pub(crate) fn store_local(&self, key: LocalKey, scope: ErasedScope) -> Option<ErasedScope> {
        self.locals().insert(key, scope)
    }

    /// Returns `true` if the slot for `key` holds the allocation at `ptr`.
    pub(crate) fn holds(&self, key: &LocalKey, ptr: *const ()) -> bool {
        self.locals()
            .get(key)
            .is_some_and(|held| Arc::as_ptr(held) as *const () == ptr)
    }

    fn locals(&self) -> MutexGuard<'_, HashMap<LocalKey, ErasedScope>> {
        self.locals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for FrameStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameStorage")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("local_count", &self.local_count())
            .finish()
    }
}
