//! The user-facing dynamic scope handle.
//!
//! A [`DynamicScope`] holds no bindings itself. Every operation snapshots
//! the calling thread's frames, resolves the scope of the innermost visible
//! frame, and walks outward through the scopes enclosing it.

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dysco_scope::{
    stack, FrameGuard, FrameStorage, ScopeChain, ScopeKey, ScopeRegistry, ScopeValue,
};
use dysco_types::{Namespace, ScopeId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::trace;

use crate::config::ScopeConfig;
use crate::error::{DyscoError, DyscoResult};
use crate::iter::Iter;

/// A namespace whose bindings resolve along the calling thread's frames.
///
/// Reads walk outward from the innermost frame until a scope binds the key.
/// Writes update the nearest binding, or bind in the innermost scope when
/// nothing binds the key yet. Read-only handles refuse to touch enclosing
/// scopes; shadowing handles always write to the innermost scope.
///
/// Frames are entered explicitly with [`dysco_scope::enter`]. A frame's
/// scope lives exactly as long as the frame.
pub struct DynamicScope<K = String, V = Value> {
    namespace: Namespace,
    read_only: bool,
    shadow: bool,
    stack_depth: Mutex<usize>,
    registry: ScopeRegistry,
    _bindings: PhantomData<fn() -> (K, V)>,
}

impl<K: ScopeKey, V: ScopeValue> DynamicScope<K, V> {
    /// A default handle with a namespace of its own, on the global registry.
    pub fn new() -> Self {
        Self::from_parts(
            Namespace::unique(),
            &ScopeConfig::default(),
            ScopeRegistry::global().clone(),
        )
    }

    /// A handle configured by `config`, on the global registry.
    pub fn with_config(config: ScopeConfig) -> DyscoResult<Self> {
        Self::with_registry(config, ScopeRegistry::global().clone())
    }

    /// A handle configured by `config`, resolving scopes through `registry`.
    pub fn with_registry(config: ScopeConfig, registry: ScopeRegistry) -> DyscoResult<Self> {
        config.validate()?;
        let namespace = config
            .namespace
            .clone()
            .map_or_else(Namespace::unique, Namespace::from);
        Ok(Self::from_parts(namespace, &config, registry))
    }

    pub(crate) fn from_parts(
        namespace: Namespace,
        config: &ScopeConfig,
        registry: ScopeRegistry,
    ) -> Self {
        Self {
            namespace,
            read_only: config.read_only,
            shadow: config.shadow,
            stack_depth: Mutex::new(config.stack_depth),
            registry,
            _bindings: PhantomData,
        }
    }

    /// A handle addressing the same scopes with different policy flags.
    ///
    /// The namespace and registry are shared; `config.namespace` is ignored.
    /// The derived handle starts with its own `stack_depth` counter.
    pub fn derive(&self, config: ScopeConfig) -> DyscoResult<Self> {
        config.validate()?;
        Ok(Self::from_parts(
            self.namespace.clone(),
            &config,
            self.registry.clone(),
        ))
    }

    /// A read-only handle over the same scopes.
    pub fn read_only_view(&self) -> Self {
        let config = ScopeConfig::read_only().with_stack_depth(self.stack_depth());
        Self::from_parts(self.namespace.clone(), &config, self.registry.clone())
    }

    // ---------------------------------------------------------------
    // Operations
    // ---------------------------------------------------------------

    /// The value bound to `key` in the nearest scope that binds it.
    pub fn get(&self, key: &K) -> DyscoResult<V> {
        self.chain()
            .find_map(|scope| scope.get(key))
            .ok_or_else(|| DyscoError::not_found(key))
    }

    /// Bind `key` to `value`.
    ///
    /// Shadowing handles bind in the current scope. Otherwise the nearest
    /// scope already binding `key` is overwritten, unless it encloses the
    /// current scope and the handle is read-only. Unbound keys are bound in
    /// the current scope.
    pub fn set(&self, key: K, value: V) -> DyscoResult<()> {
        let chain = self.chain();
        let current = Arc::clone(chain.current());

        if !self.shadow {
            let defining = chain
                .enumerate()
                .find(|(_, scope)| scope.contains_key(&key));
            if let Some((depth, scope)) = defining {
                if depth > 0 && self.read_only {
                    return Err(DyscoError::read_only(&key));
                }
                trace!(scope = %scope.id(), depth, "overwriting binding");
                scope.insert(key, value);
                return Ok(());
            }
        }

        trace!(scope = %current.id(), "binding locally");
        current.insert(key, value);
        Ok(())
    }

    /// Unbind `key` from the nearest scope binding it, returning its value.
    pub fn delete(&self, key: &K) -> DyscoResult<V> {
        let (depth, scope) = self
            .chain()
            .enumerate()
            .find(|(_, scope)| scope.contains_key(key))
            .ok_or_else(|| DyscoError::not_found(key))?;
        if depth > 0 && self.read_only {
            return Err(DyscoError::read_only(key));
        }
        trace!(scope = %scope.id(), depth, "unbinding");
        scope.remove(key).ok_or_else(|| DyscoError::not_found(key))
    }

    /// Returns `true` if some scope in the chain binds `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.get(key).is_ok()
    }

    /// Every binding of every scope in the chain, innermost scope first.
    ///
    /// Keys bound in several scopes are yielded once per scope.
    pub fn iter(&self) -> Iter<K, V> {
        Iter::new(self.chain())
    }

    /// Identity of the current scope, creating the scope if needed.
    pub fn current_scope_id(&self) -> ScopeId {
        self.chain().current().id()
    }

    /// Enter a frame this handle does not see.
    ///
    /// Wrapper layers hold the guard around their own work so that scopes
    /// resolve as if the wrapper's caller performed the access. Other
    /// handles, and other threads, are unaffected.
    pub fn accessor(&self) -> FrameGuard {
        stack::enter_hidden_from(self.namespace.clone())
    }

    fn chain(&self) -> ScopeChain<K, V> {
        let (frame, outer) = self.snapshot();
        ScopeChain::start(self.registry.clone(), &frame, outer, &self.namespace)
    }

    /// The innermost visible frame and the frames outward of it.
    ///
    /// Skipping saturates at the outermost frame, so the thread's root frame
    /// is always visible.
    fn snapshot(&self) -> (Arc<FrameStorage>, Vec<Arc<FrameStorage>>) {
        let depth = self.depth_guard();
        let visible: Vec<_> = stack::snapshot()
            .into_iter()
            .filter(|frame| !frame.is_hidden_from(&self.namespace))
            .collect();
        let skip = (*depth).min(visible.len().saturating_sub(1));
        drop(depth);

        let mut frames = visible.into_iter().skip(skip);
        let current = frames.next().unwrap_or_else(stack::current_frame);
        (current, frames.collect())
    }
}

impl<K, V> DynamicScope<K, V> {
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn is_shadow(&self) -> bool {
        self.shadow
    }

    pub fn registry(&self) -> &ScopeRegistry {
        &self.registry
    }

    /// Innermost frames skipped before resolving the current scope.
    pub fn stack_depth(&self) -> usize {
        *self.depth_guard()
    }

    pub fn set_stack_depth(&self, stack_depth: usize) {
        *self.depth_guard() = stack_depth;
    }

    fn depth_guard(&self) -> MutexGuard<'_, usize> {
        self.stack_depth.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K: ScopeKey, V: ScopeValue> Default for DynamicScope<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for DynamicScope<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicScope")
            .field("namespace", &self.namespace)
            .field("read_only", &self.read_only)
            .field("shadow", &self.shadow)
            .field("stack_depth", &self.stack_depth())
            .finish()
    }
}

impl<K, V> Serialize for DynamicScope<K, V> {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(<S::Error as serde::ser::Error>::custom(
            DyscoError::Unserializable,
        ))
    }
}

impl<'de, K, V> Deserialize<'de> for DynamicScope<K, V> {
    fn deserialize<D: Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
        Err(<D::Error as serde::de::Error>::custom(
            DyscoError::Unserializable,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dysco_scope::{enter, with_frame};
    use proptest::prelude::*;
    use std::collections::HashMap;

    type Scope = DynamicScope<String, i64>;

    fn scope_with(config: ScopeConfig) -> Scope {
        Scope::with_registry(config, ScopeRegistry::new()).unwrap()
    }

    fn scope() -> Scope {
        scope_with(ScopeConfig::default())
    }

    fn k(key: &str) -> String {
        key.to_string()
    }

    // -----------------------------------------------------------------------
    // Point lookups and writes
    // -----------------------------------------------------------------------

    #[test]
    fn get_missing_key_is_not_found() {
        let s = scope();
        let _outer = enter();
        assert_eq!(
            s.get(&k("x")),
            Err(DyscoError::NotFound { key: "\"x\"".into() })
        );
        assert!(!s.contains(&k("x")));
    }

    #[test]
    fn set_then_get_in_same_frame() {
        let s = scope();
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        assert_eq!(s.get(&k("x")), Ok(1));
        s.set(k("x"), 2).unwrap();
        assert_eq!(s.get(&k("x")), Ok(2));
    }

    #[test]
    fn inner_frames_read_outer_bindings() {
        let s = scope();
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| {
            with_frame(|| assert_eq!(s.get(&k("x")), Ok(1)));
        });
    }

    #[test]
    fn keys_set_in_a_callee_vanish_on_return() {
        let s = scope();
        let _outer = enter();
        with_frame(|| {
            s.set(k("local"), 1).unwrap();
            assert_eq!(s.get(&k("local")), Ok(1));
        });
        assert!(!s.contains(&k("local")));
    }

    #[test]
    fn writes_propagate_to_the_defining_scope() {
        let s = scope();
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| {
            assert_eq!(s.get(&k("x")), Ok(1));
            s.set(k("x"), 2).unwrap();
        });
        assert_eq!(s.get(&k("x")), Ok(2));
    }

    #[test]
    fn sibling_calls_see_each_others_outer_writes() {
        let s = scope();
        let _outer = enter();
        s.set(k("first"), 1).unwrap();
        s.set(k("second"), 2).unwrap();

        let flip = |key: &str| {
            with_frame(|| {
                let v = s.get(&k(key)).unwrap();
                s.set(k(key), -v).unwrap();
            })
        };

        flip("first");
        assert_eq!(s.get(&k("first")), Ok(-1));
        assert_eq!(s.get(&k("second")), Ok(2));

        flip("second");
        assert_eq!(s.get(&k("first")), Ok(-1));
        assert_eq!(s.get(&k("second")), Ok(-2));

        flip("first");
        flip("second");
        assert_eq!(s.get(&k("first")), Ok(1));
        assert_eq!(s.get(&k("second")), Ok(2));
    }

    #[test]
    fn loop_iterations_observe_previous_writes() {
        let s = scope();
        let _outer = enter();
        s.set(k("hello"), -1).unwrap();
        for i in 0..20 {
            assert_eq!(s.get(&k("hello")), Ok(i - 1));
            s.set(k("hello"), i).unwrap();
        }
    }

    #[test]
    fn loop_of_calls_observes_previous_writes() {
        let s = scope();
        let _outer = enter();
        s.set(k("n"), 0).unwrap();
        for i in 0..20 {
            with_frame(|| {
                assert_eq!(s.get(&k("n")), Ok(i));
                s.set(k("n"), i + 1).unwrap();
            });
        }
        assert_eq!(s.get(&k("n")), Ok(20));
    }

    // -----------------------------------------------------------------------
    // Policies
    // -----------------------------------------------------------------------

    #[test]
    fn read_only_rejects_writes_to_enclosing_scopes() {
        let s = scope_with(ScopeConfig::read_only());
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| {
            assert_eq!(
                s.set(k("x"), 2),
                Err(DyscoError::ReadOnlyViolation { key: "\"x\"".into() })
            );
            s.set(k("mine"), 3).unwrap();
            s.set(k("mine"), 4).unwrap();
            assert_eq!(s.get(&k("mine")), Ok(4));
        });
        assert_eq!(s.get(&k("x")), Ok(1));
        assert!(!s.contains(&k("mine")));
    }

    #[test]
    fn read_only_rejects_deletes_in_enclosing_scopes() {
        let s = scope_with(ScopeConfig::read_only());
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| {
            assert!(matches!(
                s.delete(&k("x")),
                Err(DyscoError::ReadOnlyViolation { .. })
            ));
        });
        assert_eq!(s.get(&k("x")), Ok(1));
        assert_eq!(s.delete(&k("x")), Ok(1));
    }

    #[test]
    fn shadow_writes_stay_local() {
        let s = scope_with(ScopeConfig::shadow());
        let _outer = enter();
        s.set(k("x"), 1).unwrap();

        with_frame(|| {
            s.set(k("x"), 2).unwrap();
            assert_eq!(s.get(&k("x")), Ok(2));
            with_frame(|| assert_eq!(s.get(&k("x")), Ok(2)));
        });
        with_frame(|| assert_eq!(s.get(&k("x")), Ok(1)));

        assert_eq!(s.get(&k("x")), Ok(1));
    }

    #[test]
    fn exclusive_flags_are_rejected() {
        let config = ScopeConfig {
            read_only: true,
            shadow: true,
            ..Default::default()
        };
        assert!(matches!(
            Scope::with_registry(config.clone(), ScopeRegistry::new()),
            Err(DyscoError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            scope().derive(config),
            Err(DyscoError::InvalidConfiguration(_))
        ));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_local_binding() {
        let s = scope();
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        assert_eq!(s.delete(&k("x")), Ok(1));
        assert!(!s.contains(&k("x")));
        assert!(matches!(s.delete(&k("x")), Err(DyscoError::NotFound { .. })));
    }

    #[test]
    fn delete_reaches_enclosing_scope() {
        let s = scope();
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| assert_eq!(s.delete(&k("x")), Ok(1)));
        assert!(!s.contains(&k("x")));
    }

    #[test]
    fn delete_uncovers_shadowed_binding() {
        let s = scope_with(ScopeConfig::shadow());
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| {
            s.set(k("x"), 2).unwrap();
            assert_eq!(s.delete(&k("x")), Ok(2));
            assert_eq!(s.get(&k("x")), Ok(1));
        });
    }

    // -----------------------------------------------------------------------
    // Iteration
    // -----------------------------------------------------------------------

    #[test]
    fn iteration_yields_inner_scope_first() {
        let s = scope();
        let _outer = enter();
        s.set(k("a"), 1).unwrap();
        with_frame(|| {
            s.set(k("b"), 2).unwrap();
            let pairs: Vec<_> = s.iter().collect();
            assert_eq!(pairs, vec![(k("b"), 2), (k("a"), 1)]);
        });
    }

    #[test]
    fn iteration_keeps_insertion_order_within_a_scope() {
        let s = scope();
        let _outer = enter();
        for (key, v) in [("z", 1), ("y", 2), ("x", 3)] {
            s.set(k(key), v).unwrap();
        }
        let keys: Vec<_> = s.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec!["z", "y", "x"]);
    }

    #[test]
    fn iteration_surfaces_shadowed_bindings() {
        let s = scope_with(ScopeConfig::shadow());
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| {
            s.set(k("x"), 2).unwrap();
            let pairs: Vec<_> = s.iter().collect();
            assert_eq!(pairs, vec![(k("x"), 2), (k("x"), 1)]);
        });
    }

    #[test]
    fn iteration_is_finite_and_not_restartable() {
        let s = scope();
        let _outer = enter();
        s.set(k("a"), 1).unwrap();
        let mut it = s.iter();
        assert_eq!(it.next(), Some((k("a"), 1)));
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
    }

    // -----------------------------------------------------------------------
    // Namespaces, registries, threads
    // -----------------------------------------------------------------------

    #[test]
    fn handles_do_not_share_scopes_by_default() {
        let registry = ScopeRegistry::new();
        let a = Scope::with_registry(ScopeConfig::default(), registry.clone()).unwrap();
        let b = Scope::with_registry(ScopeConfig::default(), registry).unwrap();
        let _outer = enter();
        a.set(k("x"), 1).unwrap();
        assert!(!b.contains(&k("x")));
        assert_ne!(a.current_scope_id(), b.current_scope_id());
    }

    #[test]
    fn handles_in_one_namespace_share_scopes() {
        let registry = ScopeRegistry::new();
        let config = ScopeConfig::default().with_namespace("shared");
        let a = Scope::with_registry(config.clone(), registry.clone()).unwrap();
        let b = Scope::with_registry(config, registry).unwrap();
        let _outer = enter();
        a.set(k("x"), 1).unwrap();
        assert_eq!(b.get(&k("x")), Ok(1));
        assert_eq!(a.current_scope_id(), b.current_scope_id());
    }

    #[test]
    fn derived_views_share_bindings_but_not_policy() {
        let s = scope();
        let view = s.read_only_view();
        assert!(view.is_read_only());
        assert_eq!(view.namespace(), s.namespace());

        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        with_frame(|| {
            assert_eq!(view.get(&k("x")), Ok(1));
            assert!(view.set(k("x"), 2).is_err());
            s.set(k("x"), 3).unwrap();
        });
        assert_eq!(view.get(&k("x")), Ok(3));
    }

    #[test]
    fn derived_handles_get_their_own_depth_counter() {
        let s = scope();
        let derived = s.derive(ScopeConfig::shadow()).unwrap();
        s.set_stack_depth(3);
        assert_eq!(derived.stack_depth(), 0);
        assert!(derived.is_shadow());
    }

    #[test]
    fn scopes_are_released_when_frames_end() {
        let registry = ScopeRegistry::new();
        let s = Scope::with_registry(ScopeConfig::default(), registry.clone()).unwrap();
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        let baseline = registry.len();

        let inner_id = with_frame(|| {
            s.set(k("y"), 2).unwrap();
            assert_eq!(registry.len(), baseline + 1);
            s.current_scope_id()
        });

        assert!(!registry.contains(&inner_id));
        assert_eq!(registry.len(), baseline);
    }

    #[test]
    fn reads_do_not_materialize_enclosing_scopes() {
        let registry = ScopeRegistry::new();
        let s = Scope::with_registry(ScopeConfig::default(), registry.clone()).unwrap();
        let _a = enter();
        let _b = enter();
        let _c = enter();
        assert!(!s.contains(&k("x")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn other_threads_do_not_see_bindings() {
        let s = scope();
        let _outer = enter();
        s.set(k("x"), 1).unwrap();
        std::thread::scope(|t| {
            t.spawn(|| {
                assert!(!s.contains(&k("x")));
                s.set(k("x"), 2).unwrap();
                assert_eq!(s.get(&k("x")), Ok(2));
            });
        });
        assert_eq!(s.get(&k("x")), Ok(1));
    }

    #[test]
    fn concurrent_use_of_one_handle() {
        let s = scope();
        std::thread::scope(|t| {
            for worker in 0..4i64 {
                let s = &s;
                t.spawn(move || {
                    let _outer = enter();
                    s.set(k("id"), worker).unwrap();
                    for _ in 0..50 {
                        with_frame(|| {
                            assert_eq!(s.get(&k("id")), Ok(worker));
                            s.set(k("scratch"), worker).unwrap();
                        });
                    }
                    assert!(!s.contains(&k("scratch")));
                });
            }
        });
    }

    // -----------------------------------------------------------------------
    // Skipping accessor frames
    // -----------------------------------------------------------------------

    fn helper_set(s: &Scope, key: &str, value: i64) {
        let _helper = enter();
        s.set(k(key), value).unwrap();
    }

    #[test]
    fn helper_frames_own_new_keys_without_skipping() {
        let s = scope();
        let _outer = enter();
        helper_set(&s, "x", 1);
        assert!(!s.contains(&k("x")));
    }

    #[test]
    fn stack_depth_skips_helper_frames() {
        let s = scope_with(ScopeConfig::default().with_stack_depth(1));
        let _outer = enter();
        helper_set(&s, "x", 1);
        s.set_stack_depth(0);
        assert_eq!(s.get(&k("x")), Ok(1));
    }

    #[test]
    fn stack_depth_saturates_at_the_root() {
        std::thread::spawn(|| {
            let s = scope_with(ScopeConfig::default().with_stack_depth(100));
            s.set(k("x"), 1).unwrap();
            let _inner = enter();
            assert_eq!(s.get(&k("x")), Ok(1));
        })
        .join()
        .unwrap();
    }

    #[test]
    fn accessor_frames_are_transparent_to_their_handle() {
        let s = scope();
        let other = scope();
        let _outer = enter();

        {
            let _accessor = s.accessor();
            s.set(k("x"), 1).unwrap();
            other.set(k("x"), 1).unwrap();
        }

        assert_eq!(s.get(&k("x")), Ok(1));
        assert!(!other.contains(&k("x")));
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    #[test]
    fn serialization_is_refused() {
        let s = scope();
        let err = serde_json::to_string(&s).unwrap_err();
        assert!(err.to_string().contains("cannot be serialized"));
        assert!(serde_json::from_str::<Scope>("{}").is_err());
    }

    // -----------------------------------------------------------------------
    // Model check
    // -----------------------------------------------------------------------

    #[derive(Clone, Debug)]
    enum Op {
        Enter,
        Exit,
        Set(&'static str, i64),
        Get(&'static str),
        Delete(&'static str),
    }

    fn op() -> impl Strategy<Value = Op> {
        let key = prop::sample::select(vec!["a", "b", "c"]);
        prop_oneof![
            Just(Op::Enter),
            Just(Op::Exit),
            (key.clone(), any::<i64>()).prop_map(|(key, v)| Op::Set(key, v)),
            key.clone().prop_map(Op::Get),
            key.prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn default_mode_matches_frame_model(ops in prop::collection::vec(op(), 0..64)) {
            let s = scope();
            let mut guards = vec![enter()];
            let mut model: Vec<HashMap<&str, i64>> = vec![HashMap::new()];

            for op in ops {
                match op {
                    Op::Enter => {
                        guards.push(enter());
                        model.push(HashMap::new());
                    }
                    Op::Exit if guards.len() > 1 => {
                        guards.pop();
                        model.pop();
                    }
                    Op::Exit => {}
                    Op::Set(key, v) => {
                        s.set(k(key), v).unwrap();
                        match model.iter_mut().rev().find(|m| m.contains_key(key)) {
                            Some(m) => { m.insert(key, v); }
                            None => { model.last_mut().unwrap().insert(key, v); }
                        }
                    }
                    Op::Get(key) => {
                        let expected = model.iter().rev().find_map(|m| m.get(key).copied());
                        prop_assert_eq!(s.get(&k(key)).ok(), expected);
                    }
                    Op::Delete(key) => {
                        let expected = model.iter_mut().rev().find_map(|m| m.remove(key));
                        prop_assert_eq!(s.delete(&k(key)).ok(), expected);
                    }
                }
            }

            while guards.pop().is_some() {}
        }
    }
}
