use std::iter::FusedIterator;
use std::vec;

use dysco_scope::{ScopeChain, ScopeKey, ScopeValue};

/// Iterator over every binding visible from where it was created.
///
/// Scopes are visited innermost first and each scope's bindings are yielded
/// in insertion order. A scope's bindings are copied when the iterator
/// reaches it. The iterator cannot be restarted; call
/// [`DynamicScope::iter`](crate::DynamicScope::iter) again instead.
pub struct Iter<K, V> {
    chain: ScopeChain<K, V>,
    pending: vec::IntoIter<(K, V)>,
}

impl<K: ScopeKey, V: ScopeValue> Iter<K, V> {
    pub(crate) fn new(chain: ScopeChain<K, V>) -> Self {
        Self {
            chain,
            pending: Vec::new().into_iter(),
        }
    }
}

impl<K: ScopeKey, V: ScopeValue> Iterator for Iter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(pair) = self.pending.next() {
                return Some(pair);
            }
            let scope = self.chain.next()?;
            self.pending = scope.entries().into_iter();
        }
    }
}

impl<K: ScopeKey, V: ScopeValue> FusedIterator for Iter<K, V> {}
