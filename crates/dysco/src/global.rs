use std::sync::OnceLock;

use dysco_scope::ScopeRegistry;
use dysco_types::Namespace;

use crate::config::ScopeConfig;
use crate::dynamic::DynamicScope;

/// The process-wide handle in the shared default namespace.
///
/// Keys are strings and values are JSON values. Every caller of `g()` reads
/// and writes the same scope family, on the global registry.
pub fn g() -> &'static DynamicScope {
    static GLOBAL: OnceLock<DynamicScope> = OnceLock::new();
    GLOBAL.get_or_init(|| {
        DynamicScope::from_parts(
            Namespace::default(),
            &ScopeConfig::default(),
            ScopeRegistry::global().clone(),
        )
    })
}
