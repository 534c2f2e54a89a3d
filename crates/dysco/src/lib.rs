//! Dynamic (call-chain) scoping.
//!
//! A [`DynamicScope`] is a namespace whose bindings are resolved against the
//! frames active on the calling thread instead of a fixed map. Frames are
//! entered explicitly with [`enter`] (or [`with_frame`]); each frame that
//! touches a scope gets its own bindings, which disappear when the frame is
//! left.
//!
//! ```
//! use dysco::{with_frame, DynamicScope};
//!
//! let scope: DynamicScope<String, i64> = DynamicScope::new();
//! let _request = dysco::enter();
//! scope.set("depth".into(), 1).unwrap();
//!
//! with_frame(|| {
//!     assert_eq!(scope.get(&"depth".into()), Ok(1));
//!     scope.set("depth".into(), 2).unwrap();
//!     scope.set("local".into(), 0).unwrap();
//! });
//!
//! assert_eq!(scope.get(&"depth".into()), Ok(2));
//! assert!(!scope.contains(&"local".into()));
//! ```
//!
//! # Policies
//!
//! - **default** — writes update the nearest scope binding the key, or bind
//!   in the current scope.
//! - **read-only** ([`ScopeConfig::read_only`]) — writes and deletes that
//!   would touch an enclosing scope fail with
//!   [`DyscoError::ReadOnlyViolation`].
//! - **shadow** ([`ScopeConfig::shadow`]) — writes always bind in the
//!   current scope, hiding outer bindings from inner frames.
//!
//! # Design Rules
//!
//! 1. A handle never holds bindings; it resolves scopes on every call.
//! 2. A frame's scope is owned by the frame and dies with it.
//! 3. Enclosing scopes are found, never created, by a lookup.
//! 4. Frames on other threads are never visible.
//! 5. Handles refuse to be serialized.

pub mod config;
pub mod dynamic;
pub mod error;
pub mod global;
pub mod iter;

pub use config::ScopeConfig;
pub use dynamic::DynamicScope;
pub use error::{DyscoError, DyscoResult};
pub use global::g;
pub use iter::Iter;

// Re-export the frame API so callers need a single dependency.
pub use dysco_scope::{enter, enter_named, with_frame, FrameGuard, ScopeRegistry};
pub use dysco_types::{Namespace, ScopeId};
