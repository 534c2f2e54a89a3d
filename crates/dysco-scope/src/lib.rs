//! Frame-owned scope storage for dynamic scoping.
//!
//! This crate provides the machinery below the user-facing `DynamicScope`:
//! an explicit per-thread call stack, the scopes that frames own, the
//! registry that finds a frame's scope again, and the walk from a scope to
//! its enclosing scopes.
//!
//! # Architecture
//!
//! - **Frames** are pushed with [`enter`] and popped when the returned
//!   [`FrameGuard`] drops. Every thread starts with a root frame that lives
//!   until the thread exits.
//! - **Scopes** ([`ScopeFrame`]) are created lazily, one per (frame,
//!   namespace, binding types). The frame's storage holds the only strong
//!   reference, so a scope dies with its frame.
//! - **The registry** ([`ScopeRegistry`]) indexes live scopes weakly and
//!   forgets them as they drop.
//! - **The chain** ([`ScopeChain`]) yields the current scope and then each
//!   enclosing scope that already exists, innermost first.
//!
//! # Modules
//!
//! - [`error`] — Error types for frame exits
//! - [`frame`] — [`FrameStorage`], the per-frame local storage block
//! - [`stack`] — The thread-local call stack and [`FrameGuard`]
//! - [`scope`] — [`ScopeFrame`] and its binding bounds
//! - [`registry`] — [`ScopeRegistry`]
//! - [`chain`] — [`find_parent_scope`] and [`ScopeChain`]

pub mod chain;
pub mod error;
pub mod frame;
pub mod registry;
pub mod scope;
pub mod stack;

pub use chain::{find_parent_scope, ScopeChain};
pub use error::{ScopeError, ScopeResult};
pub use frame::{FrameKind, FrameStorage};
pub use registry::ScopeRegistry;
pub use scope::{ScopeFrame, ScopeKey, ScopeValue};
pub use stack::{
    current_frame, depth, enter, enter_hidden_from, enter_named, snapshot, with_frame, FrameGuard,
};
