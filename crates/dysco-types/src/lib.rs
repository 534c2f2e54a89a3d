//! Foundation types for dynamic scoping.
//!
//! Every other dysco crate depends on `dysco-types`.
//!
//! # Key Types
//!
//! - [`FrameId`] — Process-unique identity of one frame-local storage block
//! - [`Namespace`] — Tag partitioning scopes into independent families
//! - [`ScopeId`] — BLAKE3 identity of a (frame, namespace, binding types) triple

pub mod frame;
pub mod namespace;
pub mod scope;

pub use frame::FrameId;
pub use namespace::Namespace;
pub use scope::ScopeId;
