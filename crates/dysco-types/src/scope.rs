use std::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::FrameId;
use crate::namespace::Namespace;

/// Identity of one logical scope.
///
/// A `ScopeId` is the BLAKE3 hash of the owning frame, the namespace, and a
/// tag naming the binding types. Resolving the same triple always yields the
/// same id, so the id doubles as the registry key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId([u8; 32]);

impl ScopeId {
    /// Derive the identity of the scope owned by `frame` in `namespace`.
    ///
    /// `bindings` distinguishes scope families that share a frame and a
    /// namespace but store different key or value types.
    pub fn derive(frame: FrameId, namespace: &Namespace, bindings: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"dysco-scope-v1:");
        hasher.update(&frame.to_le_bytes());
        hasher.update(b":");
        hasher.update(&(namespace.as_str().len() as u64).to_le_bytes());
        hasher.update(namespace.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(bindings.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Create from a pre-computed hash.
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte hash.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeId({})", self.short_hex())
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_hex())
    }
}
