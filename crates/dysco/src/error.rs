use thiserror::Error;

/// Errors from dynamic scope operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DyscoError {
    /// No scope in the chain binds the key.
    #[error("{key} was not found in any scope")]
    NotFound { key: String },

    /// A write or delete targeted an enclosing scope of a read-only handle.
    #[error("{key} is bound in an enclosing scope and this handle is read-only")]
    ReadOnlyViolation { key: String },

    /// The requested configuration is contradictory or unparseable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Dynamic scopes are tied to live frames and cannot be persisted.
    #[error("dynamic scopes cannot be serialized")]
    Unserializable,
}

impl DyscoError {
    pub(crate) fn not_found(key: &impl std::fmt::Debug) -> Self {
        Self::NotFound {
            key: format!("{key:?}"),
        }
    }

    pub(crate) fn read_only(key: &impl std::fmt::Debug) -> Self {
        Self::ReadOnlyViolation {
            key: format!("{key:?}"),
        }
    }
}

/// Result alias for dynamic scope operations.
pub type DyscoResult<T> = Result<T, DyscoError>;
