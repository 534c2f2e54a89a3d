use serde::{Deserialize, Serialize};

use crate::error::{DyscoError, DyscoResult};

/// Configuration for a [`DynamicScope`](crate::DynamicScope).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeConfig {
    /// Reject writes and deletes that would land in an enclosing scope.
    pub read_only: bool,
    /// Bind every write in the innermost scope, hiding outer bindings.
    pub shadow: bool,
    /// Innermost frames to skip before resolving the current scope, for
    /// wrappers that enter frames of their own.
    pub stack_depth: usize,
    /// Scope family to join. `None` gives the handle a family of its own.
    pub namespace: Option<String>,
}

impl ScopeConfig {
    /// Writes may only touch keys the innermost scope already owns or
    /// creates.
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    /// Every write binds locally.
    pub fn shadow() -> Self {
        Self {
            shadow: true,
            ..Default::default()
        }
    }

    /// Join the scope family named `namespace`.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_stack_depth(mut self, stack_depth: usize) -> Self {
        self.stack_depth = stack_depth;
        self
    }

    /// Reject contradictory flag combinations.
    pub fn validate(&self) -> DyscoResult<()> {
        if self.read_only && self.shadow {
            return Err(DyscoError::InvalidConfiguration(
                "read_only and shadow are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a configuration from TOML.
    pub fn from_toml_str(source: &str) -> DyscoResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| DyscoError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
