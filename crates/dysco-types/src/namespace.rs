use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag partitioning otherwise identical frames into independent scope
/// families.
///
/// Two dynamic scopes only share bindings when they share a namespace. The
/// empty namespace is the shared default family.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// A namespace with the given tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// A fresh namespace no other handle shares.
    pub fn unique() -> Self {
        Self(format!("dysco-{}", uuid::Uuid::now_v7()))
    }

    /// The raw tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the shared default family.
    pub fn is_shared_default(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercased tag with every character outside `[a-z0-9]` mapped to `_`.
    ///
    /// Runs of unmapped characters collapse into one underscore and leading
    /// or trailing underscores are dropped.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.0.len());
        let mut pending = false;
        for c in self.0.chars().flat_map(char::to_lowercase) {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                if pending && !slug.is_empty() {
                    slug.push('_');
                }
                pending = false;
                slug.push(c);
            } else {
                pending = true;
            }
        }
        slug
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Namespace {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for Namespace {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}
