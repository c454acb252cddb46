//! Caller identity attached to a [`crate::Context`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller identity, resolved externally and attached to a root [`crate::Context`].
///
/// `kind` is a free-form tag; `"system"` is the one value the ACL engine
/// recognizes specifically (via the `@system` pattern token).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub attrs: HashMap<String, serde_json::Value>,
}

fn default_kind() -> String {
    "user".to_string()
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: default_kind(),
            roles: Vec::new(),
            attrs: HashMap::new(),
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this identity carries the reserved `"system"` kind.
    pub fn is_system(&self) -> bool {
        self.kind == "system"
    }
}
