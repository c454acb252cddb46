//! Read-only projection of a registered module, suitable for external
//! descriptor exporters (MCP, OpenAI, Anthropic tool-calling formats).

use forge_core::id::ModuleId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Behavioral flags surfaced alongside a module's schemas.
///
/// Mirrors the small enumerated set the specification names; unknown keys
/// in a metadata file are simply absent here rather than rejected, since
/// annotations are advisory, not load-bearing for the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAnnotations {
    /// The module only reads; it never mutates external state.
    #[serde(default)]
    pub readonly: bool,
    /// The module may cause irreversible side effects.
    #[serde(default)]
    pub destructive: bool,
    /// Calling the module twice with the same inputs has the same effect as once.
    #[serde(default)]
    pub idempotent: bool,
    /// A human should approve invocation before it runs.
    #[serde(default)]
    pub requires_approval: bool,
    /// The module may reach arbitrary external systems, not a closed set.
    #[serde(default)]
    pub open_world: bool,
}

/// One worked example attached to a module's descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleExample {
    /// Short label for the example.
    pub title: String,
    /// Example input value.
    pub inputs: Value,
    /// Expected output value for `inputs`.
    pub output: Value,
    /// Optional prose explaining the example.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Language-neutral, read-only record describing a registered module.
///
/// Built by the registry from a [`crate::module::Module`] plus any merged
/// metadata-file fields (§6 of the specification); never constructed by a
/// module implementation itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Registry key / ACL matching target.
    pub module_id: ModuleId,
    /// Optional human-readable name distinct from `module_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// One-line description.
    pub description: String,
    /// Optional longer-form documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    /// JSON-Schema-shaped input contract.
    pub input_schema: Value,
    /// JSON-Schema-shaped output contract.
    pub output_schema: Value,
    /// Semver-ish version, defaulting to `"1.0.0"`.
    #[serde(default = "default_version")]
    pub version: String,
    /// Free-form tags, from the module's own `tags()` merged with metadata.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Behavioral flags, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<ModuleAnnotations>,
    /// Worked examples.
    #[serde(default)]
    pub examples: Vec<ModuleExample>,
    /// Free-form metadata merged into the descriptor.
    #[serde(default)]
    pub metadata: Value,
}
