//! Companion metadata files (§6): module metadata, dependency declarations,
//! and the ID-override map used by multi-root discovery.

use forge_core::error::{ForgeError, Result};
use forge_types::{ModuleAnnotations, ModuleExample};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One declared dependency edge, as it appears in a module metadata file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DependencyDecl {
    /// The dependency's module id.
    pub module_id: String,
    /// Optional version constraint, carried through but not enforced here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Missing optional dependencies are warned and skipped rather than
    /// raising during discovery.
    #[serde(default)]
    pub optional: bool,
}

/// Optional companion file next to a module source file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModuleMetadata {
    /// Overrides the module's own `name()`.
    #[serde(default)]
    pub name: Option<String>,
    /// Overrides the module's own `description()`.
    #[serde(default)]
    pub description: Option<String>,
    /// Overrides the module's own `documentation()`.
    #[serde(default)]
    pub documentation: Option<String>,
    /// Merged with (not replacing) the module's own `tags()`.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Overrides the module's own `version()`.
    #[serde(default)]
    pub version: Option<String>,
    /// Declared dependency edges, consumed by discovery's topological sort.
    #[serde(default)]
    pub dependencies: Vec<DependencyDecl>,
    /// Overrides the module's own `annotations()`.
    #[serde(default)]
    pub annotations: Option<ModuleAnnotations>,
    /// Merged with the module's own `examples()`.
    #[serde(default)]
    pub examples: Vec<ModuleExample>,
    /// Merged into the module's own `metadata()`.
    #[serde(default)]
    pub metadata: Value,
    /// `filename:ClassName`-shaped override for entry-point resolution.
    #[serde(default)]
    pub entry_point: Option<String>,
}

impl ModuleMetadata {
    /// Load a metadata file from `path`, if it exists. Returns `Ok(None)`
    /// when the file is simply absent.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path).map_err(|e| ForgeError::ConfigInvalid {
            message: format!("failed to read metadata file {}: {e}", path.display()),
        })?;
        let parsed: ModuleMetadata = serde_yaml::from_str(&contents).map_err(|e| ForgeError::ConfigInvalid {
            message: format!("invalid metadata file {}: {e}", path.display()),
        })?;
        Ok(Some(parsed))
    }
}

/// One entry in the ID-override map (§6): redirects a scanned file's
/// auto-derived id and/or entry-point class.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdOverrideEntry {
    /// Root-relative path of the file this override applies to.
    pub file: String,
    /// Replacement canonical id.
    pub id: String,
    /// Optional entry-point class/selector override.
    #[serde(default)]
    pub class: Option<String>,
}

/// The on-disk ID-override map format: `mappings: [ {file, id, class?} ]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IdOverrideMap {
    /// Override entries, matched against a scanned file's root-relative path.
    #[serde(default)]
    pub mappings: Vec<IdOverrideEntry>,
}

impl IdOverrideMap {
    /// Load an ID-override map from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ForgeError::ConfigNotFound {
            path: format!("{}: {e}", path.display()),
        })?;
        serde_yaml::from_str(&contents).map_err(|e| ForgeError::ConfigInvalid {
            message: format!("invalid id-override map {}: {e}", path.display()),
        })
    }

    /// Look up the override entry for `relative_path`, if any.
    pub fn get(&self, relative_path: &str) -> Option<&IdOverrideEntry> {
        self.mappings.iter().find(|m| m.file == relative_path)
    }
}
