//! Dot-path configuration accessor.
//!
//! Thin wrapper over a JSON-shaped mapping, consulted by registry
//! discovery (`extensions.root`, `extensions.max_depth`,
//! `extensions.follow_symlinks`) and the binding loader. Carries no schema
//! of its own — callers supply the default, and a missing or
//! wrongly-shaped path falls back to it rather than erroring.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// A nested configuration mapping, read by dot-separated path.
#[derive(Debug, Clone, Default)]
pub struct Config {
    data: Value,
}

impl Config {
    /// Wrap an already-parsed JSON mapping.
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// Parse `yaml` into a `Config`.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let data: Value = serde_yaml::from_str(yaml)?;
        Ok(Self { data })
    }

    /// An empty config, equivalent to every `get` returning its default.
    pub fn empty() -> Self {
        Self { data: Value::Object(serde_json::Map::new()) }
    }

    /// Walk `key` (e.g. `"extensions.max_depth"`) segment by segment,
    /// returning `default` the moment a segment is missing, the current
    /// value is not a mapping, or the found value doesn't deserialize to
    /// `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let mut current = &self.data;
        for part in key.split('.') {
            match current.as_object().and_then(|obj| obj.get(part)) {
                Some(next) => current = next,
                None => return default,
            }
        }
        serde_json::from_value(current.clone()).unwrap_or(default)
    }
}
