//! Schema validation and projection surface.
//!
//! Schemas themselves are opaque `serde_json::Value` trees to the core —
//! only a [`Validator`] implementation knows how to check a value against
//! one and how to project it into a [`SchemaShape`] the redaction layer can
//! walk to find sensitive leaves.

use forge_core::error::FieldError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The sentinel redacted values are replaced with in `ctx.redactedInputs`.
pub const REDACTED_SENTINEL: &str = "***REDACTED***";

/// Outcome of validating a value against a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the value satisfies the schema.
    pub valid: bool,
    /// Ordered `{field, code, message}` triples; empty when `valid`.
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    /// A successful validation result.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A failed validation result carrying the given field errors.
    pub fn failed(errors: Vec<FieldError>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// A schema's shape, projected into a generic tree the core can walk
/// without understanding the schema language itself.
///
/// A leaf carries whether it is marked `"sensitive"` in the source schema;
/// objects and arrays recurse into their children.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaShape {
    /// A scalar leaf, optionally marked sensitive.
    Leaf {
        /// Whether the schema marks this leaf `"sensitive": true`.
        sensitive: bool,
    },
    /// An object with named, individually-shaped properties.
    Object {
        /// Per-property shape, keyed by property name.
        properties: BTreeMap<String, SchemaShape>,
    },
    /// An array whose items all share one shape.
    Array {
        /// Shape shared by every array element.
        items: Box<SchemaShape>,
    },
}

impl SchemaShape {
    /// Project a JSON-Schema-shaped value into a [`SchemaShape`].
    ///
    /// Recognizes `type: object` with `properties`, `type: array` with
    /// `items`, and otherwise treats the node as a leaf. The custom keyword
    /// `sensitive: true` marks a leaf (or an array's item shape) for
    /// redaction; it is not part of JSON Schema proper but is ignored by
    /// conforming validators, so it costs nothing to carry alongside the
    /// schema that's also used for structural validation.
    pub fn project(schema: &Value) -> Self {
        let obj = match schema.as_object() {
            Some(obj) => obj,
            None => return SchemaShape::Leaf { sensitive: false },
        };

        let sensitive = obj.get("sensitive").and_then(Value::as_bool).unwrap_or(false);

        match obj.get("type").and_then(Value::as_str) {
            Some("object") => {
                let properties = obj
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|props| {
                        props
                            .iter()
                            .map(|(k, v)| (k.clone(), SchemaShape::project(v)))
                            .collect()
                    })
                    .unwrap_or_default();
                SchemaShape::Object { properties }
            }
            Some("array") => {
                let items = obj
                    .get("items")
                    .map(SchemaShape::project)
                    .unwrap_or(SchemaShape::Leaf { sensitive });
                SchemaShape::Array {
                    items: Box::new(items),
                }
            }
            _ => SchemaShape::Leaf { sensitive },
        }
    }
}

/// Schema validator interface the core depends on but never implements
/// directly. (a) structural validation producing an ordered list of field
/// errors on failure, (b) projection to [`SchemaShape`] for redaction and
/// descriptor export.
pub trait Validator: Send + Sync {
    /// Validate `value` against `schema`.
    fn validate(&self, schema: &Value, value: &Value) -> ValidationResult;

    /// Project `schema` to its generic shape.
    fn project(&self, schema: &Value) -> SchemaShape {
        SchemaShape::project(schema)
    }
}

/// Default [`Validator`] backed by the `jsonschema` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSchemaValidator;

impl Validator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, value: &Value) -> ValidationResult {
        let validator = match jsonschema::validator_for(schema) {
            Ok(v) => v,
            Err(e) => {
                return ValidationResult::failed(vec![FieldError {
                    field: "$".to_string(),
                    code: "SCHEMA_PARSE_ERROR".to_string(),
                    message: e.to_string(),
                }]);
            }
        };

        let errors: Vec<FieldError> = validator
            .iter_errors(value)
            .map(|e| FieldError {
                field: e.instance_path.to_string(),
                code: "SCHEMA_VALIDATION_ERROR".to_string(),
                message: e.to_string(),
            })
            .collect();

        if errors.is_empty() {
            ValidationResult::ok()
        } else {
            ValidationResult::failed(errors)
        }
    }
}

/// Replace every value under a sensitive leaf, and any top-level key
/// beginning with `_secret_`, with [`REDACTED_SENTINEL`].
///
/// Idempotent: redacting an already-redacted value is a no-op, since the
/// sentinel replaces the original value wholesale rather than transforming
/// it in place.
pub fn redact_sensitive(value: &Value, shape: &SchemaShape) -> Value {
    redact_inner(value, shape, true)
}

fn redact_inner(value: &Value, shape: &SchemaShape, top_level: bool) -> Value {
    match shape {
        SchemaShape::Leaf { sensitive } => {
            if *sensitive {
                Value::String(REDACTED_SENTINEL.to_string())
            } else {
                value.clone()
            }
        }
        SchemaShape::Array { items } => match value.as_array() {
            Some(arr) => Value::Array(
                arr.iter()
                    .map(|item| redact_inner(item, items, false))
                    .collect(),
            ),
            None => value.clone(),
        },
        SchemaShape::Object { properties } => match value.as_object() {
            Some(obj) => {
                let mut out = serde_json::Map::new();
                for (key, val) in obj {
                    if top_level && key.starts_with("_secret_") {
                        out.insert(key.clone(), Value::String(REDACTED_SENTINEL.to_string()));
                        continue;
                    }
                    let child_shape = properties.get(key);
                    let redacted = match child_shape {
                        Some(shape) => redact_inner(val, shape, false),
                        None => val.clone(),
                    };
                    out.insert(key.clone(), redacted);
                }
                Value::Object(out)
            }
            None => value.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projects_sensitive_leaf() {
        let schema = json!({
            "type": "object",
            "properties": {
                "username": {"type": "string"},
                "password": {"type": "string", "sensitive": true}
            }
        });
        let shape = SchemaShape::project(&schema);
        match shape {
            SchemaShape::Object { properties } => {
                assert_eq!(
                    properties.get("password"),
                    Some(&SchemaShape::Leaf { sensitive: true })
                );
                assert_eq!(
                    properties.get("username"),
                    Some(&SchemaShape::Leaf { sensitive: false })
                );
            }
            _ => panic!("expected object shape"),
        }
    }

    #[test]
    fn redacts_sensitive_field_and_secret_prefixed_key() {
        let schema = json!({
            "type": "object",
            "properties": {
                "username": {"type": "string"},
                "password": {"type": "string", "sensitive": true}
            }
        });
        let shape = SchemaShape::project(&schema);
        let value = json!({"username": "a", "password": "s", "_secret_token": "t"});
        let redacted = redact_sensitive(&value, &shape);
        assert_eq!(redacted["username"], json!("a"));
        assert_eq!(redacted["password"], json!(REDACTED_SENTINEL));
        assert_eq!(redacted["_secret_token"], json!(REDACTED_SENTINEL));
    }

    #[test]
    fn redaction_is_idempotent() {
        let schema = json!({
            "type": "object",
            "properties": {"password": {"type": "string", "sensitive": true}}
        });
        let shape = SchemaShape::project(&schema);
        let value = json!({"password": "s"});
        let once = redact_sensitive(&value, &shape);
        let twice = redact_sensitive(&once, &shape);
        assert_eq!(once, twice);
    }

    #[test]
    fn redacts_array_items_marked_sensitive() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tokens": {
                    "type": "array",
                    "items": {"type": "string", "sensitive": true}
                }
            }
        });
        let shape = SchemaShape::project(&schema);
        let value = json!({"tokens": ["a", "b"]});
        let redacted = redact_sensitive(&value, &shape);
        assert_eq!(redacted["tokens"], json!([REDACTED_SENTINEL, REDACTED_SENTINEL]));
    }
}
