#![deny(missing_docs)]
//! Module contract, descriptor, and schema validator interface for the
//! forge module execution framework.
//!
//! This crate defines *what* a module is structurally — it never drives a
//! call itself (that's `forge`'s executor) and never stores modules
//! (that's `forge-registry`).

pub mod descriptor;
pub mod module;
pub mod validation;

pub use descriptor::{ModuleAnnotations, ModuleDescriptor, ModuleExample};
pub use module::{BoxStream, Module};
pub use validation::{redact_sensitive, JsonSchemaValidator, SchemaShape, ValidationResult, Validator, REDACTED_SENTINEL};
