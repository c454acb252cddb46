#![deny(missing_docs)]
//! Context, identity, error taxonomy, and pattern matching shared by every
//! subsystem of the forge module execution framework.
//!
//! This crate has no knowledge of modules, the registry, middleware, or the
//! executor itself — it only defines the vocabulary those crates share:
//! typed ids, the call [`Context`], [`Identity`], the error taxonomy, and
//! the wildcard [`pattern`] matcher the ACL engine builds on.

pub mod context;
pub mod error;
pub mod future;
pub mod id;
pub mod identity;
pub mod invoker;
pub mod pattern;

pub use context::Context;
pub use error::{ErrorCodes, FieldError, ForgeError, Result, TracedError};
pub use future::BoxFuture;
pub use id::{ModuleId, TraceId};
pub use identity::Identity;
pub use invoker::Invoker;
pub use pattern::match_pattern;
