//! Common imports for consumers of this crate.
//!
//! `use forge::prelude::*;` brings in the types most call sites need:
//! the module contract, the executor and its config, the context, and
//! the stable error type. Feature-gated pieces (ACL, macros) are only
//! re-exported when their feature is enabled.

pub use forge_core::context::Context;
pub use forge_core::error::{ErrorCodes, ForgeError, Result, TracedError};
pub use forge_core::id::{ModuleId, TraceId};
pub use forge_core::invoker::Invoker;

pub use forge_types::{Module, ModuleDescriptor, ValidationResult};

pub use forge_registry::Registry;

pub use forge_middleware::{Middleware, MiddlewareManager};

pub use crate::binding::BindingLoader;
pub use crate::config::Config;
pub use crate::executor::{Executor, ExecutorConfig};

#[cfg(feature = "acl")]
pub use forge_acl::Acl;

#[cfg(feature = "macros")]
pub use forge_macros::forge_module;
