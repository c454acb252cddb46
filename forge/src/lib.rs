#![cfg_attr(docsrs, feature(doc_cfg))]
//! Schema-driven module execution framework.
//!
//! `forge` is the facade crate: it wires [`forge_core`], [`forge_types`],
//! [`forge_registry`], [`forge_middleware`], and (with the `acl` feature)
//! [`forge_acl`] together behind one [`Executor`][executor::Executor]
//! that runs the call pipeline described in [`executor`]. Everything here
//! is feature-gated behind `core` (on by default) so a consumer that only
//! wants, say, the schema validator can depend on `forge-types` alone.

#[cfg(feature = "core")]
pub mod binding;
#[cfg(feature = "core")]
pub mod config;
#[cfg(feature = "core")]
pub mod executor;
#[cfg(feature = "core")]
pub mod prelude;

#[cfg(feature = "core")]
pub use binding::BindingLoader;
#[cfg(feature = "core")]
pub use config::Config;
#[cfg(feature = "core")]
pub use executor::{Executor, ExecutorConfig};

#[cfg(feature = "core")]
pub use forge_core as core;
#[cfg(feature = "core")]
pub use forge_middleware as middleware;
#[cfg(feature = "core")]
pub use forge_registry as registry;
#[cfg(feature = "core")]
pub use forge_types as types;

#[cfg(feature = "acl")]
pub use forge_acl as acl;

#[cfg(feature = "macros")]
pub use forge_macros::forge_module;
