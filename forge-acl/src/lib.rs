#![deny(missing_docs)]
//! Pattern-matched access-control engine for the forge module execution
//! framework.
//!
//! Rules are ordered and first-match-wins; see [`Acl::check`] for the exact
//! algorithm and [`crate::rule`] for the on-disk YAML format.

pub mod acl;
pub mod rule;

pub use acl::Acl;
pub use rule::{AclFile, AclRule, Conditions, Effect};
