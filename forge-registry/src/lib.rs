//! Module registry, filesystem discovery, and dependency-ordered load.

#![deny(missing_docs)]

pub mod dependencies;
pub mod entry_point;
pub mod metadata;
pub mod registry;
pub mod scanner;

pub use dependencies::{topological_order, DependencyNode};
pub use entry_point::{resolve_entry_point, ResolvedModule, DEFAULT_ENTRY_POINT_SYMBOL};
pub use metadata::{DependencyDecl, IdOverrideEntry, IdOverrideMap, ModuleMetadata};
pub use registry::{Registry, RegistryEvent};
pub use scanner::{derive_id, scan_all, scan_root, ScanEntry, ScanRoot};
