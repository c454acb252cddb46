//! Dynamic-library entry point resolution.
//!
//! Every module-bearing file the scanner finds is a compiled shared
//! library (a Rust `cdylib`, in the reference implementation) exporting a
//! single constructor symbol. This mirrors the Python original's "exactly
//! one class in the file satisfies the module contract" discovery rule,
//! translated to a statically-typed target: one exported symbol per file,
//! resolved by name rather than inferred by reflection.

use forge_core::error::{ForgeError, Result};
use forge_types::Module;
use libloading::{Library, Symbol};
use std::path::Path;
use std::sync::Arc;

/// Default exported symbol name a module library must provide, absent an
/// [`crate::metadata::ModuleMetadata::entry_point`] override.
pub const DEFAULT_ENTRY_POINT_SYMBOL: &str = "forge_module_entry_point";

/// Signature every entry point symbol must have: construct one boxed
/// [`Module`] with no arguments.
type ConstructorFn = unsafe extern "Rust" fn() -> Box<dyn Module>;

/// A loaded library kept alive alongside the module it produced.
///
/// The library must outlive every call into the module it constructed, so
/// `ResolvedModule` keeps both together and only exposes the module
/// through `Arc` cloning.
pub struct ResolvedModule {
    module: Arc<dyn Module>,
    // Retained solely to keep the backing mmap alive; never read directly.
    _library: Library,
}

impl ResolvedModule {
    /// Borrow the resolved module.
    pub fn module(&self) -> Arc<dyn Module> {
        Arc::clone(&self.module)
    }
}

/// Resolve `path` into a constructed module by loading it as a dynamic
/// library and invoking its entry-point symbol.
///
/// `symbol_override` comes from an `entry_point:` field in a companion
/// metadata file, or an id-override map entry's `class`; when absent,
/// [`DEFAULT_ENTRY_POINT_SYMBOL`] is used.
///
/// # Safety
///
/// This calls into arbitrary native code chosen by whatever is on disk at
/// `path`. Callers must only point discovery at trusted roots — the
/// registry never resolves an entry point for a library it did not itself
/// find via [`crate::scanner`].
pub unsafe fn resolve_entry_point(path: &Path, symbol_override: Option<&str>) -> Result<ResolvedModule> {
    let symbol_name = symbol_override.unwrap_or(DEFAULT_ENTRY_POINT_SYMBOL);

    let library = unsafe { Library::new(path) }.map_err(|e| ForgeError::ModuleLoadError {
        module_id: path.display().to_string(),
        reason: format!("failed to load library: {e}"),
    })?;

    let module = {
        let constructor: Symbol<ConstructorFn> =
            unsafe { library.get(symbol_name.as_bytes()) }.map_err(|e| ForgeError::ModuleLoadError {
                module_id: path.display().to_string(),
                reason: format!("missing entry point symbol '{symbol_name}': {e}"),
            })?;
        let boxed: Box<dyn Module> = unsafe { constructor() };
        Arc::from(boxed)
    };

    Ok(ResolvedModule {
        module,
        _library: library,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolving_a_nonexistent_path_raises_module_load_error() {
        let path = Path::new("/nonexistent/path/to/a/library.so");
        let err = unsafe { resolve_entry_point(path, None) }.unwrap_err();
        assert!(matches!(err, ForgeError::ModuleLoadError { .. }));
    }

    #[test]
    fn default_symbol_name_matches_documented_convention() {
        assert_eq!(DEFAULT_ENTRY_POINT_SYMBOL, "forge_module_entry_point");
    }
}
