//! YAML binding loader for zero-code-modification module registration.
//!
//! A binding file points at a compiled module without touching its
//! source: `target` names a shared library path and an exported
//! constructor symbol (`path/to/lib.so:symbol_name`), and an explicit
//! schema stands in for the compile-time type hints the original
//! language-level decorator could read at import time.

use forge_core::context::Context;
use forge_core::error::{ForgeError, Result};
use forge_core::id::ModuleId;
use forge_registry::registry::Registry;
use forge_registry::scanner::derive_id;
use forge_types::{BoxStream, Module};
use libloading::{Library, Symbol};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type ConstructorFn = unsafe extern "Rust" fn() -> Box<dyn Module>;

#[derive(Debug, Deserialize)]
struct BindingFile {
    bindings: Vec<BindingEntry>,
}

#[derive(Debug, Deserialize)]
struct BindingEntry {
    /// Optional; defaults to a derivation from `target`'s library path
    /// when omitted, the same way a scanned module's id falls back to
    /// its file path when no override is given.
    #[serde(default)]
    module_id: Option<String>,
    target: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
    #[serde(default)]
    output_schema: Option<Value>,
    #[serde(default)]
    schema_ref: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SchemaRefFile {
    #[serde(default)]
    input_schema: Value,
    #[serde(default)]
    output_schema: Value,
}

/// Loads binding files and registers the modules they name.
#[derive(Debug, Default, Clone, Copy)]
pub struct BindingLoader;

impl BindingLoader {
    /// Construct a loader. Stateless; exists for symmetry with the rest of
    /// the facade's builder-style API.
    pub fn new() -> Self {
        Self
    }

    /// Load one binding file and register every module it names,
    /// returning the registered ids in file order.
    pub async fn load_bindings(&self, file_path: &Path, registry: &Registry) -> Result<Vec<ModuleId>> {
        let content = std::fs::read_to_string(file_path).map_err(|e| ForgeError::BindingFileInvalid {
            file_path: file_path.display().to_string(),
            reason: e.to_string(),
        })?;

        let parsed: BindingFile = serde_yaml::from_str(&content).map_err(|e| ForgeError::BindingFileInvalid {
            file_path: file_path.display().to_string(),
            reason: format!("YAML parse error: {e}"),
        })?;

        if parsed.bindings.is_empty() {
            return Err(ForgeError::BindingFileInvalid {
                file_path: file_path.display().to_string(),
                reason: "'bindings' must be a non-empty list".to_string(),
            });
        }

        let binding_dir = file_path.parent().unwrap_or_else(|| Path::new("."));

        let mut ids = Vec::with_capacity(parsed.bindings.len());
        for entry in &parsed.bindings {
            let (lib_path, symbol) = self.resolve_target(&entry.target)?;
            let module_id = match entry.module_id.as_deref() {
                Some(id) if !id.is_empty() => ModuleId::from(id),
                _ => ModuleId::from(derive_id(&lib_path).as_str()),
            };
            let module = self.build_module(entry, &lib_path, &symbol, binding_dir)?;
            registry.register(module_id.clone(), module).await?;
            ids.push(module_id);
        }

        Ok(ids)
    }

    /// Load every `*.binding.yaml` file in `dir`, in sorted filename order.
    pub async fn load_binding_dir(&self, dir: &Path, registry: &Registry) -> Result<Vec<ModuleId>> {
        if !dir.is_dir() {
            return Err(ForgeError::BindingFileInvalid {
                file_path: dir.display().to_string(),
                reason: "directory does not exist".to_string(),
            });
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| ForgeError::BindingFileInvalid {
                file_path: dir.display().to_string(),
                reason: e.to_string(),
            })?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(".binding.yaml")))
            .collect();
        paths.sort();

        let mut ids = Vec::new();
        for path in paths {
            ids.extend(self.load_bindings(&path, registry).await?);
        }
        Ok(ids)
    }

    /// Split `path/to/lib:symbol_name` into its library path and symbol.
    pub fn resolve_target(&self, target: &str) -> Result<(PathBuf, String)> {
        let Some((lib_path, symbol)) = target.rsplit_once(':') else {
            return Err(ForgeError::BindingInvalidTarget { target: target.to_string() });
        };
        if lib_path.is_empty() || symbol.is_empty() {
            return Err(ForgeError::BindingInvalidTarget { target: target.to_string() });
        }
        Ok((PathBuf::from(lib_path), symbol.to_string()))
    }

    fn build_module(
        &self,
        entry: &BindingEntry,
        lib_path: &Path,
        symbol: &str,
        binding_dir: &Path,
    ) -> Result<Arc<dyn Module>> {
        // Resolve schemas before touching the dynamic library: a binding
        // with no usable schema is a configuration error independent of
        // whether the target even exists, and should fail the same way
        // regardless of the target's resolvability.
        let (input_schema, output_schema) = self.resolve_schemas(entry, binding_dir)?;

        let library = unsafe { Library::new(lib_path) }.map_err(|_| ForgeError::BindingModuleNotFound {
            module_path: lib_path.display().to_string(),
        })?;

        let inner: Arc<dyn Module> = {
            let constructor: Symbol<ConstructorFn> =
                unsafe { library.get(symbol.as_bytes()) }.map_err(|_| ForgeError::BindingCallableNotFound {
                    callable_name: symbol.to_string(),
                    module_path: lib_path.display().to_string(),
                })?;
            let boxed: Box<dyn Module> = unsafe { constructor() };
            Arc::from(boxed)
        };

        Ok(Arc::new(BoundModule {
            inner,
            input_schema,
            output_schema,
            description: entry.description.clone().unwrap_or_default(),
            _library: library,
        }))
    }

    fn resolve_schemas(&self, entry: &BindingEntry, binding_dir: &Path) -> Result<(Value, Value)> {
        if let Some(schema_ref) = &entry.schema_ref {
            let ref_path = binding_dir.join(schema_ref);
            let content = std::fs::read_to_string(&ref_path).map_err(|_| ForgeError::BindingFileInvalid {
                file_path: ref_path.display().to_string(),
                reason: "schema reference file not found".to_string(),
            })?;
            let parsed: SchemaRefFile = serde_yaml::from_str(&content).map_err(|e| ForgeError::BindingFileInvalid {
                file_path: ref_path.display().to_string(),
                reason: format!("YAML parse error: {e}"),
            })?;
            return Ok((parsed.input_schema, parsed.output_schema));
        }

        if entry.input_schema.is_some() || entry.output_schema.is_some() {
            return Ok((
                entry.input_schema.clone().unwrap_or(Value::Object(serde_json::Map::new())),
                entry.output_schema.clone().unwrap_or(Value::Object(serde_json::Map::new())),
            ));
        }

        Err(ForgeError::BindingSchemaMissing { target: entry.target.clone() })
    }
}

/// A dynamically-loaded module with an explicit schema substituted over
/// whatever the loaded symbol reports, plus the description carried by
/// its binding entry.
struct BoundModule {
    inner: Arc<dyn Module>,
    input_schema: Value,
    output_schema: Value,
    description: String,
    // Kept alive only so the symbol `inner` was constructed from stays mapped.
    _library: Library,
}

impl Module for BoundModule {
    fn input_schema(&self) -> Value {
        self.input_schema.clone()
    }

    fn output_schema(&self) -> Value {
        self.output_schema.clone()
    }

    fn description(&self) -> &str {
        if self.description.is_empty() {
            self.inner.description()
        } else {
            &self.description
        }
    }

    fn execute<'a>(&'a self, inputs: Value, ctx: &'a Context) -> forge_core::future::BoxFuture<'a, Result<Value>> {
        self.inner.execute(inputs, ctx)
    }

    fn stream<'a>(&'a self, inputs: Value, ctx: &'a Context) -> Option<BoxStream<'a, Result<Value>>> {
        self.inner.stream(inputs, ctx)
    }

    fn version(&self) -> &str {
        self.inner.version()
    }

    fn tags(&self) -> Vec<String> {
        self.inner.tags()
    }
}
