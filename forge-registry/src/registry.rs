//! Concurrent module registry with filesystem discovery.

use crate::dependencies::{topological_order, DependencyNode};
use crate::entry_point::resolve_entry_point;
use crate::metadata::{IdOverrideMap, ModuleMetadata};
use crate::scanner::{scan_all, ScanRoot};
use forge_core::error::{ForgeError, Result};
use forge_core::id::ModuleId;
use forge_types::{Module, ModuleAnnotations, ModuleDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, warn};

/// Merged descriptor fields contributed by a companion metadata file,
/// layered over a module's own accessors in [`Registry::get_descriptor`].
#[derive(Debug, Clone, Default)]
struct MergedMetadata {
    name: Option<String>,
    description: Option<String>,
    documentation: Option<String>,
    tags: Vec<String>,
    version: Option<String>,
    annotations: Option<ModuleAnnotations>,
    examples: Vec<forge_types::ModuleExample>,
    metadata: Value,
}

/// Event names the registry fires callbacks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryEvent {
    /// Fired after a module is successfully registered.
    Register,
    /// Fired after a module is removed.
    Unregister,
}

type EventCallback = Box<dyn Fn(&ModuleId) + Send + Sync>;

struct State {
    modules: HashMap<ModuleId, Arc<dyn Module>>,
    metadata: HashMap<ModuleId, MergedMetadata>,
}

/// Keyed store of modules with discovery, lifecycle callbacks, and
/// descriptor export.
///
/// A single mutex guards all mutation and lookup; lifecycle hooks
/// (`on_load`/`on_unload`) and event callbacks run **outside** the lock so
/// a re-entrant `register` call from a hook can't deadlock.
pub struct Registry {
    state: Mutex<State>,
    on_register: Mutex<Vec<EventCallback>>,
    on_unregister: Mutex<Vec<EventCallback>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                modules: HashMap::new(),
                metadata: HashMap::new(),
            }),
            on_register: Mutex::new(Vec::new()),
            on_unregister: Mutex::new(Vec::new()),
        }
    }

    /// Register `module` under `module_id`.
    ///
    /// Runs `on_load` outside the lock; on failure the module is removed
    /// again and the error propagates. The `register` event fires last,
    /// also outside the lock.
    pub async fn register(&self, module_id: ModuleId, module: Arc<dyn Module>) -> Result<()> {
        if module_id.as_str().is_empty() {
            return Err(ForgeError::ModuleLoadError {
                module_id: module_id.to_string(),
                reason: "module id must not be empty".to_string(),
            });
        }
        if module.description().is_empty() {
            return Err(ForgeError::ModuleLoadError {
                module_id: module_id.to_string(),
                reason: "module description must not be empty".to_string(),
            });
        }

        {
            let mut state = self.state.lock().expect("registry state mutex poisoned");
            if state.modules.contains_key(&module_id) {
                return Err(ForgeError::ModuleLoadError {
                    module_id: module_id.to_string(),
                    reason: "module id already registered".to_string(),
                });
            }
            state.modules.insert(module_id.clone(), module.clone());
        }

        if let Err(e) = module.on_load().await {
            let mut state = self.state.lock().expect("registry state mutex poisoned");
            state.modules.remove(&module_id);
            return Err(e);
        }

        debug!(module_id = %module_id, "module registered");
        self.fire(&self.on_register, &module_id);
        Ok(())
    }

    /// Register a module with merged metadata-file fields applied.
    pub async fn register_with_metadata(
        &self,
        module_id: ModuleId,
        module: Arc<dyn Module>,
        metadata: ModuleMetadata,
    ) -> Result<()> {
        self.register(module_id.clone(), module).await?;
        let mut state = self.state.lock().expect("registry state mutex poisoned");
        state.metadata.insert(
            module_id,
            MergedMetadata {
                name: metadata.name,
                description: metadata.description,
                documentation: metadata.documentation,
                tags: metadata.tags,
                version: metadata.version,
                annotations: metadata.annotations,
                examples: metadata.examples,
                metadata: metadata.metadata,
            },
        );
        Ok(())
    }

    /// Remove `module_id`. Returns whether a module was present.
    ///
    /// `on_unload` failures are logged and swallowed, matching the
    /// lifecycle contract: the module is considered unregistered either way.
    pub async fn unregister(&self, module_id: &ModuleId) -> bool {
        let removed = {
            let mut state = self.state.lock().expect("registry state mutex poisoned");
            state.metadata.remove(module_id);
            state.modules.remove(module_id)
        };

        let Some(module) = removed else {
            return false;
        };

        if let Err(e) = module.on_unload().await {
            error!(module_id = %module_id, error = %e, "on_unload failed, swallowing");
        }

        debug!(module_id = %module_id, "module unregistered");
        self.fire(&self.on_unregister, module_id);
        true
    }

    /// Fetch a registered module by id.
    pub fn get(&self, module_id: &ModuleId) -> Option<Arc<dyn Module>> {
        self.state
            .lock()
            .expect("registry state mutex poisoned")
            .modules
            .get(module_id)
            .cloned()
    }

    /// Whether `module_id` is currently registered.
    pub fn has(&self, module_id: &ModuleId) -> bool {
        self.state
            .lock()
            .expect("registry state mutex poisoned")
            .modules
            .contains_key(module_id)
    }

    /// Sorted module ids, optionally filtered by id prefix and/or tag
    /// intersection (own tags merged with metadata tags).
    pub fn list(&self, tags: Option<&[String]>, prefix: Option<&str>) -> Vec<ModuleId> {
        let state = self.state.lock().expect("registry state mutex poisoned");
        let mut ids: Vec<ModuleId> = state
            .modules
            .iter()
            .filter(|(id, _)| prefix.map(|p| id.as_str().starts_with(p)).unwrap_or(true))
            .filter(|(id, module)| match tags {
                None => true,
                Some(wanted) => {
                    let mut own = module.tags();
                    if let Some(meta) = state.metadata.get(*id) {
                        own.extend(meta.tags.iter().cloned());
                    }
                    wanted.iter().any(|t| own.contains(t))
                }
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Snapshot of every registered `(id, module)` pair.
    pub fn iter(&self) -> Vec<(ModuleId, Arc<dyn Module>)> {
        self.state
            .lock()
            .expect("registry state mutex poisoned")
            .modules
            .iter()
            .map(|(id, m)| (id.clone(), m.clone()))
            .collect()
    }

    /// Number of registered modules.
    pub fn count(&self) -> usize {
        self.state.lock().expect("registry state mutex poisoned").modules.len()
    }

    /// All registered module ids, unsorted.
    pub fn module_ids(&self) -> Vec<ModuleId> {
        self.state
            .lock()
            .expect("registry state mutex poisoned")
            .modules
            .keys()
            .cloned()
            .collect()
    }

    /// Build a read-only descriptor for `module_id`, merging metadata-file
    /// overrides over the module's own accessors.
    pub fn get_descriptor(&self, module_id: &ModuleId) -> Option<ModuleDescriptor> {
        let state = self.state.lock().expect("registry state mutex poisoned");
        let module = state.modules.get(module_id)?;
        let meta = state.metadata.get(module_id);

        let mut tags = module.tags();
        if let Some(meta) = meta {
            tags.extend(meta.tags.iter().cloned());
        }
        tags.sort();
        tags.dedup();

        let mut examples = module.examples();
        if let Some(meta) = meta {
            examples.extend(meta.examples.iter().cloned());
        }

        let mut metadata_value = module.metadata();
        if let Some(meta) = meta {
            if let (Some(base), Some(extra)) = (metadata_value.as_object_mut(), meta.metadata.as_object()) {
                for (k, v) in extra {
                    base.insert(k.clone(), v.clone());
                }
            }
        }

        Some(ModuleDescriptor {
            module_id: module_id.clone(),
            name: meta.and_then(|m| m.name.clone()).or_else(|| module.name().map(str::to_string)),
            description: meta
                .and_then(|m| m.description.clone())
                .unwrap_or_else(|| module.description().to_string()),
            documentation: meta
                .and_then(|m| m.documentation.clone())
                .or_else(|| module.documentation().map(str::to_string)),
            input_schema: module.input_schema(),
            output_schema: module.output_schema(),
            version: meta
                .and_then(|m| m.version.clone())
                .unwrap_or_else(|| module.version().to_string()),
            tags,
            annotations: meta.and_then(|m| m.annotations).or_else(|| module.annotations()),
            examples,
            metadata: metadata_value,
        })
    }

    /// Register a callback for `event`. Callbacks run outside the lock;
    /// a panicking/erroring callback never poisons future registrations
    /// since they're plain closures invoked directly, not fallible hooks.
    pub fn on(&self, event: RegistryEvent, callback: impl Fn(&ModuleId) + Send + Sync + 'static) {
        let table = match event {
            RegistryEvent::Register => &self.on_register,
            RegistryEvent::Unregister => &self.on_unregister,
        };
        table.lock().expect("registry callback mutex poisoned").push(Box::new(callback));
    }

    fn fire(&self, table: &Mutex<Vec<EventCallback>>, module_id: &ModuleId) {
        let callbacks = table.lock().expect("registry callback mutex poisoned");
        for cb in callbacks.iter() {
            cb(module_id);
        }
    }

    /// Discover and register modules under `roots`, applying `overrides` if
    /// given. Instantiation and `on_load` failures are logged and skipped;
    /// they do not abort the rest of the batch.
    pub async fn discover(
        &self,
        roots: &[ScanRoot],
        max_depth: usize,
        follow_symlinks: bool,
        overrides: Option<&IdOverrideMap>,
    ) -> Result<Vec<ModuleId>> {
        let entries = scan_all(roots, max_depth, follow_symlinks)?;

        struct Candidate {
            id: ModuleId,
            path: std::path::PathBuf,
            metadata: ModuleMetadata,
        }

        let mut candidates = Vec::new();
        for entry in entries {
            let relative = entry.path.to_string_lossy().to_string();
            let mut id = entry.module_id.clone();
            let mut entry_point_override = None;

            if let Some(overrides) = overrides {
                if let Some(o) = overrides.get(&relative) {
                    id = ModuleId::from(o.id.clone());
                    entry_point_override = o.class.clone();
                }
            }

            let meta_path = entry.path.with_extension("meta.yaml");
            let mut metadata = ModuleMetadata::load_optional(&meta_path)?.unwrap_or_default();
            if entry_point_override.is_some() {
                metadata.entry_point = entry_point_override;
            }

            candidates.push(Candidate {
                id,
                path: entry.path,
                metadata,
            });
        }

        let nodes: Vec<DependencyNode> = candidates
            .iter()
            .map(|c| {
                let mut required = Vec::new();
                let mut optional = Vec::new();
                for dep in &c.metadata.dependencies {
                    let dep_id = ModuleId::from(dep.module_id.clone());
                    if dep.optional {
                        optional.push(dep_id);
                    } else {
                        required.push(dep_id);
                    }
                }
                DependencyNode {
                    id: c.id.clone(),
                    required,
                    optional,
                }
            })
            .collect();

        let order = topological_order(nodes)?;

        let by_id: HashMap<ModuleId, Candidate> = candidates.into_iter().map(|c| (c.id.clone(), c)).collect();
        let mut by_id = by_id;

        let mut registered = Vec::new();
        for id in order {
            let Some(candidate) = by_id.remove(&id) else {
                continue;
            };

            let resolved = unsafe { resolve_entry_point(&candidate.path, candidate.metadata.entry_point.as_deref()) };
            let resolved = match resolved {
                Ok(r) => r,
                Err(e) => {
                    warn!(module_id = %id, error = %e, "discovery: failed to resolve entry point, skipping");
                    continue;
                }
            };

            if resolved.module().description().is_empty() {
                warn!(module_id = %id, "discovery: candidate has empty description, skipping");
                continue;
            }

            match self
                .register_with_metadata(id.clone(), resolved.module(), candidate.metadata)
                .await
            {
                Ok(()) => registered.push(id),
                Err(e) => warn!(module_id = %id, error = %e, "discovery: registration failed, skipping"),
            }
        }

        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::context::Context;
    use forge_core::future::BoxFuture;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Echo {
        load_calls: Arc<AtomicUsize>,
    }

    impl Module for Echo {
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn output_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn description(&self) -> &str {
            "echoes input"
        }
        fn execute<'a>(&'a self, inputs: Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async move { Ok(inputs) })
        }
        fn on_load(&self) -> BoxFuture<'_, Result<()>> {
            self.load_calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    struct FailingLoad;
    impl Module for FailingLoad {
        fn input_schema(&self) -> Value {
            json!({})
        }
        fn output_schema(&self) -> Value {
            json!({})
        }
        fn description(&self) -> &str {
            "never loads"
        }
        fn execute<'a>(&'a self, inputs: Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
            Box::pin(async move { Ok(inputs) })
        }
        fn on_load(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async { Err(ForgeError::Internal("boom".into())) })
        }
    }

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let registry = Registry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register(ModuleId::from("echo"), Arc::new(Echo { load_calls: counter.clone() }))
            .await
            .unwrap();
        assert!(registry.has(&ModuleId::from("echo")));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn duplicate_register_rejected() {
        let registry = Registry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register(ModuleId::from("echo"), Arc::new(Echo { load_calls: counter.clone() }))
            .await
            .unwrap();
        let err = registry
            .register(ModuleId::from("echo"), Arc::new(Echo { load_calls: counter }))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::ModuleLoadError { .. }));
    }

    #[tokio::test]
    async fn register_rejects_empty_description() {
        struct Blank;
        impl Module for Blank {
            fn input_schema(&self) -> Value {
                json!({})
            }
            fn output_schema(&self) -> Value {
                json!({})
            }
            fn description(&self) -> &str {
                ""
            }
            fn execute<'a>(&'a self, inputs: Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
                Box::pin(async move { Ok(inputs) })
            }
        }

        let registry = Registry::new();
        let err = registry.register(ModuleId::from("blank"), Arc::new(Blank)).await.unwrap_err();
        assert!(matches!(err, ForgeError::ModuleLoadError { .. }));
        assert!(!registry.has(&ModuleId::from("blank")));
    }

    #[tokio::test]
    async fn failing_on_load_leaves_no_trace() {
        let registry = Registry::new();
        let err = registry.register(ModuleId::from("bad"), Arc::new(FailingLoad)).await.unwrap_err();
        assert!(matches!(err, ForgeError::Internal(_)));
        assert!(!registry.has(&ModuleId::from("bad")));
    }

    #[tokio::test]
    async fn unregister_fires_event_and_removes() {
        let registry = Registry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register(ModuleId::from("echo"), Arc::new(Echo { load_calls: counter }))
            .await
            .unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = fired.clone();
        registry.on(RegistryEvent::Unregister, move |_id| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(registry.unregister(&ModuleId::from("echo")).await);
        assert!(!registry.has(&ModuleId::from("echo")));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.unregister(&ModuleId::from("echo")).await);
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_tags() {
        struct Tagged(Vec<String>);
        impl Module for Tagged {
            fn input_schema(&self) -> Value {
                json!({})
            }
            fn output_schema(&self) -> Value {
                json!({})
            }
            fn description(&self) -> &str {
                "tagged"
            }
            fn execute<'a>(&'a self, inputs: Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
                Box::pin(async move { Ok(inputs) })
            }
            fn tags(&self) -> Vec<String> {
                self.0.clone()
            }
        }

        let registry = Registry::new();
        registry
            .register(ModuleId::from("fs.read"), Arc::new(Tagged(vec!["fs".into()])))
            .await
            .unwrap();
        registry
            .register(ModuleId::from("net.fetch"), Arc::new(Tagged(vec!["net".into()])))
            .await
            .unwrap();

        let fs_only = registry.list(None, Some("fs."));
        assert_eq!(fs_only, vec![ModuleId::from("fs.read")]);

        let tagged = registry.list(Some(&["net".to_string()]), None);
        assert_eq!(tagged, vec![ModuleId::from("net.fetch")]);
    }

    #[tokio::test]
    async fn get_descriptor_merges_metadata() {
        let registry = Registry::new();
        let counter = Arc::new(AtomicUsize::new(0));
        registry
            .register_with_metadata(
                ModuleId::from("echo"),
                Arc::new(Echo { load_calls: counter }),
                ModuleMetadata {
                    description: Some("overridden description".into()),
                    tags: vec!["extra".into()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let descriptor = registry.get_descriptor(&ModuleId::from("echo")).unwrap();
        assert_eq!(descriptor.description, "overridden description");
        assert!(descriptor.tags.contains(&"extra".to_string()));
    }
}
