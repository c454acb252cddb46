//! The 10-step call pipeline: context derivation, safety checks, lookup,
//! access control, input validation, middleware, timed execution, output
//! validation, and the on-error recovery cascade.

use forge_acl::Acl;
use forge_core::context::Context;
use forge_core::error::{ForgeError, Result, TracedError};
use forge_core::future::BoxFuture;
use forge_core::id::ModuleId;
use forge_core::invoker::Invoker;
use forge_middleware::MiddlewareManager;
use forge_registry::Registry;
use forge_types::{BoxStream, JsonSchemaValidator, Module, Validator};
use futures::StreamExt;
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Timeout and call-chain budgets for one [`Executor`].
#[derive(Debug, Clone, Copy)]
pub struct ExecutorConfig {
    /// Per-call wall-clock budget for `execute`, in milliseconds. `0`
    /// disables the timeout (and is logged as a warning at call time).
    pub default_timeout_ms: u64,
    /// Reserved budget for an enclosing call tree. Stored, never enforced
    /// by the pipeline.
    pub global_timeout_ms: u64,
    /// Maximum `call_chain` length before a depth-exceeded error.
    pub max_call_depth: usize,
    /// Maximum occurrences of any single module id in `call_chain`.
    pub max_module_repeat: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
            global_timeout_ms: 60_000,
            max_call_depth: 32,
            max_module_repeat: 3,
        }
    }
}

/// Orchestrates the call pipeline over a registry, middleware chain, and
/// optional ACL.
///
/// Callers hold an `Executor` behind an `Arc` so that top-level `call`/
/// `call_async`/`stream` invocations (the ones with no parent context) can
/// hand out an `Arc<dyn Invoker>` back-reference on the root `Context` for
/// nested module-to-module calls; `Executor` itself implements [`Invoker`].
pub struct Executor {
    registry: Arc<Registry>,
    middleware: Arc<MiddlewareManager>,
    acl: Option<Arc<Acl>>,
    validator: Arc<dyn Validator>,
    config: ExecutorConfig,
}

impl Executor {
    /// Build an executor over `registry`, with an empty middleware chain,
    /// no ACL, the default [`JsonSchemaValidator`], and default config.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            middleware: Arc::new(MiddlewareManager::new()),
            acl: None,
            validator: Arc::new(JsonSchemaValidator),
            config: ExecutorConfig::default(),
        }
    }

    /// Attach a middleware manager, replacing the default empty one.
    pub fn with_middleware(mut self, middleware: Arc<MiddlewareManager>) -> Self {
        self.middleware = middleware;
        self
    }

    /// Attach an ACL. Without one, every call is authorized.
    pub fn with_acl(mut self, acl: Arc<Acl>) -> Self {
        self.acl = Some(acl);
        self
    }

    /// Replace the schema validator.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Replace the timeout/depth/repeat budgets.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// The registry this executor reads from.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The configured timeout/depth/repeat budgets.
    pub fn config(&self) -> ExecutorConfig {
        self.config
    }

    /// Derive the context for a top-level call: a fresh root bound to this
    /// executor when `parent_ctx` is `None`, or a child of `parent_ctx`
    /// otherwise.
    fn root_or_child_context(self: &Arc<Self>, parent_ctx: Option<&Context>, module_id: &ModuleId) -> Context {
        match parent_ctx {
            Some(parent) => parent.child(module_id.clone()),
            None => {
                let self_ref: Arc<dyn Invoker> = self.clone();
                Context::create(Some(self_ref), None).child(module_id.clone())
            }
        }
    }

    fn check_safety(&self, ctx: &Context, module_id: &ModuleId) -> Result<()> {
        let chain = &ctx.call_chain;

        if chain.len() > self.config.max_call_depth {
            return Err(ForgeError::CallDepthExceeded {
                depth: chain.len(),
                max_depth: self.config.max_call_depth,
                call_chain: chain.clone(),
            });
        }

        if is_circular(chain, module_id) {
            return Err(ForgeError::CircularCall {
                module_id: module_id.clone(),
                call_chain: chain.clone(),
            });
        }

        let occurrences = chain.iter().filter(|id| *id == module_id).count();
        if occurrences > self.config.max_module_repeat {
            return Err(ForgeError::CallFrequencyExceeded {
                module_id: module_id.clone(),
                count: occurrences,
                max_repeat: self.config.max_module_repeat,
                call_chain: chain.clone(),
            });
        }

        Ok(())
    }

    fn check_acl(&self, ctx: &Context, module_id: &ModuleId) -> Result<()> {
        let Some(acl) = &self.acl else {
            return Ok(());
        };
        if !acl.check(ctx.caller_id.as_ref(), module_id, Some(ctx)) {
            return Err(ForgeError::AclDenied {
                caller_id: ctx.caller_id.as_ref().map(|id| id.to_string()),
                target_id: module_id.to_string(),
            });
        }
        Ok(())
    }

    fn validate_and_redact(&self, schema: &Value, value: &Value) -> Result<Value> {
        let result = self.validator.validate(schema, value);
        if !result.valid {
            return Err(ForgeError::SchemaValidationError { errors: result.errors });
        }
        let shape = self.validator.project(schema);
        Ok(forge_types::redact_sensitive(value, &shape))
    }

    /// Pure validation: look up the module, validate `inputs` against its
    /// input schema, and report the result. Bypasses ACL, middleware, and
    /// execution entirely.
    pub fn validate(&self, module_id: &ModuleId, inputs: &Value) -> std::result::Result<forge_types::ValidationResult, TracedError> {
        let module = self.registry.get(module_id).ok_or_else(|| {
            TracedError::new(
                ForgeError::ModuleNotFound {
                    module_id: module_id.to_string(),
                },
                None,
            )
        })?;
        Ok(self.validator.validate(&module.input_schema(), inputs))
    }

    /// The 10-step pipeline, given an already-derived `ctx`. Used both by
    /// the top-level `call`/`call_async` entrypoints (which derive a root
    /// or child context first) and by [`Invoker::invoke`] (which derives a
    /// child context from whatever context the caller already had).
    async fn run_pipeline(&self, module_id: &ModuleId, inputs: Value, mut ctx: Context) -> Result<Value> {
        self.check_safety(&ctx, module_id)?;

        let module = self
            .registry
            .get(module_id)
            .ok_or_else(|| ForgeError::ModuleNotFound {
                module_id: module_id.to_string(),
            })?;

        self.check_acl(&ctx, module_id)?;

        let redacted = self.validate_and_redact(&module.input_schema(), &inputs)?;
        ctx.redacted_inputs = Some(redacted);

        info!(module_id = %module_id, trace_id = %ctx.trace_id, "call started");

        let before = self.middleware.execute_before(module_id, inputs, &ctx).await;
        let (current_inputs, executed) = match before {
            Ok(pair) => pair,
            Err(chain_err) => {
                return self
                    .recover_or_raise(module_id, &Value::Null, chain_err.cause, &ctx, &chain_err.executed)
                    .await;
            }
        };

        let output = match self.run_with_timeout(&*module, current_inputs.clone(), &ctx).await {
            Ok(output) => output,
            Err(e) => {
                error!(module_id = %module_id, error = %e, "call failed, entering on_error cascade");
                return self.recover_or_raise(module_id, &current_inputs, e, &ctx, &executed).await;
            }
        };

        let validated = self.validator.validate(&module.output_schema(), &output);
        if !validated.valid {
            let e = ForgeError::SchemaValidationError { errors: validated.errors };
            return self.recover_or_raise(module_id, &current_inputs, e, &ctx, &executed).await;
        }

        match self.middleware.execute_after(module_id, &current_inputs, output, &ctx).await {
            Ok(final_output) => {
                info!(module_id = %module_id, trace_id = %ctx.trace_id, "call completed");
                Ok(final_output)
            }
            Err(e) => self.recover_or_raise(module_id, &current_inputs, e, &ctx, &executed).await,
        }
    }

    async fn recover_or_raise(
        &self,
        module_id: &ModuleId,
        inputs: &Value,
        error: ForgeError,
        ctx: &Context,
        executed: &[usize],
    ) -> Result<Value> {
        match self.middleware.execute_on_error(module_id, inputs, &error, ctx, executed).await {
            Some(value) => Ok(value),
            None => Err(error),
        }
    }

    /// Run the 10-step pipeline for one call, returning the final output
    /// or the result of a successful on-error recovery.
    ///
    /// A failure is reported as a [`TracedError`], pairing the terminal
    /// `ForgeError` with the trace id of the call it occurred in — this is
    /// the one place that pairing happens; everything upstream of this
    /// boundary (`run_pipeline`, the registry, the ACL) propagates a plain
    /// `ForgeError`.
    pub async fn call_async(
        self: &Arc<Self>,
        module_id: &ModuleId,
        inputs: Option<Value>,
        parent_ctx: Option<&Context>,
    ) -> std::result::Result<Value, TracedError> {
        let inputs = inputs.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let ctx = self.root_or_child_context(parent_ctx, module_id);
        let trace_id = ctx.trace_id.clone();
        self.run_pipeline(module_id, inputs, ctx)
            .await
            .map_err(|e| TracedError::new(e, Some(trace_id)))
    }

    /// Synchronous facade over [`Executor::call_async`].
    ///
    /// Bridges to the async pipeline: if called from within a running
    /// Tokio runtime, the call is dispatched so the caller's thread can
    /// block without stalling the runtime's other tasks; otherwise a
    /// temporary runtime drives the call to completion directly.
    pub fn call(
        self: &Arc<Self>,
        module_id: &ModuleId,
        inputs: Option<Value>,
        parent_ctx: Option<&Context>,
    ) -> std::result::Result<Value, TracedError> {
        let module_id = module_id.clone();
        let parent_ctx = parent_ctx.cloned();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let executor = self.clone();
                tokio::task::block_in_place(|| handle.block_on(executor.call_async(&module_id, inputs, parent_ctx.as_ref())))
            }
            Err(_) => {
                let runtime = tokio::runtime::Runtime::new()
                    .map_err(|e| TracedError::new(ForgeError::Internal(e.to_string()), None))?;
                runtime.block_on(self.call_async(&module_id, inputs, parent_ctx.as_ref()))
            }
        }
    }

    async fn run_with_timeout(&self, module: &dyn Module, inputs: Value, ctx: &Context) -> Result<Value> {
        if self.config.default_timeout_ms == 0 {
            warn!(module_id = ?ctx.call_chain.last(), "timeout disabled for this call (default_timeout_ms = 0)");
            return module.execute(inputs, ctx).await;
        }

        let duration = Duration::from_millis(self.config.default_timeout_ms);
        match tokio::time::timeout(duration, module.execute(inputs, ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ForgeError::ModuleTimeout {
                module_id: ctx.call_chain.last().map(|id| id.to_string()).unwrap_or_default(),
                timeout_ms: self.config.default_timeout_ms,
            }),
        }
    }

    /// Lazily-produced output: chunks from the module's `stream` operation
    /// when it supports one, otherwise a single chunk equal to the result
    /// of `call_async`.
    ///
    /// Only the error that can prevent the stream from being constructed at
    /// all is traced; once streaming, a chunk's own error stays a plain
    /// `ForgeError` since it's delivered mid-flight, not at a pipeline exit.
    pub async fn stream(
        self: &Arc<Self>,
        module_id: &ModuleId,
        inputs: Option<Value>,
        parent_ctx: Option<&Context>,
    ) -> std::result::Result<BoxStream<'static, Result<Value>>, TracedError> {
        let inputs = inputs.unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let ctx = self.root_or_child_context(parent_ctx, module_id);
        let trace_id = ctx.trace_id.clone();
        self.run_stream_pipeline(module_id, inputs, ctx)
            .await
            .map_err(|e| TracedError::new(e, Some(trace_id)))
    }

    async fn run_stream_pipeline(&self, module_id: &ModuleId, inputs: Value, mut ctx: Context) -> Result<BoxStream<'static, Result<Value>>> {
        self.check_safety(&ctx, module_id)?;
        let module = self
            .registry
            .get(module_id)
            .ok_or_else(|| ForgeError::ModuleNotFound {
                module_id: module_id.to_string(),
            })?;
        self.check_acl(&ctx, module_id)?;

        let redacted = self.validate_and_redact(&module.input_schema(), &inputs)?;
        ctx.redacted_inputs = Some(redacted);

        let before = self.middleware.execute_before(module_id, inputs, &ctx).await;
        let (current_inputs, executed) = match before {
            Ok(pair) => pair,
            Err(chain_err) => {
                let recovered = self
                    .recover_or_raise(module_id, &Value::Null, chain_err.cause, &ctx, &chain_err.executed)
                    .await?;
                return Ok(single_chunk_stream(recovered));
            }
        };

        let owned_stream = OwnedModuleStream::build(module.clone(), ctx.clone(), current_inputs.clone());

        let Some(owned_stream) = owned_stream else {
            let output = self.run_with_timeout(&*module, current_inputs.clone(), &ctx).await;
            return match output {
                Ok(value) => Ok(single_chunk_stream(value)),
                Err(e) => {
                    let recovered = self.recover_or_raise(module_id, &current_inputs, e, &ctx, &executed).await?;
                    Ok(single_chunk_stream(recovered))
                }
            };
        };

        let state = AccumulatingStreamState {
            inner: Some(owned_stream),
            accumulated: serde_json::Map::new(),
            module_id: module_id.clone(),
            current_inputs,
            ctx,
            executed,
            middleware: self.middleware.clone(),
            validator: self.validator.clone(),
            output_schema: module.output_schema(),
            done: false,
        };

        Ok(Box::pin(futures::stream::unfold(state, accumulating_stream_step)))
    }
}

fn single_chunk_stream(value: Value) -> BoxStream<'static, Result<Value>> {
    Box::pin(futures::stream::once(async move { Ok(value) }))
}

/// A module's `stream()` output, together with the module and context it
/// borrowed from, packaged so the combination outlives the call that built
/// it.
///
/// `module.stream` borrows `&self` and `&Context` for the lifetime of the
/// returned stream. Both are kept alive here as heap-indirected owners
/// (`Arc`/`Box`) whose referent does not move even if this struct does, so
/// extending the borrow's lifetime annotation to match is sound; only the
/// annotation changes, the memory it points to is untouched. Field order
/// matters: `inner` is declared first so it drops before the data it
/// borrows from.
struct OwnedModuleStream {
    inner: BoxStream<'static, Result<Value>>,
    _module: Arc<dyn Module>,
    _ctx: Box<Context>,
}

impl OwnedModuleStream {
    fn build(module: Arc<dyn Module>, ctx: Context, inputs: Value) -> Option<Self> {
        let ctx_box = Box::new(ctx);

        // SAFETY: see the struct doc comment. `module` and `ctx_box` outlive
        // `inner` (declared after it, so dropped after it), and moving this
        // struct only moves the `Arc`/`Box` handles, not the heap data they
        // point to, so the borrow `inner` holds stays valid.
        let module_ref: &dyn Module = unsafe { &*(module.as_ref() as *const dyn Module) };
        let ctx_ref: &Context = unsafe { &*(ctx_box.as_ref() as *const Context) };

        let inner = module_ref.stream(inputs, ctx_ref)?;
        let inner: BoxStream<'static, Result<Value>> = unsafe { std::mem::transmute(inner) };

        Some(Self {
            inner,
            _module: module,
            _ctx: ctx_box,
        })
    }
}

impl futures::Stream for OwnedModuleStream {
    type Item = Result<Value>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> std::task::Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

struct AccumulatingStreamState {
    inner: Option<OwnedModuleStream>,
    accumulated: serde_json::Map<String, Value>,
    module_id: ModuleId,
    current_inputs: Value,
    ctx: Context,
    executed: Vec<usize>,
    middleware: Arc<MiddlewareManager>,
    validator: Arc<dyn Validator>,
    output_schema: Value,
    done: bool,
}

async fn accumulating_stream_step(mut state: AccumulatingStreamState) -> Option<(Result<Value>, AccumulatingStreamState)> {
    if state.done {
        return None;
    }

    if let Some(inner) = state.inner.as_mut() {
        match inner.next().await {
            Some(Ok(chunk)) => {
                if let Some(obj) = chunk.as_object() {
                    for (k, v) in obj {
                        state.accumulated.insert(k.clone(), v.clone());
                    }
                }
                return Some((Ok(chunk), state));
            }
            Some(Err(e)) => {
                state.inner = None;
                state.done = true;
                let recovery = state
                    .middleware
                    .execute_on_error(&state.module_id, &state.current_inputs, &e, &state.ctx, &state.executed)
                    .await;
                return match recovery {
                    Some(value) => Some((Ok(value), state)),
                    None => Some((Err(e), state)),
                };
            }
            None => {
                state.inner = None;
            }
        }
    }

    state.done = true;

    let accumulated_value = Value::Object(state.accumulated.clone());
    let validated = state.validator.validate(&state.output_schema, &accumulated_value);
    if !validated.valid {
        let e = ForgeError::SchemaValidationError { errors: validated.errors };
        let recovery = state
            .middleware
            .execute_on_error(&state.module_id, &state.current_inputs, &e, &state.ctx, &state.executed)
            .await;
        return match recovery {
            Some(value) => Some((Ok(value), state)),
            None => Some((Err(e), state)),
        };
    }

    if let Err(e) = state
        .middleware
        .execute_after(&state.module_id, &state.current_inputs, accumulated_value, &state.ctx)
        .await
    {
        let recovery = state
            .middleware
            .execute_on_error(&state.module_id, &state.current_inputs, &e, &state.ctx, &state.executed)
            .await;
        return match recovery {
            Some(value) => Some((Ok(value), state)),
            None => Some((Err(e), state)),
        };
    }

    None
}

impl Invoker for Executor {
    fn invoke(&self, module_id: &ModuleId, input: Value, ctx: &Context) -> BoxFuture<'_, Result<Value>> {
        let child_ctx = ctx.child(module_id.clone());
        let module_id = module_id.clone();
        Box::pin(async move { self.run_pipeline(&module_id, input, child_ctx).await })
    }
}

/// Detected circular call: `module_id` recurs in `call_chain` with a
/// *different* module strictly between the two occurrences. A pure tail
/// repeat (`[A, A]`, `[A, A, A]`) is frequency, not a cycle.
pub fn is_circular(call_chain: &[ModuleId], module_id: &ModuleId) -> bool {
    if call_chain.len() < 2 {
        return false;
    }
    let prior = &call_chain[..call_chain.len() - 1];
    match prior.iter().rposition(|id| id == module_id) {
        Some(pos) => prior[pos + 1..].iter().any(|id| id != module_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_core::future::BoxFuture as CoreBoxFuture;
    use serde_json::json;

    struct Greet;
    impl Module for Greet {
        fn input_schema(&self) -> Value {
            json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]})
        }
        fn output_schema(&self) -> Value {
            json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]})
        }
        fn description(&self) -> &str {
            "Greets a caller."
        }
        fn execute<'a>(&'a self, inputs: Value, _ctx: &'a Context) -> CoreBoxFuture<'a, Result<Value>> {
            Box::pin(async move {
                let name = inputs.get("name").and_then(Value::as_str).unwrap_or("there");
                Ok(json!({"message": format!("Hello, {name}!")}))
            })
        }
    }

    struct Boom;
    impl Module for Boom {
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn output_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn description(&self) -> &str {
            "always fails"
        }
        fn execute<'a>(&'a self, _inputs: Value, _ctx: &'a Context) -> CoreBoxFuture<'a, Result<Value>> {
            Box::pin(async move {
                Err(ForgeError::ModuleExecuteError {
                    module_id: "boom".to_string(),
                    message: "kaboom".to_string(),
                })
            })
        }
    }

    struct Chatty;
    impl Module for Chatty {
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        fn output_schema(&self) -> Value {
            json!({"type": "object", "properties": {"a": {"type": "string"}, "b": {"type": "string"}}, "required": ["a", "b"]})
        }
        fn description(&self) -> &str {
            "streams two chunks"
        }
        fn execute<'a>(&'a self, inputs: Value, ctx: &'a Context) -> CoreBoxFuture<'a, Result<Value>> {
            Box::pin(async move {
                let mut stream = self.stream(inputs, ctx).expect("chatty always streams");
                let mut merged = serde_json::Map::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    if let Some(obj) = chunk.as_object() {
                        merged.extend(obj.clone());
                    }
                }
                Ok(Value::Object(merged))
            })
        }
        fn stream<'a>(&'a self, _inputs: Value, _ctx: &'a Context) -> Option<BoxStream<'a, Result<Value>>> {
            Some(Box::pin(futures::stream::iter(vec![Ok(json!({"a": "1"})), Ok(json!({"b": "2"}))])))
        }
    }

    async fn executor_with(module_id: &str, module: Arc<dyn Module>) -> Arc<Executor> {
        let registry = Arc::new(Registry::new());
        registry.register(ModuleId::from(module_id), module).await.unwrap();
        Arc::new(Executor::new(registry))
    }

    #[tokio::test]
    async fn happy_path_returns_module_output() {
        let executor = executor_with("greet", Arc::new(Greet)).await;
        let out = executor
            .call_async(&ModuleId::from("greet"), Some(json!({"name": "Alice"})), None)
            .await
            .unwrap();
        assert_eq!(out, json!({"message": "Hello, Alice!"}));
    }

    #[tokio::test]
    async fn module_not_found_raises() {
        let registry = Arc::new(Registry::new());
        let executor = Arc::new(Executor::new(registry));
        let err = executor.call_async(&ModuleId::from("missing"), None, None).await.unwrap_err();
        assert!(matches!(err.error, ForgeError::ModuleNotFound { .. }));
    }

    #[tokio::test]
    async fn failing_module_propagates_without_recovery() {
        let executor = executor_with("boom", Arc::new(Boom)).await;
        let err = executor.call_async(&ModuleId::from("boom"), None, None).await.unwrap_err();
        assert!(matches!(err.error, ForgeError::ModuleExecuteError { .. }));
    }

    #[tokio::test]
    async fn depth_exceeded_raises_before_lookup() {
        let registry = Arc::new(Registry::new());
        let config = ExecutorConfig {
            max_call_depth: 1,
            ..ExecutorConfig::default()
        };
        let executor = Arc::new(Executor::new(registry).with_config(config));
        let root = Context::create(None, None).child(ModuleId::from("a"));
        let err = executor.call_async(&ModuleId::from("b"), None, Some(&root)).await.unwrap_err();
        assert!(matches!(err.error, ForgeError::CallDepthExceeded { .. }));
    }

    #[test]
    fn circular_call_detection_matches_spec_examples() {
        let chain = |ids: &[&str]| ids.iter().map(|s| ModuleId::from(*s)).collect::<Vec<_>>();
        assert!(is_circular(&chain(&["a", "b", "a"]), &ModuleId::from("a")));
        assert!(is_circular(&chain(&["a", "b", "c", "a"]), &ModuleId::from("a")));
        assert!(!is_circular(&chain(&["a", "a"]), &ModuleId::from("a")));
        assert!(!is_circular(&chain(&["a", "a", "a"]), &ModuleId::from("a")));
    }

    #[tokio::test]
    async fn validate_bypasses_acl_and_execution() {
        let executor = executor_with("greet", Arc::new(Greet)).await;
        let result = executor.validate(&ModuleId::from("greet"), &json!({"name": "Bob"})).unwrap();
        assert!(result.valid);

        let bad = executor.validate(&ModuleId::from("greet"), &json!({})).unwrap();
        assert!(!bad.valid);
    }

    #[tokio::test]
    async fn non_streaming_module_yields_single_chunk() {
        let executor = executor_with("greet", Arc::new(Greet)).await;
        let mut stream = executor
            .stream(&ModuleId::from("greet"), Some(json!({"name": "Alice"})), None)
            .await
            .unwrap();
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first, json!({"message": "Hello, Alice!"}));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn streaming_module_yields_each_chunk_then_ends() {
        let executor = executor_with("chatty", Arc::new(Chatty)).await;
        let mut stream = executor.stream(&ModuleId::from("chatty"), None, None).await.unwrap();
        let first = stream.next().await.unwrap().unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(first, json!({"a": "1"}));
        assert_eq!(second, json!({"b": "2"}));
        assert!(stream.next().await.is_none());
    }
}
