//! The structural module contract.
//!
//! A module is anything implementing [`Module`]: an input schema, an
//! output schema, a one-line description, and an `execute` operation.
//! The trait is hand-written to return boxed futures directly (the same
//! object-safety idiom the teacher's dynamic tool trait uses) rather than
//! via `async-trait`, since modules sit on the executor's hot path.

use crate::descriptor::{ModuleAnnotations, ModuleExample};
use forge_core::context::Context;
use forge_core::error::Result;
use forge_core::future::BoxFuture;
use futures::stream::Stream;
use serde_json::Value;
use std::pin::Pin;

/// A boxed, pinned, `Send` stream of partial-output chunks.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Structural contract every registered unit of work satisfies.
///
/// `stream`, `on_load`, `on_unload`, and the descriptive accessors all have
/// permissive defaults so a minimal module needs only `input_schema`,
/// `output_schema`, `description`, and `execute`.
pub trait Module: Send + Sync {
    /// JSON-Schema-shaped input contract, opaque to the core.
    fn input_schema(&self) -> Value;

    /// JSON-Schema-shaped output contract, opaque to the core.
    fn output_schema(&self) -> Value;

    /// One-line, non-empty description of what the module does.
    fn description(&self) -> &str;

    /// Execute the module against already-validated `inputs`.
    fn execute<'a>(&'a self, inputs: Value, ctx: &'a Context) -> BoxFuture<'a, Result<Value>>;

    /// Produce a lazy sequence of partial-output chunks, if this module
    /// supports streaming. The default returns `None`; the executor falls
    /// back to a single-chunk `call_async` in that case.
    ///
    /// Building the stream has no side effects until it is polled, so
    /// probing capability and beginning consumption are the same call.
    fn stream<'a>(
        &'a self,
        inputs: Value,
        ctx: &'a Context,
    ) -> Option<BoxStream<'a, Result<Value>>> {
        let _ = (inputs, ctx);
        None
    }

    /// Run once, at registration time. A failing `on_load` aborts
    /// registration; the module is never inserted into the registry.
    fn on_load(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Run once, at removal time, best-effort. Failures are logged by the
    /// registry and never propagated.
    fn on_unload(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async { Ok(()) })
    }

    /// Optional human-readable name distinct from the registry key.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Semver-ish version string, defaulting to `"1.0.0"`.
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Free-form tags used by [`crate::descriptor::ModuleDescriptor`] export
    /// and registry `list(tags, prefix)` filtering.
    fn tags(&self) -> Vec<String> {
        Vec::new()
    }

    /// Behavioral flags surfaced to callers and external descriptor exporters.
    fn annotations(&self) -> Option<ModuleAnnotations> {
        None
    }

    /// Worked examples surfaced in the descriptor.
    fn examples(&self) -> Vec<ModuleExample> {
        Vec::new()
    }

    /// Free-form metadata merged into the descriptor.
    fn metadata(&self) -> Value {
        Value::Object(serde_json::Map::new())
    }

    /// Longer-form documentation, distinct from the one-line `description`.
    fn documentation(&self) -> Option<&str> {
        None
    }
}
