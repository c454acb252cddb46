//! Back-reference from a [`crate::Context`] into whatever can execute a module call.
//!
//! `Context` needs to let module implementations call other modules
//! (nested invocation), but forge-core doesn't depend on the executor
//! crate that actually implements the call pipeline. `Invoker` is the
//! seam: the executor crate implements it, and a `Context` holds one as
//! `Arc<dyn Invoker>`.

use crate::error::Result;
use crate::future::BoxFuture;
use crate::id::ModuleId;

/// Something that can execute a module call given a child context.
///
/// Implemented by the executor; stored as `Arc<dyn Invoker>` so forge-core
/// stays free of a dependency on the crate that defines the pipeline.
pub trait Invoker: Send + Sync {
    /// Invoke `module_id` with `input`, using `ctx` as the calling context.
    ///
    /// The implementation is responsible for deriving the child context
    /// (incrementing depth, appending to `call_chain`) before running the
    /// pipeline — callers pass the context they already have.
    fn invoke(
        &self,
        module_id: &ModuleId,
        input: serde_json::Value,
        ctx: &crate::context::Context,
    ) -> BoxFuture<'_, Result<serde_json::Value>>;
}
