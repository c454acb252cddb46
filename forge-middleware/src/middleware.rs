//! The three-hook middleware contract.

use forge_core::context::Context;
use forge_core::error::Result;
use forge_core::future::BoxFuture;
use forge_core::id::ModuleId;
use serde_json::Value;

/// An onion-model interceptor around a module call.
///
/// Every hook has a no-op default so a middleware can implement only the
/// phase it cares about. `before`/`after` returning `None` means "leave
/// inputs/output unchanged"; `on_error` returning `None` means "I can't
/// recover this."
pub trait Middleware: Send + Sync {
    /// Run before `execute`. A `Some(value)` return replaces `inputs`.
    fn before<'a>(
        &'a self,
        module_id: &'a ModuleId,
        inputs: Value,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        let _ = (module_id, ctx);
        Box::pin(async move { Ok(None) })
    }

    /// Run after `execute`, in reverse registration order. A `Some(value)`
    /// return replaces the current output.
    fn after<'a>(
        &'a self,
        module_id: &'a ModuleId,
        inputs: &'a Value,
        output: Value,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        let _ = (module_id, inputs, ctx);
        Box::pin(async move { Ok(None) })
    }

    /// Run over the `executed` list in reverse, on any failure from
    /// `before` onward. A `Some(value)` return recovers the call with that
    /// value as its final output.
    fn on_error<'a>(
        &'a self,
        module_id: &'a ModuleId,
        inputs: &'a Value,
        error: &'a forge_core::error::ForgeError,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Option<Value>> {
        let _ = (module_id, inputs, error, ctx);
        Box::pin(async move { None })
    }

    /// Identifying label for diagnostics; defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
