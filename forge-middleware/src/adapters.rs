//! Closure adapters for callers who only need one middleware hook.

use crate::middleware::Middleware;
use forge_core::context::Context;
use forge_core::error::Result;
use forge_core::future::BoxFuture;
use forge_core::id::ModuleId;
use serde_json::Value;

/// Adapts a before-only closure into a full [`Middleware`].
pub struct BeforeMiddleware<F> {
    name: String,
    func: F,
}

impl<F> BeforeMiddleware<F>
where
    F: for<'a> Fn(&'a ModuleId, Value, &'a Context) -> BoxFuture<'a, Result<Option<Value>>>
        + Send
        + Sync,
{
    /// Wrap `func` as a middleware named `name` (used in diagnostics).
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Middleware for BeforeMiddleware<F>
where
    F: for<'a> Fn(&'a ModuleId, Value, &'a Context) -> BoxFuture<'a, Result<Option<Value>>>
        + Send
        + Sync,
{
    fn before<'a>(
        &'a self,
        module_id: &'a ModuleId,
        inputs: Value,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        (self.func)(module_id, inputs, ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Adapts an after-only closure into a full [`Middleware`].
pub struct AfterMiddleware<F> {
    name: String,
    func: F,
}

impl<F> AfterMiddleware<F>
where
    F: for<'a> Fn(&'a ModuleId, &'a Value, Value, &'a Context) -> BoxFuture<'a, Result<Option<Value>>>
        + Send
        + Sync,
{
    /// Wrap `func` as a middleware named `name` (used in diagnostics).
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Middleware for AfterMiddleware<F>
where
    F: for<'a> Fn(&'a ModuleId, &'a Value, Value, &'a Context) -> BoxFuture<'a, Result<Option<Value>>>
        + Send
        + Sync,
{
    fn after<'a>(
        &'a self,
        module_id: &'a ModuleId,
        inputs: &'a Value,
        output: Value,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        (self.func)(module_id, inputs, output, ctx)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
