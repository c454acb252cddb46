//! Ordered, mutex-guarded middleware chain with snapshot-based execution.
//!
//! The specification notes two middleware-manager implementations existed
//! in the reference source, one lock-free. Only the mutex-guarded shape is
//! implemented here — see `DESIGN.md` for that decision.

use crate::middleware::Middleware;
use forge_core::context::Context;
use forge_core::error::{ForgeError, Result};
use forge_core::id::ModuleId;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Wraps a `before`-hook failure together with the middlewares whose
/// `before` had already run, so the executor can run exactly those through
/// the on-error cascade.
#[derive(Debug)]
pub struct MiddlewareChainError {
    /// The original failure from the middleware (or module) that raised.
    pub cause: ForgeError,
    /// Middlewares (by index into the snapshot) whose `before` already ran.
    pub executed: Vec<usize>,
}

impl std::fmt::Display for MiddlewareChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "middleware chain failed: {}", self.cause)
    }
}

impl std::error::Error for MiddlewareChainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Ordered list of [`Middleware`], guarded by a single mutex.
///
/// Reads and writes all take the same lock; `snapshot()` clones the `Arc`
/// list under lock and callers iterate the clone unlocked, so in-flight
/// calls are unaffected by concurrent `add`/`remove`.
#[derive(Default)]
pub struct MiddlewareManager {
    middlewares: Mutex<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareManager {
    /// An empty middleware chain.
    pub fn new() -> Self {
        Self {
            middlewares: Mutex::new(Vec::new()),
        }
    }

    /// Append a middleware to the end of the chain.
    pub fn add(&self, middleware: Arc<dyn Middleware>) {
        self.middlewares
            .lock()
            .expect("middleware manager mutex poisoned")
            .push(middleware);
    }

    /// Remove a middleware by pointer identity (not `Eq`). Returns whether
    /// a removal happened.
    pub fn remove(&self, middleware: &Arc<dyn Middleware>) -> bool {
        let mut guard = self.middlewares.lock().expect("middleware manager mutex poisoned");
        let before = guard.len();
        guard.retain(|m| !Arc::ptr_eq(m, middleware));
        guard.len() != before
    }

    /// A point-in-time copy of the chain, safe to iterate unlocked.
    pub fn snapshot(&self) -> Vec<Arc<dyn Middleware>> {
        self.middlewares.lock().expect("middleware manager mutex poisoned").clone()
    }

    /// Number of registered middlewares.
    pub fn len(&self) -> usize {
        self.middlewares.lock().expect("middleware manager mutex poisoned").len()
    }

    /// Whether the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run the before-chain in registration order.
    ///
    /// Returns the (possibly rewritten) inputs and the indices of
    /// middlewares whose `before` ran, for use by the on-error cascade. On
    /// failure, returns a [`MiddlewareChainError`] carrying the same
    /// `executed` list and the original cause.
    pub async fn execute_before(
        &self,
        module_id: &ModuleId,
        inputs: Value,
        ctx: &Context,
    ) -> std::result::Result<(Value, Vec<usize>), MiddlewareChainError> {
        let snapshot = self.snapshot();
        let mut current = inputs;
        let mut executed = Vec::with_capacity(snapshot.len());

        for (idx, middleware) in snapshot.iter().enumerate() {
            executed.push(idx);
            match middleware.before(module_id, current.clone(), ctx).await {
                Ok(Some(rewritten)) => current = rewritten,
                Ok(None) => {}
                Err(cause) => {
                    return Err(MiddlewareChainError { cause, executed });
                }
            }
        }

        Ok((current, executed))
    }

    /// Run the after-chain in reverse registration order over the full
    /// snapshot (every middleware's `after` runs, regardless of which ran
    /// in `before` — this only executes on the success path).
    pub async fn execute_after(
        &self,
        module_id: &ModuleId,
        inputs: &Value,
        output: Value,
        ctx: &Context,
    ) -> Result<Value> {
        let snapshot = self.snapshot();
        let mut current = output;

        for middleware in snapshot.iter().rev() {
            if let Some(rewritten) = middleware.after(module_id, inputs, current.clone(), ctx).await? {
                current = rewritten;
            }
        }

        Ok(current)
    }

    /// Run `on_error` over exactly the middlewares named in `executed`, in
    /// reverse. Returns the first recovery value, if any.
    pub async fn execute_on_error(
        &self,
        module_id: &ModuleId,
        inputs: &Value,
        error: &ForgeError,
        ctx: &Context,
        executed: &[usize],
    ) -> Option<Value> {
        let snapshot = self.snapshot();

        for &idx in executed.iter().rev() {
            let Some(middleware) = snapshot.get(idx) else {
                continue;
            };
            debug!(middleware = middleware.name(), module_id = %module_id, "running on_error handler");
            if let Some(recovery) = middleware.on_error(module_id, inputs, error, ctx).await {
                return Some(recovery);
            }
        }

        error!(module_id = %module_id, error = %error, "no middleware recovered the failure");
        None
    }
}
