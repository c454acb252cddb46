//! Built-in structured-logging middleware.
//!
//! Timing state lives in `ctx.data` under a private key rather than on the
//! middleware instance, so a middleware shared across concurrent call trees
//! doesn't race on a single field — each call's `Context::data` is private
//! to its own tree (see `forge_core::context`).

use crate::middleware::Middleware;
use forge_core::context::Context;
use forge_core::error::{ForgeError, Result};
use forge_core::future::BoxFuture;
use forge_core::id::ModuleId;
use serde_json::Value;
use tracing::{error, info};

const TIMER_KEY_PREFIX: &str = "__forge_logging_start_ns";

fn timer_key(module_id: &ModuleId) -> String {
    format!("{TIMER_KEY_PREFIX}:{module_id}")
}

fn now_nanos() -> u128 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
}

/// Logs a start event in `before`, an end event with elapsed duration in
/// `after`, and an error event in `on_error`, all carrying redacted inputs
/// when available.
#[derive(Debug, Default)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before<'a>(
        &'a self,
        module_id: &'a ModuleId,
        inputs: Value,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            ctx.data_set(timer_key(module_id), Value::from(now_nanos().to_string()));
            info!(
                module_id = %module_id,
                trace_id = %ctx.trace_id,
                inputs = %ctx.redacted_inputs.clone().unwrap_or_else(|| inputs.clone()),
                "module call started"
            );
            Ok(None)
        })
    }

    fn after<'a>(
        &'a self,
        module_id: &'a ModuleId,
        _inputs: &'a Value,
        output: Value,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Result<Option<Value>>> {
        Box::pin(async move {
            let elapsed_ms = ctx
                .data_get(&timer_key(module_id))
                .and_then(|v| v.as_str().and_then(|s| s.parse::<u128>().ok()))
                .map(|start| (now_nanos().saturating_sub(start)) as f64 / 1_000_000.0);
            info!(
                module_id = %module_id,
                trace_id = %ctx.trace_id,
                elapsed_ms,
                "module call finished"
            );
            Ok(Some(output))
        })
    }

    fn on_error<'a>(
        &'a self,
        module_id: &'a ModuleId,
        inputs: &'a Value,
        error: &'a ForgeError,
        ctx: &'a Context,
    ) -> BoxFuture<'a, Option<Value>> {
        Box::pin(async move {
            error!(
                module_id = %module_id,
                trace_id = %ctx.trace_id,
                code = error.code(),
                inputs = %ctx.redacted_inputs.clone().unwrap_or_else(|| inputs.clone()),
                "module call failed"
            );
            None
        })
    }

    fn name(&self) -> &str {
        "forge.logging"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn before_sets_timer_after_reports_elapsed() {
        let mw = LoggingMiddleware;
        let module_id = ModuleId::from("greet");
        let ctx = Context::create(None, None).child(module_id.clone());

        mw.before(&module_id, json!({}), &ctx).await.unwrap();
        assert!(ctx.data_get(&timer_key(&module_id)).is_some());

        let out = mw
            .after(&module_id, &json!({}), json!({"message": "hi"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out, Some(json!({"message": "hi"})));
    }

    #[tokio::test]
    async fn timer_survives_nested_calls_via_shared_data() {
        let mw = LoggingMiddleware;
        let outer_id = ModuleId::from("outer");
        let inner_id = ModuleId::from("inner");
        let outer_ctx = Context::create(None, None).child(outer_id.clone());
        mw.before(&outer_id, json!({}), &outer_ctx).await.unwrap();

        let inner_ctx = outer_ctx.child(inner_id.clone());
        mw.before(&inner_id, json!({}), &inner_ctx).await.unwrap();
        mw.after(&inner_id, &json!({}), json!({}), &inner_ctx).await.unwrap();

        // The outer timer key is untouched by the nested call.
        assert!(outer_ctx.data_get(&timer_key(&outer_id)).is_some());
    }
}
