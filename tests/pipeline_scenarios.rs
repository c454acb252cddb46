//! End-to-end coverage of the executor's call pipeline, exercised the way
//! a caller wiring registry + middleware + ACL together actually would.

use forge::prelude::*;
use forge_acl::{AclRule, Effect};
use forge_core::context::Context;
use forge_core::error::ForgeError;
use forge_core::future::BoxFuture;
use forge_core::id::ModuleId;
use forge_middleware::{AfterMiddleware, Middleware, MiddlewareManager};
use forge_registry::{Registry, ScanRoot};
use forge_types::Module;
use serde_json::{json, Value};
use std::sync::Arc;

struct Greet;
impl Module for Greet {
    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {"name": {"type": "string"}}, "required": ["name"]})
    }
    fn output_schema(&self) -> Value {
        json!({"type": "object", "properties": {"message": {"type": "string"}}, "required": ["message"]})
    }
    fn description(&self) -> &str {
        "Greets a caller by name."
    }
    fn execute<'a>(&'a self, inputs: Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
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
    fn execute<'a>(&'a self, _inputs: Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            Err(ForgeError::ModuleExecuteError {
                module_id: "boom".to_string(),
                message: "kaboom".to_string(),
            })
        })
    }
}

struct Sleeper;
impl Module for Sleeper {
    fn input_schema(&self) -> Value {
        json!({"type": "object"})
    }
    fn output_schema(&self) -> Value {
        json!({"type": "object"})
    }
    fn description(&self) -> &str {
        "sleeps longer than the configured timeout"
    }
    fn execute<'a>(&'a self, _inputs: Value, _ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            Ok(json!({}))
        })
    }
}

struct Login;
impl Module for Login {
    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "username": {"type": "string"},
                "password": {"type": "string", "sensitive": true},
            },
            "required": ["username", "password"],
        })
    }
    fn output_schema(&self) -> Value {
        json!({"type": "object"})
    }
    fn description(&self) -> &str {
        "logs a caller in"
    }
    fn execute<'a>(&'a self, inputs: Value, ctx: &'a Context) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            // The module itself still sees raw, unredacted inputs.
            assert_eq!(inputs["password"], json!("s"));
            assert_eq!(ctx.redacted_inputs.as_ref().unwrap()["password"], json!("***REDACTED***"));
            Ok(json!({"ok": true}))
        })
    }
}

struct RecoveringMiddleware {
    name: String,
    recovery: Value,
}

impl Middleware for RecoveringMiddleware {
    fn on_error<'a>(
        &'a self,
        _module_id: &'a ModuleId,
        _inputs: &'a Value,
        _error: &'a ForgeError,
        _ctx: &'a Context,
    ) -> BoxFuture<'a, Option<Value>> {
        let recovery = self.recovery.clone();
        Box::pin(async move { Some(recovery) })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

async fn executor_with(module_id: &str, module: Arc<dyn Module>) -> Arc<Executor> {
    let registry = Arc::new(Registry::new());
    registry.register(ModuleId::from(module_id), module).await.unwrap();
    Arc::new(Executor::new(registry))
}

#[tokio::test]
async fn scenario_1_happy_path() {
    let executor = executor_with("greet", Arc::new(Greet)).await;
    let out = executor
        .call_async(&ModuleId::from("greet"), Some(json!({"name": "Alice"})), None)
        .await
        .unwrap();
    assert_eq!(out, json!({"message": "Hello, Alice!"}));
}

#[tokio::test]
async fn scenario_2_after_chain_modifies_output() {
    let registry = Arc::new(Registry::new());
    registry.register(ModuleId::from("greet"), Arc::new(Greet)).await.unwrap();

    let middleware = Arc::new(MiddlewareManager::new());
    middleware.add(Arc::new(AfterMiddleware::new("annotate", |_id, _inputs, output, _ctx| {
        Box::pin(async move {
            let message = output["message"].as_str().unwrap_or_default();
            Ok(Some(json!({"message": format!("{message} [m]")})))
        })
    })));

    let executor = Arc::new(Executor::new(registry).with_middleware(middleware));
    let out = executor
        .call_async(&ModuleId::from("greet"), Some(json!({"name": "Alice"})), None)
        .await
        .unwrap();
    assert_eq!(out, json!({"message": "Hello, Alice! [m]"}));
}

#[tokio::test]
async fn scenario_3_on_error_recovery() {
    let registry = Arc::new(Registry::new());
    registry.register(ModuleId::from("boom"), Arc::new(Boom)).await.unwrap();

    let middleware = Arc::new(MiddlewareManager::new());
    middleware.add(Arc::new(RecoveringMiddleware {
        name: "recover".to_string(),
        recovery: json!({"recovered": true}),
    }));

    let executor = Arc::new(Executor::new(registry).with_middleware(middleware));
    let out = executor.call_async(&ModuleId::from("boom"), None, None).await.unwrap();
    assert_eq!(out, json!({"recovered": true}));
}

#[tokio::test]
async fn scenario_4_cascade_stops_at_first_recovery() {
    let registry = Arc::new(Registry::new());
    registry.register(ModuleId::from("boom"), Arc::new(Boom)).await.unwrap();

    let middleware = Arc::new(MiddlewareManager::new());
    middleware.add(Arc::new(RecoveringMiddleware {
        name: "a".to_string(),
        recovery: json!({"from": "a"}),
    }));
    middleware.add(Arc::new(RecoveringMiddleware {
        name: "b".to_string(),
        recovery: json!({"from": "b"}),
    }));

    let executor = Arc::new(Executor::new(registry).with_middleware(middleware));
    let out = executor.call_async(&ModuleId::from("boom"), None, None).await.unwrap();
    // Reverse registration order: "b" runs first and its recovery wins.
    assert_eq!(out, json!({"from": "b"}));
}

#[tokio::test]
async fn scenario_5_input_redaction() {
    let executor = executor_with("login", Arc::new(Login)).await;
    executor
        .call_async(&ModuleId::from("login"), Some(json!({"username": "a", "password": "s"})), None)
        .await
        .unwrap();
}

#[tokio::test]
async fn scenario_6_acl_deny() {
    let registry = Arc::new(Registry::new());
    registry.register(ModuleId::from("secret.read"), Arc::new(Greet)).await.unwrap();

    let acl = Arc::new(Acl::new(
        vec![AclRule {
            callers: vec!["@external".to_string()],
            targets: vec!["secret.*".to_string()],
            effect: Effect::Deny,
            description: None,
            conditions: None,
        }],
        Effect::Allow,
    ));

    let executor = Arc::new(Executor::new(registry).with_acl(acl));
    let err = executor.call_async(&ModuleId::from("secret.read"), None, None).await.unwrap_err();
    match err.error {
        ForgeError::AclDenied { caller_id, target_id } => {
            assert_eq!(caller_id, None);
            assert_eq!(target_id, "secret.read");
        }
        other => panic!("expected AclDenied, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_7_discovery_cycle() {
    // topological_order() runs before any library is loaded during
    // discovery, so a cycle declared purely in companion metadata files is
    // enough to trip it — the placeholder module files are never opened.
    let dir = tempfile::tempdir().unwrap();
    let ext = std::env::consts::DLL_EXTENSION;

    for name in ["a", "b", "c"] {
        std::fs::write(dir.path().join(format!("{name}.{ext}")), b"").unwrap();
    }
    std::fs::write(dir.path().join("a.meta.yaml"), "description: a\ndependencies:\n  - module_id: b\n").unwrap();
    std::fs::write(dir.path().join("b.meta.yaml"), "description: b\ndependencies:\n  - module_id: c\n").unwrap();
    std::fs::write(dir.path().join("c.meta.yaml"), "description: c\ndependencies:\n  - module_id: a\n").unwrap();

    let registry = Registry::new();
    let root = ScanRoot::new(dir.path());
    let err = registry.discover(&[root], 8, false, None).await.unwrap_err();
    match err {
        ForgeError::CircularDependency { cycle_path } => {
            let ids: Vec<&str> = cycle_path.iter().map(|m| m.as_str()).collect();
            assert!(ids.contains(&"a"));
            assert!(ids.contains(&"b"));
            assert!(ids.contains(&"c"));
        }
        other => panic!("expected CircularDependency, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_8_timeout() {
    let registry = Arc::new(Registry::new());
    registry.register(ModuleId::from("sleeper"), Arc::new(Sleeper)).await.unwrap();

    let config = ExecutorConfig {
        default_timeout_ms: 100,
        ..ExecutorConfig::default()
    };
    let executor = Arc::new(Executor::new(registry).with_config(config));
    let err = executor.call_async(&ModuleId::from("sleeper"), None, None).await.unwrap_err();
    match err.error {
        ForgeError::ModuleTimeout { module_id, timeout_ms } => {
            assert_eq!(module_id, "sleeper");
            assert_eq!(timeout_ms, 100);
        }
        other => panic!("expected ModuleTimeout, got {other:?}"),
    }
}
