//! Module execution context.

use crate::id::{ModuleId, TraceId};
use crate::identity::Identity;
use crate::invoker::Invoker;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Per-call execution context, threaded through the executor pipeline and
/// into middleware and module implementations.
///
/// `data` is shared (not copied) between a context and every context
/// derived from it via [`Context::child`] — middleware such as a tracing
/// or timing middleware relies on this shared reference to keep a
/// span/timing stack consistent across nested module-to-module calls.
#[derive(Clone)]
pub struct Context {
    pub trace_id: TraceId,
    pub caller_id: Option<ModuleId>,
    pub call_chain: Vec<ModuleId>,
    pub executor: Option<Arc<dyn Invoker>>,
    pub identity: Option<Identity>,
    pub redacted_inputs: Option<serde_json::Value>,
    pub data: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl Context {
    /// Create a new top-level context with a freshly generated trace id.
    pub fn create(executor: Option<Arc<dyn Invoker>>, identity: Option<Identity>) -> Self {
        Self {
            trace_id: TraceId::new(uuid::Uuid::new_v4().to_string()),
            caller_id: None,
            call_chain: Vec::new(),
            executor,
            identity,
            redacted_inputs: None,
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a child context for calling `target_module_id`.
    ///
    /// The new context shares this one's trace id, executor, identity, and
    /// `data` map by reference; `call_chain` is extended, not shared, since
    /// each context needs its own view of the chain leading to it.
    pub fn child(&self, target_module_id: ModuleId) -> Self {
        let caller_id = self.call_chain.last().cloned();
        let mut call_chain = self.call_chain.clone();
        call_chain.push(target_module_id);
        Self {
            trace_id: self.trace_id.clone(),
            caller_id,
            call_chain,
            executor: self.executor.clone(),
            identity: self.identity.clone(),
            redacted_inputs: None,
            data: Arc::clone(&self.data),
        }
    }

    /// Current call depth: the length of `call_chain`.
    pub fn depth(&self) -> usize {
        self.call_chain.len()
    }

    /// Fetch a value from the shared data bag.
    pub fn data_get(&self, key: &str) -> Option<serde_json::Value> {
        self.data.lock().expect("context data mutex poisoned").get(key).cloned()
    }

    /// Insert a value into the shared data bag.
    pub fn data_set(&self, key: impl Into<String>, value: serde_json::Value) {
        self.data
            .lock()
            .expect("context data mutex poisoned")
            .insert(key.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_has_empty_chain_and_no_caller() {
        let ctx = Context::create(None, None);
        assert!(ctx.call_chain.is_empty());
        assert!(ctx.caller_id.is_none());
        assert_eq!(ctx.depth(), 0);
    }

    #[test]
    fn child_extends_chain_and_sets_caller() {
        let root = Context::create(None, None);
        let first = root.child(ModuleId::from("a"));
        assert_eq!(first.call_chain, vec![ModuleId::from("a")]);
        assert_eq!(first.caller_id, None);

        let second = first.child(ModuleId::from("b"));
        assert_eq!(second.call_chain, vec![ModuleId::from("a"), ModuleId::from("b")]);
        assert_eq!(second.caller_id, Some(ModuleId::from("a")));
        assert_eq!(second.depth(), 2);
    }

    #[test]
    fn data_bag_is_shared_with_children() {
        let root = Context::create(None, None);
        let child = root.child(ModuleId::from("a"));
        child.data_set("k", serde_json::json!(1));
        assert_eq!(root.data_get("k"), Some(serde_json::json!(1)));
    }

    #[test]
    fn trace_id_is_preserved_across_children() {
        let root = Context::create(None, None);
        let child = root.child(ModuleId::from("a"));
        assert_eq!(root.trace_id, child.trace_id);
    }
}
