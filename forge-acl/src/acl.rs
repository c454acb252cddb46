//! Ordered, pattern-matched, first-match-wins access control.

use crate::rule::{AclFile, AclRule, Conditions, Effect};
use forge_core::context::Context;
use forge_core::error::{ForgeError, Result};
use forge_core::id::ModuleId;
use forge_core::pattern::{match_pattern, EXTERNAL_CALLER, SYSTEM_CALLER};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

struct State {
    rules: Vec<AclRule>,
    default_effect: Effect,
}

/// Access-control engine: an ordered rule list plus a default effect for
/// calls no rule matches.
///
/// All reads and writes take one mutex; [`Acl::check`] copies the rule
/// list and default effect under the lock, then evaluates unlocked.
pub struct Acl {
    state: Mutex<State>,
    source_path: Mutex<Option<PathBuf>>,
}

impl Acl {
    /// Build an ACL from an explicit rule list and default effect.
    pub fn new(rules: Vec<AclRule>, default_effect: Effect) -> Self {
        Self {
            state: Mutex::new(State { rules, default_effect }),
            source_path: Mutex::new(None),
        }
    }

    /// An ACL with no rules and a deny-by-default posture.
    pub fn deny_all() -> Self {
        Self::new(Vec::new(), Effect::Deny)
    }

    /// An ACL with no rules and an allow-by-default posture.
    pub fn allow_all() -> Self {
        Self::new(Vec::new(), Effect::Allow)
    }

    /// Load an ACL from a YAML file (§6), recording the path so
    /// [`Acl::reload`] can re-read it later.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ForgeError::ConfigNotFound {
            path: format!("{}: {e}", path.display()),
        })?;
        let file: AclFile = serde_yaml::from_str(&contents).map_err(|e| ForgeError::AclRuleError {
            message: format!("invalid ACL file {}: {e}", path.display()),
        })?;
        let acl = Self::new(file.rules, file.default_effect);
        *acl.source_path.lock().expect("acl source_path mutex poisoned") = Some(path.to_path_buf());
        Ok(acl)
    }

    /// Re-read the rule list and default effect from the path passed to
    /// [`Acl::load`]. Errors if this ACL has no recorded source.
    pub fn reload(&self) -> Result<()> {
        let path = self
            .source_path
            .lock()
            .expect("acl source_path mutex poisoned")
            .clone()
            .ok_or_else(|| ForgeError::AclRuleError {
                message: "reload() called on an ACL with no source file".to_string(),
            })?;
        let contents = std::fs::read_to_string(&path).map_err(|e| ForgeError::ConfigNotFound {
            path: format!("{}: {e}", path.display()),
        })?;
        let file: AclFile = serde_yaml::from_str(&contents).map_err(|e| ForgeError::AclRuleError {
            message: format!("invalid ACL file {}: {e}", path.display()),
        })?;
        let mut state = self.state.lock().expect("acl state mutex poisoned");
        state.rules = file.rules;
        state.default_effect = file.default_effect;
        Ok(())
    }

    /// Insert a rule at position 0 (highest priority).
    pub fn add_rule(&self, rule: AclRule) {
        self.state.lock().expect("acl state mutex poisoned").rules.insert(0, rule);
    }

    /// Remove the first rule whose `callers`/`targets` are element-wise
    /// equal to the given lists. Returns whether a rule was removed.
    pub fn remove_rule(&self, callers: &[String], targets: &[String]) -> bool {
        let mut state = self.state.lock().expect("acl state mutex poisoned");
        if let Some(pos) = state.rules.iter().position(|r| r.patterns_eq(callers, targets)) {
            state.rules.remove(pos);
            true
        } else {
            false
        }
    }

    /// Number of rules currently loaded.
    pub fn rule_count(&self) -> usize {
        self.state.lock().expect("acl state mutex poisoned").rules.len()
    }

    /// Decide whether `caller_id` may call `target_id`.
    ///
    /// `caller_id: None` is treated as the synthetic `@external` caller.
    /// Rules are evaluated in order; the first rule whose caller pattern,
    /// target pattern, and conditions all match decides the call. With no
    /// match, the configured default effect decides.
    pub fn check(&self, caller_id: Option<&ModuleId>, target_id: &ModuleId, ctx: Option<&Context>) -> bool {
        let effective_caller = caller_id.map(ModuleId::as_str).unwrap_or(EXTERNAL_CALLER);

        let (rules, default_effect) = {
            let state = self.state.lock().expect("acl state mutex poisoned");
            (state.rules.clone(), state.default_effect)
        };

        for rule in &rules {
            let caller_matches = rule
                .callers
                .iter()
                .any(|p| match_caller_pattern(p, effective_caller, ctx));
            if !caller_matches {
                continue;
            }
            let target_matches = rule.targets.iter().any(|p| match_pattern(p, target_id.as_str()));
            if !target_matches {
                continue;
            }
            if !conditions_pass(rule.conditions.as_ref(), ctx) {
                continue;
            }

            debug!(
                caller_id = effective_caller,
                target_id = %target_id,
                effect = ?rule.effect,
                description = rule.description.as_deref().unwrap_or(""),
                "acl rule matched"
            );
            return rule.effect.is_allow();
        }

        debug!(
            caller_id = effective_caller,
            target_id = %target_id,
            effect = ?default_effect,
            "acl decided by default effect"
        );
        default_effect.is_allow()
    }
}

fn match_caller_pattern(pattern: &str, effective_caller: &str, ctx: Option<&Context>) -> bool {
    match pattern {
        EXTERNAL_CALLER => effective_caller == EXTERNAL_CALLER,
        SYSTEM_CALLER => ctx
            .and_then(|c| c.identity.as_ref())
            .map(|identity| identity.is_system())
            .unwrap_or(false),
        _ => match_pattern(pattern, effective_caller),
    }
}

fn conditions_pass(conditions: Option<&Conditions>, ctx: Option<&Context>) -> bool {
    let Some(conditions) = conditions else {
        return true;
    };

    if let Some(identity_types) = &conditions.identity_types {
        let Some(identity) = ctx.and_then(|c| c.identity.as_ref()) else {
            return false;
        };
        if !identity_types.iter().any(|t| t == &identity.kind) {
            return false;
        }
    }

    if let Some(roles) = &conditions.roles {
        let Some(identity) = ctx.and_then(|c| c.identity.as_ref()) else {
            return false;
        };
        if !roles.iter().any(|r| identity.roles.contains(r)) {
            return false;
        }
    }

    if let Some(max_depth) = conditions.max_call_depth {
        let Some(ctx) = ctx else {
            return false;
        };
        if ctx.depth() > max_depth {
            return false;
        }
    }

    true
}
