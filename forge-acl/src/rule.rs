//! ACL rule and file-format types.

use serde::{Deserialize, Serialize};

/// Whether a matching rule allows or denies the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Permit the call.
    Allow,
    /// Reject the call.
    Deny,
}

impl Effect {
    /// `true` for [`Effect::Allow`].
    pub fn is_allow(self) -> bool {
        matches!(self, Effect::Allow)
    }
}

/// All-of conditions narrowing when a rule applies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    /// `context.identity.kind` must be one of these.
    #[serde(default, rename = "identity_types", skip_serializing_if = "Option::is_none")]
    pub identity_types: Option<Vec<String>>,
    /// `context.identity.roles` must intersect with these.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    /// `context.call_chain.len()` must not exceed this.
    #[serde(default, rename = "max_call_depth", skip_serializing_if = "Option::is_none")]
    pub max_call_depth: Option<usize>,
}

/// One ordered ACL rule: `(callers, targets, effect)` plus optional
/// conditions. Pattern lists are matched with "some pattern matches."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclRule {
    /// Caller patterns; a rule matches if any pattern matches the caller.
    pub callers: Vec<String>,
    /// Target patterns; a rule matches if any pattern matches the target.
    pub targets: Vec<String>,
    /// Effect applied when this rule is the first match.
    pub effect: Effect,
    /// Optional human-readable description, surfaced in decision logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional all-of conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Conditions>,
}

impl AclRule {
    /// Whether this rule's pattern lists are element-wise equal to the
    /// given ones, used by [`crate::acl::Acl::remove_rule`] to find a match
    /// irrespective of effect/description/conditions.
    pub fn patterns_eq(&self, callers: &[String], targets: &[String]) -> bool {
        self.callers == callers && self.targets == targets
    }
}

/// The on-disk ACL file format (§6): an ordered rule list plus a default
/// effect applied when no rule matches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AclFile {
    /// Ordered rules, evaluated first-match-wins.
    pub rules: Vec<AclRule>,
    /// Effect used when no rule matches. Defaults to deny.
    #[serde(default = "default_effect")]
    pub default_effect: Effect,
}

fn default_effect() -> Effect {
    Effect::Deny
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_yaml_rule_file() {
        let yaml = r#"
rules:
  - callers: ["@external"]
    targets: ["secret.*"]
    effect: deny
    description: "block external access to secret.*"
default_effect: allow
"#;
        let parsed: AclFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.rules.len(), 1);
        assert_eq!(parsed.rules[0].effect, Effect::Deny);
        assert_eq!(parsed.default_effect, Effect::Allow);
    }

    #[test]
    fn default_effect_is_deny_when_absent() {
        let yaml = "rules: []\n";
        let parsed: AclFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.default_effect, Effect::Deny);
    }
}
