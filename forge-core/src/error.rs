//! Error taxonomy shared by every subsystem.
//!
//! Every variant maps to one of the stable error codes in [`ErrorCodes`].
//! Constructors mirror the detail fields callers need to act on the error
//! (e.g. `CallDepthExceeded` carries the offending chain, not just a depth).

use crate::id::ModuleId;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// All framework error codes as constants. Match against these instead of
/// string-matching `Display` output.
pub struct ErrorCodes;

impl ErrorCodes {
    pub const CONFIG_NOT_FOUND: &'static str = "CONFIG_NOT_FOUND";
    pub const CONFIG_INVALID: &'static str = "CONFIG_INVALID";
    pub const ACL_RULE_ERROR: &'static str = "ACL_RULE_ERROR";
    pub const ACL_DENIED: &'static str = "ACL_DENIED";
    pub const MODULE_NOT_FOUND: &'static str = "MODULE_NOT_FOUND";
    pub const MODULE_TIMEOUT: &'static str = "MODULE_TIMEOUT";
    pub const MODULE_LOAD_ERROR: &'static str = "MODULE_LOAD_ERROR";
    pub const MODULE_EXECUTE_ERROR: &'static str = "MODULE_EXECUTE_ERROR";
    pub const SCHEMA_VALIDATION_ERROR: &'static str = "SCHEMA_VALIDATION_ERROR";
    pub const SCHEMA_NOT_FOUND: &'static str = "SCHEMA_NOT_FOUND";
    pub const SCHEMA_PARSE_ERROR: &'static str = "SCHEMA_PARSE_ERROR";
    pub const SCHEMA_CIRCULAR_REF: &'static str = "SCHEMA_CIRCULAR_REF";
    pub const CALL_DEPTH_EXCEEDED: &'static str = "CALL_DEPTH_EXCEEDED";
    pub const CIRCULAR_CALL: &'static str = "CIRCULAR_CALL";
    pub const CALL_FREQUENCY_EXCEEDED: &'static str = "CALL_FREQUENCY_EXCEEDED";
    pub const GENERAL_INVALID_INPUT: &'static str = "GENERAL_INVALID_INPUT";
    pub const GENERAL_INTERNAL_ERROR: &'static str = "GENERAL_INTERNAL_ERROR";
    pub const FUNC_MISSING_TYPE_HINT: &'static str = "FUNC_MISSING_TYPE_HINT";
    pub const FUNC_MISSING_RETURN_TYPE: &'static str = "FUNC_MISSING_RETURN_TYPE";
    pub const BINDING_INVALID_TARGET: &'static str = "BINDING_INVALID_TARGET";
    pub const BINDING_MODULE_NOT_FOUND: &'static str = "BINDING_MODULE_NOT_FOUND";
    pub const BINDING_CALLABLE_NOT_FOUND: &'static str = "BINDING_CALLABLE_NOT_FOUND";
    pub const BINDING_SCHEMA_MISSING: &'static str = "BINDING_SCHEMA_MISSING";
    pub const BINDING_FILE_INVALID: &'static str = "BINDING_FILE_INVALID";
    pub const CIRCULAR_DEPENDENCY: &'static str = "CIRCULAR_DEPENDENCY";
}

/// One `{field, code, message}` entry produced by a failed schema validation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

/// The complete error taxonomy for the forge framework.
///
/// Every variant's `#[error(...)]` message is stable; callers relying on
/// exact wording should instead match on [`ForgeError::code`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("{message}")]
    ConfigInvalid { message: String },

    #[error("{message}")]
    AclRuleError { message: String },

    #[error("access denied: {caller_id:?} -> {target_id}")]
    AclDenied {
        caller_id: Option<String>,
        target_id: String,
    },

    #[error("module not found: {module_id}")]
    ModuleNotFound { module_id: String },

    #[error("module {module_id} timed out after {timeout_ms}ms")]
    ModuleTimeout { module_id: String, timeout_ms: u64 },

    #[error("failed to load module '{module_id}': {reason}")]
    ModuleLoadError { module_id: String, reason: String },

    #[error("module '{module_id}' execution failed: {message}")]
    ModuleExecuteError { module_id: String, message: String },

    #[error("schema validation failed")]
    SchemaValidationError { errors: Vec<FieldError> },

    #[error("schema not found: {schema_id}")]
    SchemaNotFound { schema_id: String },

    #[error("{message}")]
    SchemaParseError { message: String },

    #[error("circular reference detected: {ref_path}")]
    SchemaCircularRef { ref_path: String },

    #[error("call depth {depth} exceeds maximum {max_depth}")]
    CallDepthExceeded {
        depth: usize,
        max_depth: usize,
        call_chain: Vec<ModuleId>,
    },

    #[error("circular call detected for module {module_id}")]
    CircularCall {
        module_id: ModuleId,
        call_chain: Vec<ModuleId>,
    },

    #[error("module {module_id} called {count} times, max is {max_repeat}")]
    CallFrequencyExceeded {
        module_id: ModuleId,
        count: usize,
        max_repeat: usize,
        call_chain: Vec<ModuleId>,
    },

    #[error("{message}")]
    InvalidInput { message: String },

    // Raised by `#[forge_module]` at macro-expansion time only (as a
    // `syn::Error` compile error), never constructed at runtime: a missing
    // type hint or return type is a compile failure in Rust, not something
    // a caller can observe through a `Result`. Kept in the taxonomy so the
    // stable code strings still match the function-adapter contract.
    #[error(
        "parameter '{parameter_name}' in function '{function_name}' has no type annotation"
    )]
    FuncMissingTypeHint {
        function_name: String,
        parameter_name: String,
    },

    #[error("function '{function_name}' has no return type annotation")]
    FuncMissingReturnType { function_name: String },

    #[error("invalid binding target '{target}', expected 'module.path:callable_name'")]
    BindingInvalidTarget { target: String },

    #[error("cannot resolve module '{module_path}' for binding")]
    BindingModuleNotFound { module_path: String },

    #[error("cannot find callable '{callable_name}' in module '{module_path}'")]
    BindingCallableNotFound {
        callable_name: String,
        module_path: String,
    },

    #[error("no schema available for binding target '{target}'")]
    BindingSchemaMissing { target: String },

    #[error("invalid binding file '{file_path}': {reason}")]
    BindingFileInvalid { file_path: String, reason: String },

    #[error("circular dependency detected: {}", .cycle_path.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(" -> "))]
    CircularDependency { cycle_path: Vec<ModuleId> },

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ForgeError {
    /// The stable error code for this variant, matching [`ErrorCodes`].
    pub fn code(&self) -> &'static str {
        use ForgeError::*;
        match self {
            ConfigNotFound { .. } => ErrorCodes::CONFIG_NOT_FOUND,
            ConfigInvalid { .. } => ErrorCodes::CONFIG_INVALID,
            AclRuleError { .. } => ErrorCodes::ACL_RULE_ERROR,
            AclDenied { .. } => ErrorCodes::ACL_DENIED,
            ModuleNotFound { .. } => ErrorCodes::MODULE_NOT_FOUND,
            ModuleTimeout { .. } => ErrorCodes::MODULE_TIMEOUT,
            ModuleLoadError { .. } => ErrorCodes::MODULE_LOAD_ERROR,
            ModuleExecuteError { .. } => ErrorCodes::MODULE_EXECUTE_ERROR,
            SchemaValidationError { .. } => ErrorCodes::SCHEMA_VALIDATION_ERROR,
            SchemaNotFound { .. } => ErrorCodes::SCHEMA_NOT_FOUND,
            SchemaParseError { .. } => ErrorCodes::SCHEMA_PARSE_ERROR,
            SchemaCircularRef { .. } => ErrorCodes::SCHEMA_CIRCULAR_REF,
            CallDepthExceeded { .. } => ErrorCodes::CALL_DEPTH_EXCEEDED,
            CircularCall { .. } => ErrorCodes::CIRCULAR_CALL,
            CallFrequencyExceeded { .. } => ErrorCodes::CALL_FREQUENCY_EXCEEDED,
            InvalidInput { .. } => ErrorCodes::GENERAL_INVALID_INPUT,
            FuncMissingTypeHint { .. } => ErrorCodes::FUNC_MISSING_TYPE_HINT,
            FuncMissingReturnType { .. } => ErrorCodes::FUNC_MISSING_RETURN_TYPE,
            BindingInvalidTarget { .. } => ErrorCodes::BINDING_INVALID_TARGET,
            BindingModuleNotFound { .. } => ErrorCodes::BINDING_MODULE_NOT_FOUND,
            BindingCallableNotFound { .. } => ErrorCodes::BINDING_CALLABLE_NOT_FOUND,
            BindingSchemaMissing { .. } => ErrorCodes::BINDING_SCHEMA_MISSING,
            BindingFileInvalid { .. } => ErrorCodes::BINDING_FILE_INVALID,
            CircularDependency { .. } => ErrorCodes::CIRCULAR_DEPENDENCY,
            Internal(_) | Other(_) => ErrorCodes::GENERAL_INTERNAL_ERROR,
        }
    }
}

/// A `ForgeError` paired with the trace context it occurred in, for
/// reporting at the executor boundary. Constructed once, at the point an
/// error is about to leave the pipeline — not threaded through every `?`.
#[derive(Debug)]
pub struct TracedError {
    pub error: ForgeError,
    pub trace_id: Option<crate::id::TraceId>,
    pub timestamp: DateTime<Utc>,
}

impl TracedError {
    pub fn new(error: ForgeError, trace_id: Option<crate::id::TraceId>) -> Self {
        Self {
            error,
            trace_id,
            timestamp: Utc::now(),
        }
    }

    /// The wrapped error's stable code.
    pub fn code(&self) -> &'static str {
        self.error.code()
    }
}

impl std::fmt::Display for TracedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error.code(), self.error)
    }
}

impl std::error::Error for TracedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_variant() {
        let err = ForgeError::ModuleNotFound {
            module_id: "greet".into(),
        };
        assert_eq!(err.code(), ErrorCodes::MODULE_NOT_FOUND);
    }

    #[test]
    fn circular_dependency_message_includes_path() {
        let err = ForgeError::CircularDependency {
            cycle_path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "circular dependency detected: a -> b -> a");
    }

    #[test]
    fn traced_error_displays_code_prefixed() {
        let traced = TracedError::new(
            ForgeError::InvalidInput {
                message: "bad".into(),
            },
            None,
        );
        assert!(traced.to_string().starts_with("[GENERAL_INVALID_INPUT]"));
    }
}
