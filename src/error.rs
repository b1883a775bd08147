//! Error types for hostbridge

use thiserror::Error;

use crate::execution::Diagnostic;

/// Result type alias for hostbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// JSON-RPC: method not found
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC: internal / execution error
pub const INTERNAL_ERROR: i64 = -32603;
/// Server busy: host is recompiling or updating its own code
pub const SERVER_BUSY: i64 = -32000;

/// Main error type for hostbridge
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Host is currently compiling scripts. Please try again in a moment.")]
    Busy,

    #[error("Tool validation failed: {0}")]
    Validation(String),

    #[error("Tool with name '{0}' already exists")]
    AlreadyExists(String),

    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Cannot {action} builtin tool '{name}'. Only custom tools can be changed.")]
    Immutable { name: String, action: &'static str },

    #[error("Compilation errors:\n{}", render_diagnostics(.0))]
    Compile(Vec<Diagnostic>),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("{0}")]
    Execution(String),

    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BridgeError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Busy)
    }

    /// Get error code for the JSON-RPC envelope
    pub fn code(&self) -> i64 {
        match self {
            BridgeError::MethodNotFound(_) => METHOD_NOT_FOUND,
            BridgeError::Busy => SERVER_BUSY,
            _ => INTERNAL_ERROR,
        }
    }

    /// Machine-readable classification carried in `error.data.kind`
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::MethodNotFound(_) => "protocol",
            BridgeError::Busy => "busy",
            BridgeError::Validation(_) => "validation",
            BridgeError::AlreadyExists(_) => "already_exists",
            BridgeError::NotFound(_) => "not_found",
            BridgeError::Immutable { .. } => "immutable",
            BridgeError::Compile(_) => "compile",
            BridgeError::Runtime(_) => "runtime",
            BridgeError::Execution(_) => "execution",
            BridgeError::UnknownResource(_) => "resource",
            BridgeError::Serialization(_) => "serialization",
            BridgeError::Io(_) => "io",
            BridgeError::Watch(_) => "watch",
            BridgeError::Config(_) => "config",
            BridgeError::Internal(_) => "internal",
        }
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(BridgeError::MethodNotFound("x".into()).code(), -32601);
        assert_eq!(BridgeError::Busy.code(), -32000);
        assert_eq!(BridgeError::Runtime("boom".into()).code(), -32603);
        assert_eq!(BridgeError::NotFound("t".into()).code(), -32603);
    }

    #[test]
    fn test_only_busy_is_retryable() {
        assert!(BridgeError::Busy.is_retryable());
        assert!(!BridgeError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn test_compile_message_lists_every_diagnostic() {
        let err = BridgeError::Compile(vec![
            Diagnostic::new(Some(3), "Expecting ';'"),
            Diagnostic::new(Some(7), "Unknown capability module 'gfx'"),
        ]);
        let message = err.to_string();
        assert!(message.starts_with("Compilation errors:"));
        assert!(message.contains("Line 3: Expecting ';'"));
        assert!(message.contains("Line 7: Unknown capability module 'gfx'"));
        assert_eq!(err.kind(), "compile");
    }
}
