//! Compile-backend seam
//!
//! A backend turns a synthesized [`SourceUnit`] into something invocable, or
//! reports why it cannot. Backends are probed at startup and the first one
//! that works is used for the lifetime of the process.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};
use crate::host::CapabilityModule;

use super::synth::SourceUnit;

/// One compiler message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// 1-based line in the synthesized unit, when known
    pub line: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A compiled unit ready to run
pub trait LoadedUnit {
    /// Call `entry_point` once with the context mapping
    fn invoke(&self, entry_point: &str, context: &Map<String, Value>) -> std::result::Result<Value, String>;
}

/// Source-to-loadable-unit compiler
pub trait CompileBackend {
    fn name(&self) -> &'static str;

    /// Whether this backend works in the current environment
    fn probe(&self) -> bool;

    /// Compile `unit` against the host's currently loaded modules
    fn compile(
        &self,
        unit: &SourceUnit,
        modules: &[CapabilityModule],
    ) -> std::result::Result<Box<dyn LoadedUnit>, Vec<Diagnostic>>;
}

/// First candidate whose probe passes
pub fn select_backend(candidates: Vec<Box<dyn CompileBackend>>) -> Result<Box<dyn CompileBackend>> {
    for backend in candidates {
        if backend.probe() {
            tracing::info!("Using compile backend: {}", backend.name());
            return Ok(backend);
        }
        tracing::warn!("Compile backend {} unavailable", backend.name());
    }
    Err(BridgeError::Internal("No compile backend available".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, bool);

    impl CompileBackend for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn probe(&self) -> bool {
            self.1
        }

        fn compile(
            &self,
            _unit: &SourceUnit,
            _modules: &[CapabilityModule],
        ) -> std::result::Result<Box<dyn LoadedUnit>, Vec<Diagnostic>> {
            Err(vec![Diagnostic::new(None, "unsupported")])
        }
    }

    #[test]
    fn test_first_working_backend_wins() {
        let chosen = select_backend(vec![
            Box::new(Fixed("missing", false)),
            Box::new(Fixed("first", true)),
            Box::new(Fixed("second", true)),
        ])
        .unwrap();
        assert_eq!(chosen.name(), "first");
    }

    #[test]
    fn test_no_backend_is_an_error() {
        let result = select_backend(vec![Box::new(Fixed("missing", false))]);
        assert!(matches!(result, Err(BridgeError::Internal(_))));
    }

    #[test]
    fn test_diagnostic_display() {
        assert_eq!(Diagnostic::new(Some(4), "bad").to_string(), "Line 4: bad");
        assert_eq!(Diagnostic::new(None, "bad").to_string(), "bad");
    }
}
