//! Snippet execution: synthesize, compile, invoke once

mod backend;
mod rhai_backend;
mod synth;

pub use backend::{select_backend, CompileBackend, Diagnostic, LoadedUnit};
pub use rhai_backend::{PrintSink, RhaiBackend};
pub use synth::{
    classify, merge_imports, split_imports, synthesize, BodyKind, Import, SourceUnit,
    BASELINE_IMPORTS, CONTEXT_PARAM, DEFAULT_RESULT,
};

use serde_json::{Map, Value};

use crate::error::{BridgeError, Result};
use crate::host::CapabilityModule;

/// Runs snippets through the selected backend
pub struct ExecutionEngine {
    backend: Box<dyn CompileBackend>,
    baseline: Vec<&'static str>,
}

impl ExecutionEngine {
    pub fn new(backend: Box<dyn CompileBackend>) -> Self {
        Self {
            backend,
            baseline: BASELINE_IMPORTS.to_vec(),
        }
    }

    /// Replace the imports every unit starts with
    pub fn with_baseline(mut self, baseline: Vec<&'static str>) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Compile `snippet` and run it once with `context`.
    ///
    /// Effects on host state made before a runtime failure are not rolled back.
    pub fn execute(
        &self,
        snippet: &str,
        context: &Map<String, Value>,
        modules: &[CapabilityModule],
    ) -> Result<Value> {
        let unit = synthesize(snippet, &self.baseline);
        tracing::debug!(entry = %unit.entry_point, "Compiling snippet:\n{}", unit.source);

        let loaded = self
            .backend
            .compile(&unit, modules)
            .map_err(BridgeError::Compile)?;

        loaded
            .invoke(&unit.entry_point, context)
            .map_err(BridgeError::Runtime)
    }
}

/// Text shown to the caller for a result value
pub fn render_result(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
