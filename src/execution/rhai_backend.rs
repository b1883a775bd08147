//! Rhai implementation of [`CompileBackend`]

use std::rc::Rc;

use rhai::module_resolvers::StaticModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST, INT};
use serde_json::{Map, Value};

use crate::host::CapabilityModule;

use super::backend::{CompileBackend, Diagnostic, LoadedUnit};
use super::synth::SourceUnit;

/// Receives script `print` output
pub type PrintSink = Rc<dyn Fn(&str)>;

/// Builds a fresh engine per unit, resolving imports against the modules
/// the host reports at compile time
#[derive(Default)]
pub struct RhaiBackend {
    print_sink: Option<PrintSink>,
}

impl RhaiBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_print_sink(mut self, sink: impl Fn(&str) + 'static) -> Self {
        self.print_sink = Some(Rc::new(sink));
        self
    }

    fn engine(&self, modules: &[CapabilityModule]) -> Engine {
        let mut engine = Engine::new();

        let mut resolver = StaticModuleResolver::new();
        for capability in modules {
            resolver.insert(capability.name.as_str(), capability.module.clone());
        }
        engine.set_module_resolver(resolver);

        if let Some(sink) = &self.print_sink {
            let sink = Rc::clone(sink);
            engine.on_print(move |text| sink(text));
        }
        engine.on_debug(|text, _source, pos| {
            tracing::debug!(line = ?pos.line(), "script debug: {}", text);
        });

        engine
    }
}

impl CompileBackend for RhaiBackend {
    fn name(&self) -> &'static str {
        "rhai"
    }

    fn probe(&self) -> bool {
        matches!(Engine::new().eval::<INT>("40 + 2"), Ok(42))
    }

    fn compile(
        &self,
        unit: &SourceUnit,
        modules: &[CapabilityModule],
    ) -> Result<Box<dyn LoadedUnit>, Vec<Diagnostic>> {
        // imports resolve lazily at run time, so unknown modules are caught here
        let mut diagnostics: Vec<Diagnostic> = unit
            .imports
            .iter()
            .enumerate()
            .filter(|(_, import)| !modules.iter().any(|m| m.name == import.module))
            .map(|(index, import)| {
                Diagnostic::new(
                    Some(unit.import_line(index)),
                    format!("Unknown capability module '{}'", import.module),
                )
            })
            .collect();

        let engine = self.engine(modules);
        match engine.compile(&unit.source) {
            Ok(ast) if diagnostics.is_empty() => Ok(Box::new(RhaiUnit { engine, ast })),
            Ok(_) => Err(diagnostics),
            Err(err) => {
                diagnostics.push(Diagnostic::new(err.1.line(), err.0.to_string()));
                diagnostics.sort_by_key(|d| d.line);
                Err(diagnostics)
            }
        }
    }
}

struct RhaiUnit {
    engine: Engine,
    ast: AST,
}

impl LoadedUnit for RhaiUnit {
    fn invoke(&self, entry_point: &str, context: &Map<String, Value>) -> Result<Value, String> {
        let context = rhai::serde::to_dynamic(context).map_err(|e| e.to_string())?;
        let result = self
            .engine
            .call_fn::<Dynamic>(&mut Scope::new(), &self.ast, entry_point, (context,))
            .map_err(|e| scrub(*e, entry_point))?;
        rhai::serde::from_dynamic::<Value>(&result)
            .map_err(|e| format!("Result is not representable as JSON: {}", e))
    }
}

/// Error text with the synthesized entry point removed
fn scrub(err: EvalAltResult, entry_point: &str) -> String {
    let message = match err {
        EvalAltResult::ErrorInFunctionCall(name, _, inner, _) if name == entry_point => {
            inner.to_string()
        }
        other => other.to_string(),
    };
    message.replace(entry_point, "snippet")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::synth::synthesize;
    use rhai::Module;
    use serde_json::json;
    use std::cell::RefCell;

    fn modules() -> Vec<CapabilityModule> {
        let mut math = Module::new();
        math.set_native_fn("double", |x: INT| -> Result<INT, Box<EvalAltResult>> { Ok(x * 2) });
        vec![CapabilityModule::new("math", math)]
    }

    fn run(snippet: &str, context: Value) -> Result<Value, String> {
        let backend = RhaiBackend::new();
        let unit = synthesize(snippet, &[]);
        let loaded = backend
            .compile(&unit, &modules())
            .map_err(|d| format!("{:?}", d))?;
        loaded.invoke(&unit.entry_point, context.as_object().unwrap())
    }

    #[test]
    fn test_probe() {
        assert!(RhaiBackend::new().probe());
    }

    #[test]
    fn test_imports_and_context() {
        let out = run(
            "import \"math\" as math;\nreturn math::double(parameters.n);",
            json!({"n": 21}),
        )
        .unwrap();
        assert_eq!(out, json!(42));
    }

    #[test]
    fn test_structured_results_convert() {
        assert_eq!(run("return #{a: [1, true, \"x\"]};", json!({})).unwrap(), json!({"a": [1, true, "x"]}));
        assert_eq!(run("return ();", json!({})).unwrap(), Value::Null);
    }

    #[test]
    fn test_unknown_import_is_a_diagnostic() {
        let unit = synthesize("import \"gfx\" as gfx;\n1", &[]);
        let diagnostics = match RhaiBackend::new().compile(&unit, &modules()) {
            Err(d) => d,
            Ok(_) => panic!("expected diagnostics"),
        };
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].line, Some(2));
        assert!(diagnostics[0].message.contains("'gfx'"));
    }

    #[test]
    fn test_syntax_error_has_line() {
        let unit = synthesize("let x = ;", &[]);
        let diagnostics = match RhaiBackend::new().compile(&unit, &modules()) {
            Err(d) => d,
            Ok(_) => panic!("expected diagnostics"),
        };
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].line.is_some());
    }

    #[test]
    fn test_runtime_error_hides_entry_point() {
        let unit = synthesize("throw \"boom\";", &[]);
        let loaded = RhaiBackend::new().compile(&unit, &modules()).ok().unwrap();
        let err = loaded.invoke(&unit.entry_point, &Map::new()).unwrap_err();
        assert!(err.contains("boom"), "{err}");
        assert!(!err.contains(&unit.entry_point));
    }

    #[test]
    fn test_print_goes_to_sink() {
        let captured = Rc::new(RefCell::new(Vec::<String>::new()));
        let sink = Rc::clone(&captured);
        let backend = RhaiBackend::new().with_print_sink(move |s| sink.borrow_mut().push(s.to_string()));

        let unit = synthesize("print(\"hello\");", &[]);
        let loaded = backend.compile(&unit, &[]).ok().unwrap();
        loaded.invoke(&unit.entry_point, &Map::new()).unwrap();
        assert_eq!(*captured.borrow(), vec!["hello".to_string()]);
    }
}
