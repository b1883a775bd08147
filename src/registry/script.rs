//! `tools` capability module: registry authoring from scripts

use std::sync::Arc;

use rhai::{Dynamic, EvalAltResult, ImmutableString, Module};
use serde_json::Value;

use crate::host::CapabilityModule;
use crate::types::ToolPatch;

use super::ToolRegistry;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// Schema given either as an object map or as JSON text
fn schema_value(schema: &Dynamic) -> RhaiResult<Value> {
    if schema.is_string() {
        let text = schema.clone().into_string().unwrap_or_default();
        return serde_json::from_str(&text).map_err(|e| format!("Invalid schema JSON: {}", e).into());
    }
    rhai::serde::from_dynamic(schema)
}

pub fn tools_module(registry: Arc<ToolRegistry>) -> CapabilityModule {
    let mut module = Module::new();

    let r = Arc::clone(&registry);
    module.set_native_fn(
        "create",
        move |name: ImmutableString,
              description: ImmutableString,
              template: ImmutableString,
              schema: Dynamic|
              -> RhaiResult<String> {
            r.create(&name, &description, &template, schema_value(&schema)?)
                .map_err(|e| e.to_string().into())
        },
    );

    let r = Arc::clone(&registry);
    module.set_native_fn(
        "modify",
        move |name: ImmutableString, changes: Dynamic| -> RhaiResult<String> {
            let patch: ToolPatch = rhai::serde::from_dynamic(&changes)?;
            r.modify(&name, patch).map_err(|e| e.to_string().into())
        },
    );

    let r = Arc::clone(&registry);
    module.set_native_fn("remove", move |name: ImmutableString| -> RhaiResult<String> {
        r.remove(&name).map_err(|e| e.to_string().into())
    });

    let r = registry;
    module.set_native_fn("list_custom", move || -> RhaiResult<String> {
        Ok(r.list_custom())
    });

    CapabilityModule::new("tools", module)
}
