//! Static checks applied before a custom tool is persisted

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{BridgeError, Result};
use crate::template::placeholders;

static TOOL_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_]*$").expect("tool name pattern is valid"));

/// Capability surfaces a tool template may not reference.
///
/// This is a substring screen, not a sandbox: `execute_query` still has full
/// access to every loaded module.
pub const DENYLIST: &[&str] = &[
    "import \"fs\"",
    "import \"process\"",
    "import \"net\"",
    "fs::",
    "process::",
    "net::",
];

/// Validate a tool name against `^[a-z_][a-z0-9_]*$`
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BridgeError::Validation("Tool name is required".into()));
    }
    if !TOOL_NAME.is_match(name) {
        return Err(BridgeError::Validation(
            "Tool name must be lowercase with underscores only".into(),
        ));
    }
    Ok(())
}

/// Validate a full definition: name, generic template, schema coverage, denylist
pub fn validate_tool(name: &str, template: &str, input_schema: &Value) -> Result<()> {
    validate_name(name)?;

    if template.trim().is_empty() {
        return Err(BridgeError::Validation("Template is required".into()));
    }

    let params = placeholders(template);
    if params.is_empty() {
        return Err(BridgeError::Validation(
            "Tool must be generic with at least one parameter. Use {{paramName}} placeholders"
                .into(),
        ));
    }

    let Some(schema) = input_schema.as_object() else {
        return Err(BridgeError::Validation(
            "Input schema must be a valid object".into(),
        ));
    };
    let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) else {
        return Err(BridgeError::Validation(
            "Input schema must have 'properties' object".into(),
        ));
    };

    if let Some(missing) = params.iter().find(|p| !properties.contains_key(**p)) {
        return Err(BridgeError::Validation(format!(
            "Parameter '{{{{{}}}}}' used in template but not defined in schema",
            missing
        )));
    }

    if let Some(token) = DENYLIST.iter().find(|t| template.contains(**t)) {
        return Err(BridgeError::Validation(format!(
            "Tool contains potentially unsafe operations ({})",
            token
        )));
    }

    Ok(())
}
