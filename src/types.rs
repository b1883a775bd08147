//! Core types for hostbridge

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Where a tool definition comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolOrigin {
    /// Seeded at startup, immutable through the registry API
    Builtin,
    /// Authored at runtime, may be modified or removed
    #[default]
    Custom,
}

impl ToolOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolOrigin::Builtin => "builtin",
            ToolOrigin::Custom => "custom",
        }
    }
}

/// A parameterized tool backed by a script template.
///
/// Only `name`, `description`, `template` and `inputSchema` are persisted;
/// origin and storage path are derived from the directory the file was
/// loaded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique key (lowercase snake_case)
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Script with `{{paramName}}` placeholders
    #[serde(alias = "queryTemplate")]
    pub template: String,
    /// JSON-Schema-like object with a `properties` mapping
    #[serde(rename = "inputSchema", default = "empty_schema")]
    pub input_schema: Value,
    #[serde(skip)]
    pub origin: ToolOrigin,
    #[serde(skip)]
    pub storage_path: PathBuf,
}

fn empty_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        template: impl Into<String>,
        input_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            template: template.into(),
            input_schema,
            origin: ToolOrigin::Custom,
            storage_path: PathBuf::new(),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.origin == ToolOrigin::Builtin
    }

    /// The schema's `properties` object, if present
    pub fn properties(&self) -> Option<&Map<String, Value>> {
        self.input_schema.get("properties").and_then(|p| p.as_object())
    }

    /// Declared default value of a parameter
    pub fn default_for(&self, param: &str) -> Option<&Value> {
        self.properties()
            .and_then(|props| props.get(param))
            .and_then(|p| p.get("default"))
    }

    /// Parameter names declared in the schema
    pub fn parameter_names(&self) -> Vec<&str> {
        self.properties()
            .map(|props| props.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// Serialized file body
    pub fn to_file_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Field changes applied by `modify`; absent fields keep their value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolPatch {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "queryTemplate")]
    pub template: Option<String>,
    #[serde(default, rename = "inputSchema", alias = "input_schema")]
    pub input_schema: Option<Value>,
}

impl ToolPatch {
    /// Whether the patch touches anything that needs re-validation
    pub fn changes_code(&self) -> bool {
        self.template.is_some() || self.input_schema.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_format_roundtrip_skips_derived_fields() {
        let mut tool = ToolDefinition::new(
            "spin",
            "Spin an object",
            "scene::find({{target}})",
            json!({"type": "object", "properties": {"target": {"type": "string"}}}),
        );
        tool.origin = ToolOrigin::Builtin;
        tool.storage_path = PathBuf::from("/tmp/spin.json");

        let body = tool.to_file_json().unwrap();
        assert!(!body.contains("origin"));
        assert!(!body.contains("storage_path"));
        assert!(body.contains("inputSchema"));

        let back: ToolDefinition = serde_json::from_str(&body).unwrap();
        assert_eq!(back.name, "spin");
        assert_eq!(back.template, tool.template);
        assert_eq!(back.origin, ToolOrigin::Custom);
    }

    #[test]
    fn test_legacy_template_field_is_accepted() {
        let tool: ToolDefinition = serde_json::from_str(
            r#"{"name": "old", "description": "d", "queryTemplate": "{{a}}", "inputSchema": {"properties": {"a": {"type": "number"}}}}"#,
        )
        .unwrap();
        assert_eq!(tool.template, "{{a}}");
        assert_eq!(tool.parameter_names(), vec!["a"]);
    }

    #[test]
    fn test_default_lookup() {
        let tool = ToolDefinition::new(
            "t",
            "",
            "{{count}}",
            json!({"properties": {"count": {"type": "number", "default": 10}}}),
        );
        assert_eq!(tool.default_for("count"), Some(&json!(10)));
        assert_eq!(tool.default_for("missing"), None);
    }
}
