//! Builtin tools seeded into the builtin directory on first start

use serde_json::Value;

use crate::error::Result;
use crate::types::{ToolDefinition, ToolOrigin};

/// (name, description, template, input schema)
pub const BUILTIN_TOOLS: &[(&str, &str, &str, &str)] = &[
    (
        "get_logs",
        "Get recent console log entries",
        r#"let count = {{count}};
return console::tail(count);"#,
        r#"{
            "type": "object",
            "properties": {
                "count": {"type": "number", "description": "Number of log entries to retrieve", "default": 10}
            }
        }"#,
    ),
    (
        "list_scenes",
        "List all scenes in the project",
        r#"return editor::scenes();"#,
        r#"{
            "type": "object",
            "properties": {}
        }"#,
    ),
    (
        "list_scene_objects",
        "List all objects in the active scene",
        r#"let objects = scene::objects();
let name = scene::name();
if name == "" { name = "Untitled"; }
let out = `Scene: ${name}`;
out += "\n";
out += `Total GameObjects: ${objects.len()}`;
out += "\n";

if {{includeDetails}} {
    out += "\nDetailed GameObject List:\n";
    for obj in objects {
        let state = if obj.active { "(Active)" } else { "(Inactive)" };
        out += `• ${obj.name} ${state}`;
        out += "\n";
        out += `  Position: (${obj.x}, ${obj.y}, ${obj.z})`;
        out += "\n";
        out += `  Kind: ${obj.kind}`;
        out += "\n";
    }
} else {
    out += "\nGameObjects:\n";
    for obj in objects {
        out += `• ${obj.name}`;
        out += "\n";
    }
}

return out;"#,
        r#"{
            "type": "object",
            "properties": {
                "includeDetails": {"type": "boolean", "description": "Include position and kind details", "default": false}
            }
        }"#,
    ),
    (
        "create_gameobject",
        "Create a GameObject with specified properties",
        r#"let go_name = "{{name}}";
let kind = "{{primitiveType}}";
scene::create(go_name, kind, {{x}}, {{y}}, {{z}});
let label = if kind == "" || kind == "None" { "GameObject" } else { kind };
return `Created ${label} '${go_name}' at position ({{x}}, {{y}}, {{z}})`;"#,
        r#"{
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Name of the GameObject", "default": "GameObject"},
                "x": {"type": "number", "description": "X position", "default": 0},
                "y": {"type": "number", "description": "Y position", "default": 0},
                "z": {"type": "number", "description": "Z position", "default": 0},
                "primitiveType": {"type": "string", "description": "Primitive type (Cube, Sphere, Cylinder, Capsule, Plane, Quad)", "default": "None"}
            },
            "required": ["name"]
        }"#,
    ),
];

/// Materialize the builtin definitions
pub fn builtin_tools() -> Result<Vec<ToolDefinition>> {
    BUILTIN_TOOLS
        .iter()
        .map(|(name, description, template, schema)| {
            let input_schema: Value = serde_json::from_str(schema)?;
            let mut tool = ToolDefinition::new(*name, *description, *template, input_schema);
            tool.origin = ToolOrigin::Builtin;
            Ok(tool)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::placeholders;

    #[test]
    fn test_builtin_schemas_parse() {
        let tools = builtin_tools().unwrap();
        assert_eq!(tools.len(), BUILTIN_TOOLS.len());
        assert!(tools.iter().all(|t| t.is_builtin()));
    }

    #[test]
    fn test_builtin_placeholders_are_declared() {
        for tool in builtin_tools().unwrap() {
            for param in placeholders(&tool.template) {
                assert!(
                    tool.properties().is_some_and(|p| p.contains_key(param)),
                    "{} uses undeclared {{{{{}}}}}",
                    tool.name,
                    param
                );
            }
        }
    }
}
