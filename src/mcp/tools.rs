//! Meta-tools that exist independently of the registry

use serde_json::json;

use super::protocol::ToolDescriptor;

/// Runs arbitrary script code
pub const EXECUTE_QUERY: &str = "execute_query";
/// Deletes a custom tool
pub const REMOVE_TOOL: &str = "remove_tool";

/// (name, description, input schema)
pub const META_TOOLS: &[(&str, &str, &str)] = &[
    (
        EXECUTE_QUERY,
        "Execute script code in the host. Full access to every loaded capability module (scene, editor, console, fs, process, tools). Use tools::create inside the code to save a reusable, parameterized tool.",
        r#"{
            "type": "object",
            "properties": {
                "queryCode": {"type": "string", "description": "Script code to execute. Should return a value or perform host operations. Leading import directives (import \"fs\" as fs;) are honored."},
                "parameters": {"type": "object", "description": "Optional parameters, visible to the code as `parameters`"}
            },
            "required": ["queryCode"]
        }"#,
    ),
    (
        REMOVE_TOOL,
        "Remove a custom tool (builtin tools cannot be removed)",
        r#"{
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Name of the tool to remove"}
            },
            "required": ["name"]
        }"#,
    ),
];

/// Meta-tools as descriptors
pub fn meta_tool_descriptors() -> Vec<ToolDescriptor> {
    META_TOOLS
        .iter()
        .map(|(name, description, schema)| ToolDescriptor {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::from_str(schema).unwrap_or(json!({})),
        })
        .collect()
}

pub fn is_meta_tool(name: &str) -> bool {
    META_TOOLS.iter().any(|(n, _, _)| *n == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_tool_schemas_parse() {
        for (name, _, schema) in META_TOOLS {
            let parsed: serde_json::Value = serde_json::from_str(schema)
                .unwrap_or_else(|e| panic!("schema of {} is invalid: {}", name, e));
            assert!(parsed["properties"].is_object());
        }
        assert_eq!(meta_tool_descriptors().len(), 2);
    }

    #[test]
    fn test_is_meta_tool() {
        assert!(is_meta_tool("execute_query"));
        assert!(is_meta_tool("remove_tool"));
        assert!(!is_meta_tool("get_logs"));
    }
}
