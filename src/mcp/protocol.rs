//! MCP JSON-RPC protocol types

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{BridgeError, INTERNAL_ERROR};

/// MCP JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    #[serde(default = "jsonrpc_version")]
    pub jsonrpc: String,
    /// Opaque identifier echoed back; null when absent
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

fn jsonrpc_version() -> String {
    "2.0".to_string()
}

impl McpRequest {
    pub fn new(id: Value, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            method: method.into(),
            params,
        }
    }

    /// `params[key]`, or null
    pub fn param(&self, key: &str) -> &Value {
        self.params.get(key).unwrap_or(&Value::Null)
    }
}

/// MCP JSON-RPC response: `result` XOR `error`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

/// MCP error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpResponse {
    /// Create a success response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i64, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: jsonrpc_version(),
            id,
            result: None,
            error: Some(McpError {
                code,
                message: message.into(),
                data,
            }),
        }
    }

    /// Create error from BridgeError, tagging `data.kind`
    pub fn from_error(id: Value, err: &BridgeError) -> Self {
        let data = match err {
            BridgeError::Busy => json!({"kind": err.kind(), "status": "compiling"}),
            _ => json!({"kind": err.kind()}),
        };
        Self::error(id, err.code(), err.to_string(), Some(data))
    }

    /// Response for a body that could not be decoded
    pub fn decode_failure(message: impl std::fmt::Display) -> Self {
        Self::error(
            Value::Null,
            INTERNAL_ERROR,
            format!("Internal error: {}", message),
            None,
        )
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Trait for handling MCP requests.
///
/// Implementations run on the designated thread and need not be `Send`.
pub trait McpHandler {
    fn handle_request(&self, request: McpRequest) -> McpResponse;
}

/// Standard MCP methods
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const LIST_RESOURCES: &str = "resources/list";
    pub const READ_RESOURCE: &str = "resources/read";
    pub const SERVER_STATUS: &str = "server/status";
}

/// Tool as advertised by `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl From<&crate::types::ToolDefinition> for ToolDescriptor {
    fn from(tool: &crate::types::ToolDefinition) -> Self {
        Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
        }
    }
}

/// MCP initialize result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// Server capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
    pub resources: Option<ResourcesCapability>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsCapability {
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesCapability {
    pub subscribe: bool,
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Server info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: "2024-11-05".to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                resources: Some(ResourcesCapability {
                    subscribe: false,
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: "hostbridge".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                description: "Tool server for scripting a running host application".to_string(),
            },
        }
    }
}

/// Resource as advertised by `resources/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub description: String,
}

/// One entry of a `resources/read` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceContent {
    pub uri: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub text: String,
}

/// Tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    /// Create a text result
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_defaults() {
        let req: McpRequest = serde_json::from_str(r#"{"method": "tools/list"}"#).unwrap();
        assert_eq!(req.id, Value::Null);
        assert_eq!(req.params, Value::Null);
        assert_eq!(req.param("name"), &Value::Null);
    }

    #[test]
    fn test_response_always_has_id_and_one_of_result_or_error() {
        let ok = serde_json::to_value(McpResponse::success(json!(7), json!({"x": 1}))).unwrap();
        assert_eq!(ok, json!({"jsonrpc": "2.0", "id": 7, "result": {"x": 1}}));

        let err = serde_json::to_value(McpResponse::error(Value::Null, -32601, "nope", None)).unwrap();
        assert_eq!(
            err,
            json!({"jsonrpc": "2.0", "id": null, "error": {"code": -32601, "message": "nope"}})
        );
    }

    #[test]
    fn test_busy_error_carries_status() {
        let resp = McpResponse::from_error(json!("a"), &BridgeError::Busy);
        let error = resp.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.data.unwrap()["status"], "compiling");
    }

    #[test]
    fn test_tool_result_shape() {
        let value = serde_json::to_value(ToolCallResult::text("hi")).unwrap();
        assert_eq!(value, json!({"content": [{"type": "text", "text": "hi"}]}));
    }
}
