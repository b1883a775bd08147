//! Routes decoded requests to handlers on the designated thread

use std::rc::Rc;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::error::{BridgeError, Result};
use crate::execution::{render_result, ExecutionEngine};
use crate::host::{CapabilityModule, Host};
use crate::registry::{tools_module, ToolRegistry};
use crate::server::{ClientActivity, RequestQueue, ServerStats};
use crate::template;

use super::protocol::{
    methods, InitializeResult, McpHandler, McpRequest, McpResponse, ResourceContent,
    ResourceDescriptor, ToolCallResult, ToolDescriptor,
};
use super::tools::{meta_tool_descriptors, EXECUTE_QUERY, REMOVE_TOOL};

/// Plain-text console resource
pub const CONSOLE_URI: &str = "host://console";
/// JSON project descriptor resource
pub const PROJECT_URI: &str = "host://project";

/// Appended to tool failures that look like compile errors
pub const COMPILE_HINT: &str = "\n\nHINT: The code has compilation errors. Check:\n\
1. Syntax errors and missing semicolons\n\
2. Module import directives (import \"...\" as ...;)\n\
3. Correct host API names and argument types";

const COMPILE_PATTERNS: &[&str] = &["Compilation errors", "Unknown capability module"];

/// Request router
pub struct Dispatcher {
    host: Rc<dyn Host>,
    registry: Arc<ToolRegistry>,
    engine: ExecutionEngine,
    stats: Arc<ServerStats>,
    queue: RequestQueue,
}

impl Dispatcher {
    pub fn new(
        host: Rc<dyn Host>,
        registry: Arc<ToolRegistry>,
        engine: ExecutionEngine,
        stats: Arc<ServerStats>,
        queue: RequestQueue,
    ) -> Self {
        Self {
            host,
            registry,
            engine,
            stats,
            queue,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    fn route(&self, request: &McpRequest) -> Result<Value> {
        match request.method.as_str() {
            methods::INITIALIZE => Ok(json!(InitializeResult::default())),
            methods::INITIALIZED => Ok(json!({})),
            methods::LIST_TOOLS => Ok(self.list_tools()),
            methods::CALL_TOOL => self.call_tool(request),
            methods::LIST_RESOURCES => Ok(list_resources()),
            methods::READ_RESOURCE => self.read_resource(request),
            methods::SERVER_STATUS => Ok(self.status()),
            other => Err(BridgeError::MethodNotFound(other.to_string())),
        }
    }

    fn list_tools(&self) -> Value {
        let mut tools = meta_tool_descriptors();
        tools.extend(self.registry.list().iter().map(ToolDescriptor::from));
        json!({ "tools": tools })
    }

    /// Host modules plus the registry's `tools` module
    fn modules(&self) -> Vec<CapabilityModule> {
        let mut modules = self.host.capability_modules();
        modules.push(tools_module(Arc::clone(&self.registry)));
        modules
    }

    fn call_tool(&self, request: &McpRequest) -> Result<Value> {
        let name = request.param("name").as_str().unwrap_or_default();
        let arguments: Map<String, Value> = request
            .param("arguments")
            .as_object()
            .cloned()
            .unwrap_or_default();

        let text = match name {
            EXECUTE_QUERY => {
                let code = arguments
                    .get("queryCode")
                    .and_then(Value::as_str)
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| BridgeError::Execution("queryCode parameter is required".into()))?;
                let context = arguments
                    .get("parameters")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();

                let value = self
                    .registry
                    .locked(|| self.engine.execute(code, &context, &self.modules()))?;
                render_result(&value)
            }
            REMOVE_TOOL => {
                let target = arguments
                    .get("name")
                    .and_then(Value::as_str)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| BridgeError::Execution("Tool name is required".into()))?;
                self.registry.remove(target)?
            }
            _ => {
                let outcome = self.registry.with_tool(name, |tool| {
                    let snippet = template::render(tool, &arguments);
                    tracing::debug!(tool = %tool.name, "Rendered snippet:\n{}", snippet);
                    self.engine.execute(&snippet, &arguments, &self.modules())
                });
                match outcome {
                    Some(result) => render_result(&result?),
                    None => return Err(BridgeError::Execution(format!("Unknown tool: {}", name))),
                }
            }
        };

        Ok(json!(ToolCallResult::text(text)))
    }

    fn read_resource(&self, request: &McpRequest) -> Result<Value> {
        let uri = request.param("uri").as_str().unwrap_or_default();
        let content = match uri {
            CONSOLE_URI => ResourceContent {
                uri: uri.to_string(),
                mime_type: "text/plain".to_string(),
                text: self.host.console_text(),
            },
            PROJECT_URI => ResourceContent {
                uri: uri.to_string(),
                mime_type: "application/json".to_string(),
                text: serde_json::to_string_pretty(&self.host.project_info())?,
            },
            other => return Err(BridgeError::UnknownResource(other.to_string())),
        };
        Ok(json!({ "contents": [content] }))
    }

    fn status(&self) -> Value {
        let stats = self.stats.snapshot();
        let host = self.host.status();
        json!({
            "running": stats.running,
            "compiling": host.compiling,
            "updating": host.updating,
            "playing": host.playing,
            "paused": host.paused,
            "requestCount": stats.request_count,
            "lastRequestTime": stats.last_request_time,
            "lastMethod": stats.last_method,
            "client": ClientActivity::classify(stats.last_request, Utc::now()).as_str(),
            "queued": self.queue.len(),
            "toolCount": self.registry.len(),
            "backend": self.engine.backend_name(),
        })
    }

    fn error_response(&self, id: Value, method: &str, err: &BridgeError) -> McpResponse {
        let mut response = McpResponse::from_error(id, err);
        if let Some(error) = response.error.as_mut() {
            match method {
                methods::CALL_TOOL => error.message = with_hint(format!("Tool execution failed: {}", err)),
                methods::READ_RESOURCE => error.message = format!("Resource read failed: {}", err),
                _ => {}
            }
        }
        response
    }
}

/// Append [`COMPILE_HINT`] when the message looks like a compile failure
pub fn with_hint(message: String) -> String {
    if COMPILE_PATTERNS.iter().any(|p| message.contains(p)) {
        message + COMPILE_HINT
    } else {
        message
    }
}

fn list_resources() -> Value {
    let resources = [
        ResourceDescriptor {
            uri: CONSOLE_URI.to_string(),
            name: "Host Console Logs".to_string(),
            mime_type: "text/plain".to_string(),
            description: "Console output of the host application".to_string(),
        },
        ResourceDescriptor {
            uri: PROJECT_URI.to_string(),
            name: "Host Project Info".to_string(),
            mime_type: "application/json".to_string(),
            description: "Current project information".to_string(),
        },
    ];
    json!({ "resources": resources })
}

impl McpHandler for Dispatcher {
    fn handle_request(&self, request: McpRequest) -> McpResponse {
        if self.host.is_busy() {
            tracing::debug!("Host busy, rejecting {}", request.method);
            return McpResponse::from_error(request.id, &BridgeError::Busy);
        }

        match self.route(&request) {
            Ok(result) => McpResponse::success(request.id, result),
            Err(err) => {
                match &err {
                    BridgeError::MethodNotFound(_) => tracing::debug!("{}", err),
                    _ => tracing::error!(method = %request.method, kind = err.kind(), "{}", err),
                }
                self.error_response(request.id, &request.method, &err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_only_for_compile_failures() {
        let hinted = with_hint("Tool execution failed: Compilation errors:\nLine 2: x".into());
        assert!(hinted.ends_with("argument types"));
        assert!(hinted.contains("HINT"));

        let plain = with_hint("Tool execution failed: Runtime error: boom".into());
        assert!(!plain.contains("HINT"));
    }

    #[test]
    fn test_resource_list_is_static() {
        let list = list_resources();
        let uris: Vec<&str> = list["resources"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["uri"].as_str().unwrap())
            .collect();
        assert_eq!(uris, vec![CONSOLE_URI, PROJECT_URI]);
    }
}
