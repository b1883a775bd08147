//! MCP (Model Context Protocol) request handling
//!
//! JSON-RPC envelopes, the two meta-tools, and the dispatcher that runs on
//! the designated thread.

pub mod dispatcher;
pub mod protocol;
pub mod tools;

pub use dispatcher::{with_hint, Dispatcher, COMPILE_HINT, CONSOLE_URI, PROJECT_URI};
pub use protocol::{
    methods, InitializeResult, McpError, McpHandler, McpRequest, McpResponse, ToolCallResult,
    ToolContent, ToolDescriptor,
};
pub use tools::{is_meta_tool, meta_tool_descriptors, EXECUTE_QUERY, META_TOOLS, REMOVE_TOOL};
