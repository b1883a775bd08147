//! Hostbridge - JSON-RPC tool server for single-threaded hosts
//!
//! Loopback HTTP requests are queued by a listener thread and executed on the
//! host's designated thread, where hot-reloadable script tools run against
//! the host's capability modules.

pub mod config;
pub mod error;
pub mod execution;
pub mod host;
pub mod mcp;
pub mod registry;
pub mod server;
pub mod template;
pub mod types;

pub use config::ServerConfig;
pub use error::{BridgeError, Result};
pub use server::Server;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
