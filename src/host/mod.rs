//! Host application seam
//!
//! The host is the process whose API may only be called from one designated
//! thread. Everything behind [`Host`] is `Rc`-based and therefore `!Send`, so
//! the compiler keeps host calls off the listener thread.

mod editor;
mod modules;

pub use editor::{Editor, LogEntry, LogLevel, Primitive, ProjectInfo, SceneObject, CONSOLE_CAPACITY};

use serde::Serialize;
use serde_json::Value;

/// Flags the dispatcher inspects before routing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostStatus {
    /// Host is recompiling its own code
    pub compiling: bool,
    /// Host is refreshing assets or reloading code
    pub updating: bool,
    pub playing: bool,
    pub paused: bool,
}

impl HostStatus {
    /// The host API surface may be inconsistent right now
    pub fn is_busy(&self) -> bool {
        self.compiling || self.updating
    }
}

/// A named module of host functions a snippet can `import`
#[derive(Clone)]
pub struct CapabilityModule {
    pub name: String,
    pub module: rhai::Module,
}

impl CapabilityModule {
    pub fn new(name: impl Into<String>, module: rhai::Module) -> Self {
        Self {
            name: name.into(),
            module,
        }
    }
}

impl std::fmt::Debug for CapabilityModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Interface the server needs from the embedding application
pub trait Host {
    fn status(&self) -> HostStatus;

    fn is_busy(&self) -> bool {
        self.status().is_busy()
    }

    /// JSON descriptor served as the project resource
    fn project_info(&self) -> Value;

    /// Text served as the console resource
    fn console_text(&self) -> String;

    /// Modules currently loaded by the host
    fn capability_modules(&self) -> Vec<CapabilityModule>;

    /// Receives `print` output of executed snippets
    fn print(&self, text: &str);
}
