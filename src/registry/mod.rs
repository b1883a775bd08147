//! File-backed tool registry with hot-reload
//!
//! Tool definitions live one-per-file under a `builtin` and a `custom`
//! directory. The in-memory map is only ever rebuilt wholesale by
//! [`ToolRegistry::load_all`]; create/modify/remove write or delete files and
//! leave the refresh to the watcher-driven reload on the designated thread.

mod builtin;
mod script;
mod validation;
mod watcher;

pub use builtin::{builtin_tools, BUILTIN_TOOLS};
pub use script::tools_module;
pub use validation::{validate_name, validate_tool, DENYLIST};
pub use watcher::{RegistryEvent, RegistryWatcher};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::ReentrantMutex;
use serde_json::Value;

use crate::error::{BridgeError, Result};
use crate::mcp::is_meta_tool;
use crate::types::{ToolDefinition, ToolOrigin, ToolPatch};

/// Extension of tool definition files
pub const TOOL_FILE_EXTENSION: &str = "json";

/// Registry of builtin and custom tools
pub struct ToolRegistry {
    builtin_dir: PathBuf,
    custom_dir: PathBuf,
    /// Re-entrant so a tool executing under the lock may call back into the registry
    tools: ReentrantMutex<RefCell<BTreeMap<String, ToolDefinition>>>,
}

impl ToolRegistry {
    /// Registry rooted at `root`, using `root/builtin` and `root/custom`
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::with_dirs(root.join("builtin"), root.join("custom"))
    }

    pub fn with_dirs(builtin_dir: impl Into<PathBuf>, custom_dir: impl Into<PathBuf>) -> Self {
        Self {
            builtin_dir: builtin_dir.into(),
            custom_dir: custom_dir.into(),
            tools: ReentrantMutex::new(RefCell::new(BTreeMap::new())),
        }
    }

    pub fn builtin_dir(&self) -> &Path {
        &self.builtin_dir
    }

    pub fn custom_dir(&self) -> &Path {
        &self.custom_dir
    }

    /// Create directories, seed builtins, and load everything
    pub fn initialize(&self) -> Result<usize> {
        fs::create_dir_all(&self.builtin_dir)?;
        fs::create_dir_all(&self.custom_dir)?;
        let seeded = self.seed_builtins()?;
        if seeded > 0 {
            tracing::info!("Seeded {} builtin tools into {:?}", seeded, self.builtin_dir);
        }
        Ok(self.load_all())
    }

    /// Write builtin files that are absent; existing files are never overwritten
    pub fn seed_builtins(&self) -> Result<usize> {
        let mut written = 0;
        for tool in builtin_tools()? {
            let path = self.builtin_dir.join(file_name(&tool.name));
            // a custom tool may already own this name
            let custom_path = self.custom_dir.join(file_name(&tool.name));
            if path.exists() || custom_path.exists() {
                continue;
            }
            fs::write(&path, tool.to_file_json()?)?;
            written += 1;
        }
        Ok(written)
    }

    /// Clear and rebuild the in-memory map from both directories.
    ///
    /// Unreadable or unparsable files are skipped with a warning. Returns the
    /// number of tools loaded.
    pub fn load_all(&self) -> usize {
        let guard = self.tools.lock();
        let mut tools = guard.borrow_mut();
        tools.clear();

        load_directory(&self.builtin_dir, ToolOrigin::Builtin, &mut tools);
        load_directory(&self.custom_dir, ToolOrigin::Custom, &mut tools);

        tracing::debug!("Registry loaded {} tools", tools.len());
        tools.len()
    }

    /// Validate and persist a new custom tool
    pub fn create(
        &self,
        name: &str,
        description: &str,
        template: &str,
        input_schema: Value,
    ) -> Result<String> {
        validate_tool(name, template, &input_schema)?;

        let _guard = self.tools.lock();
        let path = self.custom_dir.join(file_name(name));
        // meta-tool names are reserved
        if self.contains(name) || path.exists() || is_meta_tool(name) {
            return Err(BridgeError::AlreadyExists(name.to_string()));
        }

        let tool = ToolDefinition::new(name, description, template, input_schema);
        fs::create_dir_all(&self.custom_dir)?;
        fs::write(&path, tool.to_file_json()?)?;

        tracing::info!("Created custom tool '{}' at {:?}", name, path);
        Ok(format!(
            "Tool '{}' created successfully and will be available after reload",
            name
        ))
    }

    /// Merge `patch` over an existing custom tool and persist it
    pub fn modify(&self, name: &str, patch: ToolPatch) -> Result<String> {
        let _guard = self.tools.lock();
        let existing = self
            .get(name)
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))?;
        if existing.is_builtin() {
            return Err(BridgeError::Immutable {
                name: name.to_string(),
                action: "modify",
            });
        }

        let changes_code = patch.changes_code();
        let updated = ToolDefinition {
            description: patch.description.unwrap_or(existing.description),
            template: patch.template.unwrap_or(existing.template),
            input_schema: patch.input_schema.unwrap_or(existing.input_schema),
            ..existing
        };
        if changes_code {
            validate_tool(&updated.name, &updated.template, &updated.input_schema)?;
        }

        fs::write(&updated.storage_path, updated.to_file_json()?)?;
        tracing::info!("Modified custom tool '{}'", name);
        Ok(format!("Tool '{}' modified successfully", name))
    }

    /// Delete the backing file of a custom tool
    pub fn remove(&self, name: &str) -> Result<String> {
        let _guard = self.tools.lock();
        let tool = self
            .get(name)
            .ok_or_else(|| BridgeError::NotFound(name.to_string()))?;
        if tool.is_builtin() {
            return Err(BridgeError::Immutable {
                name: name.to_string(),
                action: "remove",
            });
        }
        if !tool.storage_path.exists() {
            return Err(BridgeError::NotFound(name.to_string()));
        }

        fs::remove_file(&tool.storage_path)?;
        tracing::info!("Removed custom tool '{}'", name);
        Ok(format!("Tool '{}' removed successfully", name))
    }

    /// Run `f` while holding the registry lock
    pub fn locked<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.tools.lock();
        f()
    }

    /// Run `f` against a tool while holding the registry lock
    pub fn with_tool<T>(&self, name: &str, f: impl FnOnce(&ToolDefinition) -> T) -> Option<T> {
        let guard = self.tools.lock();
        let tool = guard.borrow().get(name).cloned()?;
        Some(f(&tool))
    }

    pub fn get(&self, name: &str) -> Option<ToolDefinition> {
        let guard = self.tools.lock();
        let tools = guard.borrow();
        tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let guard = self.tools.lock();
        let tools = guard.borrow();
        tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        let guard = self.tools.lock();
        let tools = guard.borrow();
        tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All tools, sorted by name
    pub fn list(&self) -> Vec<ToolDefinition> {
        let guard = self.tools.lock();
        let tools = guard.borrow();
        tools.values().cloned().collect()
    }

    /// Human-readable summary of custom tools
    pub fn list_custom(&self) -> String {
        let custom: Vec<ToolDefinition> = self
            .list()
            .into_iter()
            .filter(|t| t.origin == ToolOrigin::Custom)
            .collect();
        if custom.is_empty() {
            return format!(
                "No custom tools found. Create one with tools::create or add JSON files to {}",
                self.custom_dir.display()
            );
        }

        let mut out = format!("Custom Tools ({}):\n", custom.len());
        for tool in &custom {
            out.push_str(&format!("\n- {}: {}", tool.name, tool.description));
            let params = tool.parameter_names();
            if !params.is_empty() {
                out.push_str(&format!("\n  Parameters: {}", params.join(", ")));
            }
        }
        out
    }
}

fn file_name(tool_name: &str) -> String {
    format!("{}.{}", tool_name, TOOL_FILE_EXTENSION)
}

fn load_directory(dir: &Path, origin: ToolOrigin, tools: &mut BTreeMap<String, ToolDefinition>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read tool directory {:?}: {}", dir, e);
            return;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == TOOL_FILE_EXTENSION))
        .collect();
    paths.sort();

    for path in paths {
        match load_file(&path) {
            Ok(mut tool) => {
                if tool.name.is_empty() {
                    tracing::warn!("Skipping tool file {:?}: empty name", path);
                    continue;
                }
                if let Some(existing) = tools.get(&tool.name) {
                    tracing::warn!(
                        "Skipping tool file {:?}: name '{}' already defined by {:?}",
                        path,
                        tool.name,
                        existing.storage_path
                    );
                    continue;
                }
                tool.origin = origin;
                tool.storage_path = path;
                tools.insert(tool.name.clone(), tool);
            }
            Err(e) => {
                tracing::warn!("Failed to load tool from {:?}: {}", path, e);
            }
        }
    }
}

fn load_file(path: &Path) -> Result<ToolDefinition> {
    let body = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn schema(param: &str) -> Value {
        json!({"type": "object", "properties": {param: {"type": "string", "description": "p"}}})
    }

    fn registry() -> (tempfile::TempDir, ToolRegistry) {
        let dir = tempdir().unwrap();
        let registry = ToolRegistry::new(dir.path());
        registry.initialize().unwrap();
        (dir, registry)
    }

    #[test]
    fn test_initialize_seeds_and_loads_builtins() {
        let (_dir, registry) = registry();
        assert_eq!(registry.len(), BUILTIN_TOOLS.len());
        let tool = registry.get("create_gameobject").unwrap();
        assert!(tool.is_builtin());
        assert!(tool.storage_path.starts_with(registry.builtin_dir()));
    }

    #[test]
    fn test_seeding_never_overwrites() {
        let (_dir, registry) = registry();
        let path = registry.builtin_dir().join("get_logs.json");
        let edited = ToolDefinition::new("get_logs", "edited", "{{count}}", schema("count"));
        fs::write(&path, edited.to_file_json().unwrap()).unwrap();

        assert_eq!(registry.seed_builtins().unwrap(), 0);
        registry.load_all();
        assert_eq!(registry.get("get_logs").unwrap().description, "edited");
    }

    #[test]
    fn test_create_then_reload_roundtrip() {
        let (_dir, registry) = registry();
        let template = "scene::create({{label}}, \"Cube\", 0, 0, 0)";
        registry
            .create("spawn_cube", "Spawn a cube", template, schema("label"))
            .unwrap();

        // not live until the reload
        assert!(!registry.contains("spawn_cube"));
        registry.load_all();

        let tool = registry.get("spawn_cube").unwrap();
        assert_eq!(tool.description, "Spawn a cube");
        assert_eq!(tool.template, template);
        assert_eq!(tool.input_schema, schema("label"));
        assert_eq!(tool.origin, ToolOrigin::Custom);
    }

    #[test]
    fn test_rejected_create_writes_nothing() {
        let (_dir, registry) = registry();
        let before = registry.len();

        let cases = [
            ("Bad Name", "{{a}}", schema("a")),
            ("no_params", "scene::count()", schema("a")),
            ("missing_schema", "{{b}}", schema("a")),
            ("get_logs", "{{a}}", schema("a")),
        ];
        for (name, template, input_schema) in cases {
            assert!(registry.create(name, "", template, input_schema).is_err());
        }

        assert_eq!(fs::read_dir(registry.custom_dir()).unwrap().count(), 0);
        registry.load_all();
        assert_eq!(registry.len(), before);
    }

    #[test]
    fn test_create_collision_is_already_exists() {
        let (_dir, registry) = registry();
        let err = registry
            .create("create_gameobject", "", "{{a}}", schema("a"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyExists(_)));

        // pending on disk but not yet reloaded
        registry.create("pending", "", "{{a}}", schema("a")).unwrap();
        let err = registry.create("pending", "", "{{a}}", schema("a")).unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyExists(_)));

        let err = registry
            .create("execute_query", "", "{{a}}", schema("a"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::AlreadyExists(_)));
    }

    #[test]
    fn test_remove_rules() {
        let (_dir, registry) = registry();
        assert!(matches!(
            registry.remove("list_scenes"),
            Err(BridgeError::Immutable { action: "remove", .. })
        ));
        assert!(matches!(registry.remove("nope"), Err(BridgeError::NotFound(_))));

        registry.create("temp_tool", "", "{{a}}", schema("a")).unwrap();
        registry.load_all();
        registry.remove("temp_tool").unwrap();
        registry.load_all();
        assert!(!registry.contains("temp_tool"));
    }

    #[test]
    fn test_modify_merges_and_revalidates() {
        let (_dir, registry) = registry();
        registry.create("greet", "old", "console::log({{msg}})", schema("msg")).unwrap();
        registry.load_all();

        let patch = ToolPatch {
            description: Some("new".into()),
            ..ToolPatch::default()
        };
        registry.modify("greet", patch).unwrap();
        registry.load_all();
        let tool = registry.get("greet").unwrap();
        assert_eq!(tool.description, "new");
        assert_eq!(tool.template, "console::log({{msg}})");

        let bad = ToolPatch {
            template: Some("console::log({{other}})".into()),
            ..ToolPatch::default()
        };
        assert!(matches!(registry.modify("greet", bad), Err(BridgeError::Validation(_))));

        assert!(matches!(
            registry.modify("get_logs", ToolPatch::default()),
            Err(BridgeError::Immutable { action: "modify", .. })
        ));
        assert!(matches!(
            registry.modify("absent", ToolPatch::default()),
            Err(BridgeError::NotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_file_does_not_block_others() {
        let (_dir, registry) = registry();
        fs::write(registry.custom_dir().join("broken.json"), "{ not json").unwrap();
        fs::write(registry.custom_dir().join("notes.txt"), "ignored").unwrap();
        registry.create("fine", "", "{{a}}", schema("a")).unwrap();

        registry.load_all();
        assert!(registry.contains("fine"));
        assert_eq!(registry.len(), BUILTIN_TOOLS.len() + 1);
    }

    #[test]
    fn test_custom_file_cannot_shadow_builtin() {
        let (_dir, registry) = registry();
        let shadow = ToolDefinition::new("list_scenes", "shadow", "{{a}}", schema("a"));
        fs::write(
            registry.custom_dir().join("shadow.json"),
            shadow.to_file_json().unwrap(),
        )
        .unwrap();

        registry.load_all();
        let tool = registry.get("list_scenes").unwrap();
        assert!(tool.is_builtin());
        assert_ne!(tool.description, "shadow");
    }

    #[test]
    fn test_list_custom_summary() {
        let (_dir, registry) = registry();
        assert!(registry.list_custom().starts_with("No custom tools found"));

        registry.create("paint", "Paint things", "{{color}}", schema("color")).unwrap();
        registry.load_all();
        let summary = registry.list_custom();
        assert!(summary.contains("Custom Tools (1)"));
        assert!(summary.contains("- paint: Paint things"));
        assert!(summary.contains("Parameters: color"));
    }

    #[test]
    fn test_with_tool_is_reentrant() {
        let (_dir, registry) = registry();
        let nested = registry.with_tool("get_logs", |tool| {
            // a tool body calling back into the registry must not deadlock
            registry.contains(&tool.name) && registry.len() > 0
        });
        assert_eq!(nested, Some(true));
        assert_eq!(registry.with_tool("missing", |_| ()), None);
    }
}
