//! In-process reference host: a small scene editor

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use super::{modules, CapabilityModule, Host, HostStatus};

/// Console entries kept before the oldest are dropped
pub const CONSOLE_CAPACITY: usize = 1000;

/// Shape of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Primitive {
    Empty,
    Cube,
    Sphere,
    Cylinder,
    Capsule,
    Plane,
    Quad,
}

impl Primitive {
    pub fn as_str(&self) -> &'static str {
        match self {
            Primitive::Empty => "Empty",
            Primitive::Cube => "Cube",
            Primitive::Sphere => "Sphere",
            Primitive::Cylinder => "Cylinder",
            Primitive::Capsule => "Capsule",
            Primitive::Plane => "Plane",
            Primitive::Quad => "Quad",
        }
    }
}

impl FromStr for Primitive {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" | "empty" => Ok(Primitive::Empty),
            "cube" => Ok(Primitive::Cube),
            "sphere" => Ok(Primitive::Sphere),
            "cylinder" => Ok(Primitive::Cylinder),
            "capsule" => Ok(Primitive::Capsule),
            "plane" => Ok(Primitive::Plane),
            "quad" => Ok(Primitive::Quad),
            _ => Err(format!("Unknown primitive type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    pub id: u64,
    pub name: String,
    pub kind: Primitive,
    pub position: [f64; 3],
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] [{:?}] {}",
            self.timestamp.format("%H:%M:%S"),
            self.level,
            self.message
        )
    }
}

/// Static project description
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub project_name: String,
    pub engine_version: String,
    pub platform: String,
    pub scenes: Vec<String>,
}

impl ProjectInfo {
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            scenes: vec!["Assets/Scenes/Main.scene".to_string()],
            project_name: name,
            engine_version: crate::VERSION.to_string(),
            platform: std::env::consts::OS.to_string(),
        }
    }
}

#[derive(Debug)]
struct EditorState {
    project: ProjectInfo,
    scene_name: String,
    objects: Vec<SceneObject>,
    next_id: u64,
    console: VecDeque<LogEntry>,
    status: HostStatus,
}

/// Cheaply clonable handle to the editor state
#[derive(Debug, Clone)]
pub struct Editor {
    state: Rc<RefCell<EditorState>>,
}

impl Editor {
    pub fn new(project: ProjectInfo) -> Self {
        let scene_name = project
            .scenes
            .first()
            .and_then(|p| p.rsplit('/').next())
            .and_then(|f| f.split('.').next())
            .unwrap_or_default()
            .to_string();
        Self {
            state: Rc::new(RefCell::new(EditorState {
                project,
                scene_name,
                objects: Vec::new(),
                next_id: 1,
                console: VecDeque::new(),
                status: HostStatus::default(),
            })),
        }
    }

    pub fn project(&self) -> ProjectInfo {
        self.state.borrow().project.clone()
    }

    pub fn scene_name(&self) -> String {
        self.state.borrow().scene_name.clone()
    }

    // Scene

    pub fn create_object(&self, name: &str, kind: Primitive, position: [f64; 3]) -> SceneObject {
        let mut state = self.state.borrow_mut();
        let object = SceneObject {
            id: state.next_id,
            name: name.to_string(),
            kind,
            position,
            active: true,
        };
        state.next_id += 1;
        state.objects.push(object.clone());
        object
    }

    pub fn objects(&self) -> Vec<SceneObject> {
        self.state.borrow().objects.clone()
    }

    /// First object with the given name
    pub fn find(&self, name: &str) -> Option<SceneObject> {
        self.state
            .borrow()
            .objects
            .iter()
            .find(|o| o.name == name)
            .cloned()
    }

    /// Remove the first object with the given name
    pub fn destroy(&self, name: &str) -> bool {
        let mut state = self.state.borrow_mut();
        match state.objects.iter().position(|o| o.name == name) {
            Some(index) => {
                state.objects.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn set_position(&self, name: &str, position: [f64; 3]) -> bool {
        self.update_object(name, |o| o.position = position)
    }

    pub fn set_active(&self, name: &str, active: bool) -> bool {
        self.update_object(name, |o| o.active = active)
    }

    fn update_object(&self, name: &str, f: impl FnOnce(&mut SceneObject)) -> bool {
        let mut state = self.state.borrow_mut();
        match state.objects.iter_mut().find(|o| o.name == name) {
            Some(object) => {
                f(object);
                true
            }
            None => false,
        }
    }

    // Console

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let mut state = self.state.borrow_mut();
        if state.console.len() == CONSOLE_CAPACITY {
            state.console.pop_front();
        }
        state.console.push_back(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        });
    }

    /// Last `count` console entries, oldest first
    pub fn tail(&self, count: usize) -> Vec<LogEntry> {
        let state = self.state.borrow();
        let skip = state.console.len().saturating_sub(count);
        state.console.iter().skip(skip).cloned().collect()
    }

    pub fn clear_console(&self) {
        self.state.borrow_mut().console.clear();
    }

    // Play mode and busy flags

    pub fn set_playing(&self, playing: bool) {
        let mut state = self.state.borrow_mut();
        state.status.playing = playing;
        if !playing {
            state.status.paused = false;
        }
    }

    pub fn set_paused(&self, paused: bool) {
        self.state.borrow_mut().status.paused = paused;
    }

    pub fn set_compiling(&self, compiling: bool) {
        self.state.borrow_mut().status.compiling = compiling;
    }

    pub fn set_updating(&self, updating: bool) {
        self.state.borrow_mut().status.updating = updating;
    }
}

impl Host for Editor {
    fn status(&self) -> HostStatus {
        self.state.borrow().status
    }

    fn project_info(&self) -> Value {
        let state = self.state.borrow();
        json!({
            "projectName": state.project.project_name,
            "engineVersion": state.project.engine_version,
            "platform": state.project.platform,
            "scenes": state.project.scenes,
            "activeScene": state.scene_name,
            "objectCount": state.objects.len(),
            "isPlaying": state.status.playing,
            "isPaused": state.status.paused,
        })
    }

    fn console_text(&self) -> String {
        let entries = self.tail(CONSOLE_CAPACITY);
        if entries.is_empty() {
            return "Console is empty".to_string();
        }
        entries
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn capability_modules(&self) -> Vec<CapabilityModule> {
        vec![
            CapabilityModule::new("scene", modules::scene(self)),
            CapabilityModule::new("editor", modules::editor(self)),
            CapabilityModule::new("console", modules::console(self)),
            CapabilityModule::new("fs", modules::fs()),
            CapabilityModule::new("process", modules::process()),
        ]
    }

    fn print(&self, text: &str) {
        self.log(LogLevel::Info, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::new(ProjectInfo::named("Demo"))
    }

    #[test]
    fn test_primitive_parsing() {
        assert_eq!("Cube".parse::<Primitive>(), Ok(Primitive::Cube));
        assert_eq!("sphere".parse::<Primitive>(), Ok(Primitive::Sphere));
        assert_eq!("None".parse::<Primitive>(), Ok(Primitive::Empty));
        assert!("Teapot".parse::<Primitive>().is_err());
    }

    #[test]
    fn test_scene_objects() {
        let editor = editor();
        assert_eq!(editor.scene_name(), "Main");

        let created = editor.create_object("Box", Primitive::Cube, [1.0, 2.0, 3.0]);
        editor.create_object("Ball", Primitive::Sphere, [0.0, 0.0, 0.0]);
        assert_eq!(editor.objects().len(), 2);
        assert_eq!(editor.find("Box"), Some(created));

        assert!(editor.set_position("Ball", [5.0, 5.0, 5.0]));
        assert!(editor.set_active("Ball", false));
        let ball = editor.find("Ball").unwrap();
        assert_eq!(ball.position, [5.0, 5.0, 5.0]);
        assert!(!ball.active);

        assert!(editor.destroy("Box"));
        assert!(!editor.destroy("Box"));
        assert_eq!(editor.objects().len(), 1);
    }

    #[test]
    fn test_console_is_bounded() {
        let editor = editor();
        for i in 0..CONSOLE_CAPACITY + 5 {
            editor.log(LogLevel::Info, format!("line {}", i));
        }
        let all = editor.tail(usize::MAX);
        assert_eq!(all.len(), CONSOLE_CAPACITY);
        assert_eq!(all[0].message, "line 5");

        let last = editor.tail(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[1].message, format!("line {}", CONSOLE_CAPACITY + 4));
    }

    #[test]
    fn test_status_flags() {
        let editor = editor();
        assert!(!editor.is_busy());
        editor.set_compiling(true);
        assert!(editor.is_busy());
        editor.set_compiling(false);
        editor.set_updating(true);
        assert!(editor.is_busy());

        editor.set_playing(true);
        editor.set_paused(true);
        editor.set_playing(false);
        assert!(!editor.status().paused);
    }

    #[test]
    fn test_project_info() {
        let editor = editor();
        editor.create_object("Box", Primitive::Cube, [0.0; 3]);
        let info = editor.project_info();
        assert_eq!(info["projectName"], "Demo");
        assert_eq!(info["objectCount"], 1);
        assert_eq!(info["activeScene"], "Main");
    }
}
