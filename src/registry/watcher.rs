//! File-store change notifications for the registry directories
//!
//! The watcher callback runs on notify's own thread and never touches the
//! registry. It only posts [`RegistryEvent`]s; the designated thread drains
//! them on its tick and performs one reload for the whole batch.

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

use crate::error::Result;

use super::TOOL_FILE_EXTENSION;

/// Message posted by the watcher thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A tool file was created, modified or removed
    Dirty(PathBuf),
}

/// Watches the builtin and custom directories
pub struct RegistryWatcher {
    rx: UnboundedReceiver<RegistryEvent>,
    /// Kept alive to maintain the OS watch
    _watcher: RecommendedWatcher,
}

impl RegistryWatcher {
    /// Start watching `dirs` (non-recursive)
    pub fn start(dirs: &[&Path]) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                for path in event.paths.into_iter().filter(|p| is_tool_file(p)) {
                    // receiver gone means the server is shutting down
                    let _ = tx.send(RegistryEvent::Dirty(path));
                }
            }
            Err(e) => {
                tracing::error!("Registry watcher error: {}", e);
            }
        })?;

        for dir in dirs {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            tracing::debug!("Watching tool directory {:?}", dir);
        }

        Ok(Self {
            rx,
            _watcher: watcher,
        })
    }

    /// Drain every pending event; true if at least one arrived
    pub fn take_dirty(&mut self) -> bool {
        let mut dirty = false;
        loop {
            match self.rx.try_recv() {
                Ok(RegistryEvent::Dirty(path)) => {
                    tracing::debug!("Tool file changed: {:?}", path);
                    dirty = true;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        dirty
    }
}

fn is_tool_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == TOOL_FILE_EXTENSION)
}
