//! Server lifecycle: listener thread plus the designated-thread tick
//!
//! [`Server`] owns every piece that must stay on the designated thread (host
//! handle, dispatcher, execution engine). Only the queue and the stats cross
//! to the listener thread.

mod listener;
mod queue;
mod stats;

pub use listener::{router, Listener};
pub use queue::{QueuedRequest, RequestQueue};
pub use stats::{ClientActivity, ServerStats, StatsSnapshot, TIME_FORMAT};

use std::net::SocketAddr;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::execution::{select_backend, CompileBackend, ExecutionEngine, RhaiBackend};
use crate::host::Host;
use crate::mcp::Dispatcher;
use crate::registry::{RegistryWatcher, ToolRegistry};

/// What one tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub processed: usize,
    pub reloaded: bool,
}

/// The running server
pub struct Server {
    config: ServerConfig,
    registry: Arc<ToolRegistry>,
    queue: RequestQueue,
    stats: Arc<ServerStats>,
    dispatcher: Dispatcher,
    watcher: Option<RegistryWatcher>,
    listener: Option<Listener>,
}

impl Server {
    /// Initialize the registry, pick a backend and start listening.
    ///
    /// Must be called on the designated thread; the returned server is
    /// `!Send` and stays there.
    pub fn start(config: ServerConfig, host: Rc<dyn Host>) -> Result<Self> {
        config.validate()?;

        let registry = Arc::new(ToolRegistry::with_dirs(
            config.builtin_dir(),
            config.custom_dir(),
        ));
        let loaded = registry.initialize()?;
        tracing::info!("Loaded {} tools from {:?}", loaded, config.tools_dir);

        let watcher = match RegistryWatcher::start(&[registry.builtin_dir(), registry.custom_dir()]) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                tracing::warn!("Hot reload disabled: {}", e);
                None
            }
        };

        let print_host = Rc::clone(&host);
        let backend = select_backend(vec![
            Box::new(RhaiBackend::new().with_print_sink(move |text| print_host.print(text)))
                as Box<dyn CompileBackend>,
        ])?;

        let queue = RequestQueue::new();
        let stats = Arc::new(ServerStats::new());
        let dispatcher = Dispatcher::new(
            host,
            Arc::clone(&registry),
            ExecutionEngine::new(backend),
            Arc::clone(&stats),
            queue.clone(),
        );

        let listener = Listener::start(config.addr(), queue.clone(), Arc::clone(&stats))?;
        stats.set_running(true);

        Ok(Self {
            config,
            registry,
            queue,
            stats,
            dispatcher,
            watcher,
            listener: Some(listener),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Address actually bound, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().map(|l| l.local_addr())
    }

    pub fn is_running(&self) -> bool {
        self.stats.is_running()
    }

    /// Rebuild the registry from disk now
    pub fn reload(&self) -> usize {
        let loaded = self.registry.load_all();
        tracing::info!("Registry reloaded: {} tools", loaded);
        loaded
    }

    /// One designated-thread step: apply pending file changes, then process
    /// every queued request
    pub fn tick(&mut self) -> TickReport {
        let reloaded = self
            .watcher
            .as_mut()
            .is_some_and(|watcher| watcher.take_dirty());
        if reloaded {
            self.reload();
        }
        let processed = self.queue.drain_and_process(&self.dispatcher);
        TickReport { processed, reloaded }
    }

    /// Tick every `tick_interval` until `stop` is set, then shut down
    pub fn run_until(&mut self, stop: &AtomicBool) {
        while !stop.load(Ordering::SeqCst) {
            self.tick();
            std::thread::sleep(self.config.tick_interval);
        }
        self.stop();
    }

    /// Stop listening and discard unprocessed requests. Idempotent.
    pub fn stop(&mut self) -> usize {
        let Some(mut listener) = self.listener.take() else {
            return 0;
        };
        self.stats.set_running(false);
        self.watcher = None;
        let discarded = listener.stop(self.config.shutdown_timeout);
        tracing::info!("Server stopped");
        discarded
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}
