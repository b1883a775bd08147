//! Hostbridge server
//!
//! Run with: hostbridge-server
//!
//! Hosts the reference editor on the main thread, which doubles as the
//! designated thread that drains the request queue.

use std::net::IpAddr;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hostbridge::host::{Editor, LogLevel, ProjectInfo};
use hostbridge::{Server, ServerConfig, VERSION};

#[derive(Parser, Debug)]
#[command(name = "hostbridge-server")]
#[command(about = "JSON-RPC tool server for scripting a running host")]
struct Args {
    /// Port to listen on (0 picks a free port)
    #[arg(long, env = "HOSTBRIDGE_PORT", default_value = "9876")]
    port: u16,

    /// Loopback address to bind
    #[arg(long, env = "HOSTBRIDGE_BIND", default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Root of the builtin/ and custom/ tool directories
    #[arg(
        long,
        env = "HOSTBRIDGE_TOOLS_DIR",
        default_value = "~/.local/share/hostbridge/tools"
    )]
    tools_dir: String,

    /// Queue drain interval in ms
    #[arg(long, env = "HOSTBRIDGE_TICK_MS", default_value = "16")]
    tick_ms: u64,

    /// Max wait for the listener thread at shutdown, in ms
    #[arg(long, env = "HOSTBRIDGE_SHUTDOWN_TIMEOUT_MS", default_value = "1000")]
    shutdown_timeout_ms: u64,

    /// Project name reported by the editor host
    #[arg(long, env = "HOSTBRIDGE_PROJECT", default_value = "Untitled Project")]
    project: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn config(&self) -> ServerConfig {
        ServerConfig {
            bind: self.bind,
            port: self.port,
            tools_dir: PathBuf::from(shellexpand::tilde(&self.tools_dir).to_string()),
            tick_interval: Duration::from_millis(self.tick_ms),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
        }
    }
}

fn init_logging(json: bool) {
    // Logs go to stderr; RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false);

    if json {
        tracing_subscriber::registry()
            .with(fmt.json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry().with(fmt).with(filter).init();
    }
}

/// Flip `stop` on Ctrl-C from a helper thread
fn watch_ctrl_c(stop: Arc<AtomicBool>) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("hostbridge-signal".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    tracing::error!("Failed to create signal runtime: {}", e);
                    return;
                }
            };
            runtime.block_on(async {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        tracing::info!("Ctrl-C received, shutting down");
                        stop.store(true, Ordering::SeqCst);
                    }
                    Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}", e),
                }
            });
        })?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let editor = Editor::new(ProjectInfo::named(&args.project));
    editor.log(LogLevel::Info, format!("hostbridge {} started", VERSION));

    let mut server =
        Server::start(args.config(), Rc::new(editor)).context("failed to start server")?;

    let stop = Arc::new(AtomicBool::new(false));
    watch_ctrl_c(Arc::clone(&stop)).context("failed to install Ctrl-C handler")?;

    tracing::info!(
        "Hostbridge server {} ready on {:?}",
        VERSION,
        server.local_addr()
    );
    server.run_until(&stop);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_map_onto_config() {
        let args = Args::try_parse_from([
            "hostbridge-server",
            "--port",
            "0",
            "--tools-dir",
            "/tmp/hb-tools",
            "--tick-ms",
            "5",
        ])
        .unwrap();
        let config = args.config();
        assert_eq!(config.port, 0);
        assert_eq!(config.tools_dir, PathBuf::from("/tmp/hb-tools"));
        assert_eq!(config.tick_interval, Duration::from_millis(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_tilde_is_expanded() {
        let args = Args::try_parse_from(["hostbridge-server", "--tools-dir", "~/tools"]).unwrap();
        assert!(!args.config().tools_dir.to_string_lossy().starts_with('~'));
    }
}
