//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

pub const DEFAULT_PORT: u16 = 9876;
pub const DEFAULT_TOOLS_DIR: &str = "~/.local/share/hostbridge/tools";
pub const DEFAULT_TICK_MS: u64 = 16;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 1000;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind; must be loopback
    pub bind: IpAddr,
    /// Port to listen on (0 picks a free port)
    pub port: u16,
    /// Root holding the `builtin` and `custom` tool directories
    pub tools_dir: PathBuf,
    /// How often the designated thread drains the queue
    pub tick_interval: Duration,
    /// Upper bound on waiting for the listener thread at stop
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            tools_dir: PathBuf::from(shellexpand::tilde(DEFAULT_TOOLS_DIR).to_string()),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            shutdown_timeout: Duration::from_millis(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn builtin_dir(&self) -> PathBuf {
        self.tools_dir.join("builtin")
    }

    pub fn custom_dir(&self) -> PathBuf {
        self.tools_dir.join("custom")
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.bind.is_loopback() {
            return Err(BridgeError::Config(format!(
                "bind address {} is not a loopback address",
                self.bind
            )));
        }
        if self.tick_interval.is_zero() {
            return Err(BridgeError::Config("tick interval must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.addr().to_string(), "127.0.0.1:9876");
        assert!(config.tools_dir.ends_with("hostbridge/tools"));
        assert!(!config.tools_dir.to_string_lossy().starts_with('~'));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_public_bind_and_zero_tick() {
        let config = ServerConfig {
            bind: "0.0.0.0".parse().unwrap(),
            ..ServerConfig::default()
        };
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));

        let config = ServerConfig {
            tick_interval: Duration::ZERO,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
