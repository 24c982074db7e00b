/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Configuration and logging setup shared by the fixline examples.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default server port.
pub const DEFAULT_PORT: u16 = 9876;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Example configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ExampleConfig {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// FIX version.
    pub begin_string: String,
    /// Sender CompID.
    pub sender_comp_id: String,
    /// Target CompID.
    pub target_comp_id: String,
    /// Heartbeat interval.
    pub heartbeat_interval: Duration,
    /// Directory for the file store; in-memory when unset.
    pub store_dir: Option<PathBuf>,
}

impl ExampleConfig {
    /// Creates a new configuration for a client.
    #[must_use]
    pub fn client() -> Self {
        Self::from_env("CLIENT", "SERVER")
    }

    /// Creates a new configuration for a server.
    #[must_use]
    pub fn server() -> Self {
        Self::from_env("SERVER", "CLIENT")
    }

    fn from_env(sender: &str, target: &str) -> Self {
        Self {
            host: env::var("FIX_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
            port: env::var("FIX_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            begin_string: env::var("FIX_VERSION").unwrap_or_else(|_| "FIX.4.2".to_string()),
            sender_comp_id: env::var("FIX_SENDER").unwrap_or_else(|_| sender.to_string()),
            target_comp_id: env::var("FIX_TARGET").unwrap_or_else(|_| target.to_string()),
            heartbeat_interval: env::var("FIX_HEARTBEAT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map_or(Duration::from_secs(30), Duration::from_secs),
            store_dir: env::var_os("FIX_STORE").map(PathBuf::from),
        }
    }

    /// Returns the socket address string.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Initializes logging for examples.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addr_format() {
        let cfg = ExampleConfig {
            host: "localhost".to_string(),
            port: 9880,
            begin_string: "FIX.4.4".to_string(),
            sender_comp_id: "BUY".to_string(),
            target_comp_id: "SELL".to_string(),
            heartbeat_interval: Duration::from_secs(30),
            store_dir: None,
        };
        assert_eq!(cfg.addr(), "localhost:9880");
    }
}
