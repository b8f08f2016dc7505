//! Command server configuration.

use clap::Parser;
use tracing::Level;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Default command line that starts the automation bridge.
pub const DEFAULT_BRIDGE: &str = "node bridge/index.js";

/// Command server configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "evalrun-server")]
#[command(about = "Streams browser automation commands over SSE", long_about = None)]
pub struct Config {
    /// HTTP bind address
    #[arg(long, env = "EVALRUN_BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind_addr: String,

    /// Command line that starts the automation bridge
    #[arg(long, env = "EVALRUN_BRIDGE", default_value = DEFAULT_BRIDGE)]
    pub bridge: String,

    /// Maximum log level
    #[arg(long, env = "EVALRUN_LOG_LEVEL", default_value = "info")]
    pub log_level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            bridge: DEFAULT_BRIDGE.to_string(),
            log_level: Level::INFO,
        }
    }
}
