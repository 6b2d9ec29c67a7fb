/// Server Configuration
///
/// Settings come from command-line flags, each of which falls back to an
/// environment variable and then to a default, so the server can be driven
/// entirely from the environment in container deployments.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "KensMCP")
/// - SERVER_VERSION: Version string (default: crate version)
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "http")
/// - HOST: Bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: Port number for HTTP mode (default: 8080)
/// - WORKER_THREADS: HTTP worker count (default: CPU count, max 16)
/// - NOTES_FILE: Path of the persisted notes document (default: "data/notes.json")
/// - SSE_KEEPALIVE_SECS: Idle seconds before an SSE ping (default: 30)
/// - RUST_LOG: Log filter (default: "info")

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// JSON-RPC over stdin/stdout only
    Stdio,
    /// HTTP + SSE only
    Http,
    /// Both transports concurrently
    Both,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "kensmcp")]
#[command(about = "Utility tool server over HTTP, SSE and stdio", long_about = None)]
pub struct ServerConfig {
    /// Server name reported by /health and JSON-RPC initialize
    #[arg(long, env = "SERVER_NAME", default_value = "KensMCP")]
    pub name: String,

    /// Server version reported by /health and JSON-RPC initialize
    #[arg(long = "server-version", env = "SERVER_VERSION", default_value = env!("CARGO_PKG_VERSION"))]
    pub version: String,

    /// Which transports to run
    #[arg(long, env = "MCP_TRANSPORT_MODE", value_enum, default_value = "http")]
    pub transport: TransportMode,

    /// Bind address for the HTTP transport
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port for the HTTP transport
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// HTTP worker threads (defaults to the CPU count, capped at 16)
    #[arg(long, env = "WORKER_THREADS")]
    pub workers: Option<usize>,

    /// Path of the JSON document holding notes
    #[arg(long, env = "NOTES_FILE", default_value = "data/notes.json")]
    pub notes_file: PathBuf,

    /// Seconds of inactivity before an SSE stream receives a keepalive ping
    #[arg(long, env = "SSE_KEEPALIVE_SECS", default_value_t = 30)]
    pub keepalive_secs: u64,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|&n| n > 0)
            .unwrap_or_else(|| num_cpus::get().clamp(1, 16))
    }

    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }
}
