/// KensMCP Server Entry Point
///
/// Parses configuration from flags and environment variables, opens the note
/// store, builds the tool registry and starts the selected transport.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "KensMCP")
/// - SERVER_VERSION: Version string (default: crate version)
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "http")
/// - HOST: Bind address for HTTP mode (default: "0.0.0.0")
/// - PORT: Port number for HTTP mode (default: 8080)
/// - WORKER_THREADS: HTTP worker count (default: CPU count, max 16)
/// - NOTES_FILE: Note persistence file (default: "data/notes.json")
/// - SSE_KEEPALIVE_SECS: Idle seconds before an SSE ping (default: 30)
/// - RUST_LOG: Log filter (default: "info")

mod core;
mod tools;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::core::config::{ServerConfig, TransportMode};
use crate::core::state::AppState;
use crate::core::{server, stdio};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Logs go to stderr; stdout carries JSON-RPC in stdio mode
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::parse();
    let state = AppState::from_config(&config)?;

    match config.transport {
        TransportMode::Stdio => stdio::run_server_stdio(state).await,
        TransportMode::Http => server::run_server_http(&config, state).await,
        TransportMode::Both => {
            // STDIO in the background, HTTP in the foreground
            let stdio_state = state.clone();
            let stdio_handle = tokio::spawn(async move {
                if let Err(e) = stdio::run_server_stdio(stdio_state).await {
                    tracing::error!(error = %e, "STDIO server error");
                }
            });

            let http_result = server::run_server_http(&config, state).await;

            // If HTTP server exits, abort STDIO task
            stdio_handle.abort();

            http_result
        }
    }
}
