/// Core Server Framework Module
///
/// This module contains the server implementation:
/// - registry.rs / dispatch.rs: tool catalog and validated, isolated execution
/// - session.rs: session-keyed event queues behind the SSE endpoint
/// - server.rs / stdio.rs: HTTP and STDIO transports
/// - rpc.rs: JSON-RPC method routing shared by both transports
/// - config.rs / state.rs: command-line configuration and shared state

pub mod config;
pub mod dispatch;
pub mod error;
pub mod registry;
pub mod resources;
pub mod rpc;
pub mod server;
pub mod session;
pub mod state;
pub mod stdio;
