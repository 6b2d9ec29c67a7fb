/// Application State
///
/// Everything a transport needs to serve requests: server metadata, the
/// dispatcher over the frozen tool registry, the session table, the note
/// store and request counters. Cloning is cheap and every clone shares the
/// same underlying state, so HTTP workers and the stdio loop can each hold
/// one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::core::config::ServerConfig;
use crate::core::dispatch::Dispatcher;
use crate::core::error::{NoteStoreError, RegistryError};
use crate::core::registry::ToolRegistry;
use crate::core::session::SessionManager;
use crate::tools;
use crate::tools::notes::NoteStore;

#[derive(Clone)]
pub struct AppState {
    /// Server name as reported by /health and JSON-RPC initialize
    pub server_name: String,
    /// Server version string as reported by /health and JSON-RPC initialize
    pub server_version: String,
    pub dispatcher: Dispatcher,
    pub sessions: SessionManager,
    pub notes: Arc<NoteStore>,
    /// Idle time before an SSE stream receives a ping
    pub keepalive: Duration,
    pub metrics: Arc<Metrics>,
}

/// Request counters for the /metrics endpoint.
#[derive(Default, Debug)]
pub struct Metrics {
    requests_total: AtomicU64,
    tool_calls_total: AtomicU64,
}

impl Metrics {
    // Relaxed is enough: the counters are independent and only ever read
    // for reporting.
    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_tool_call(&self) {
        self.tool_calls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn tool_calls_total(&self) -> u64 {
        self.tool_calls_total.load(Ordering::Relaxed)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Notes(#[from] NoteStoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl From<StartupError> for std::io::Error {
    fn from(e: StartupError) -> Self {
        std::io::Error::other(e)
    }
}

impl AppState {
    /// Open the note store and build the tool registry from configuration.
    pub fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let notes = Arc::new(NoteStore::open(&config.notes_file)?);
        Self::with_store(
            config.name.clone(),
            config.version.clone(),
            notes,
            config.keepalive(),
        )
    }

    pub fn with_store(
        server_name: String,
        server_version: String,
        notes: Arc<NoteStore>,
        keepalive: Duration,
    ) -> Result<Self, StartupError> {
        let registry = initialize_tools(Arc::clone(&notes))?;
        tracing::info!(tools = registry.len(), "tool registry initialized");
        Ok(Self {
            server_name,
            server_version,
            dispatcher: Dispatcher::new(registry),
            sessions: SessionManager::new(),
            notes,
            keepalive,
            metrics: Arc::new(Metrics::default()),
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.dispatcher.registry()
    }
}

/// Create the tool registry and register every tool.
///
/// Add new tool registrations in `tools::register_all`.
pub fn initialize_tools(notes: Arc<NoteStore>) -> Result<Arc<ToolRegistry>, RegistryError> {
    let mut registry = ToolRegistry::new();
    tools::register_all(&mut registry, notes)?;
    Ok(Arc::new(registry))
}

/// Shared test fixture: a fully wired state backed by a temporary notes file.
#[cfg(test)]
pub(crate) fn test_state(keepalive: Duration) -> (AppState, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("temp dir");
    let notes = NoteStore::open(dir.path().join("notes.json")).expect("note store");
    let state = AppState::with_store(
        "KensMCP".to_string(),
        "0.1.0-test".to_string(),
        Arc::new(notes),
        keepalive,
    )
    .expect("state");
    (state, dir)
}
