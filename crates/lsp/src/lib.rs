//! # Webby LSP
//!
//! Language Server Protocol client for `webby-analyzer`.
//! Spawns the server, speaks JSON-RPC over stdio and exposes typed requests,
//! including the analyzer's protocol extensions.

pub mod client;
pub mod error;
pub mod ext;
pub mod process;
pub mod transport;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use lsp_types::*;
pub use client::LspClient;
pub use error::LspError;
pub use process::{ServerVersion, needs_upgrade, parse_version, resolve_server, server_version};

use settings::{ServerSettings, TraceLevel};

/// Language id handled by this client
pub const LANGUAGE_ID: &str = "webby";

/// Server binary name
pub const SERVER_NAME: &str = "webby-analyzer";

/// Language server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Language ID
    pub language_id: String,
    /// Server name
    pub name: String,
    /// Resolved server binary
    pub command: PathBuf,
    /// Command arguments
    pub args: Vec<String>,
    /// Environment variables
    pub env: HashMap<String, String>,
    /// File extensions this server handles
    pub extensions: Vec<String>,
    /// Initialization options
    pub initialization_options: Option<serde_json::Value>,
    /// Message tracing
    pub trace: TraceLevel,
}

impl ServerConfig {
    /// Configuration for `webby-analyzer` at `command`
    pub fn webby_analyzer(command: PathBuf) -> Self {
        Self {
            language_id: LANGUAGE_ID.to_string(),
            name: SERVER_NAME.to_string(),
            command,
            args: Vec::new(),
            env: HashMap::new(),
            extensions: vec!["wby".to_string()],
            initialization_options: None,
            trace: TraceLevel::Off,
        }
    }

    /// Resolve the binary and apply the server settings
    pub fn from_settings(settings: &ServerSettings, trace: TraceLevel) -> Result<Self, LspError> {
        let command = resolve_server(settings)?;
        let mut config = Self::webby_analyzer(command);
        config.env = settings.extra_env.clone();
        config.trace = trace;
        Ok(config)
    }

    /// Whether a file belongs to this server
    pub fn handles_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Language id for a file, if it is handled by this server
    pub fn language_id_for(&self, path: &Path) -> Option<&str> {
        self.handles_path(path).then_some(self.language_id.as_str())
    }
}

/// Server state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Not started
    Stopped,
    /// Starting up
    Starting,
    /// Initialized and ready
    Running,
    /// Shutting down
    ShuttingDown,
    /// Exited unexpectedly
    Failed,
}

/// LSP event
#[derive(Debug, Clone)]
pub enum LspEvent {
    /// Server started
    ServerStarted { name: String },
    /// Server stopped
    ServerStopped { name: String },
    /// Server exited without being asked to
    ServerCrashed { name: String, error: String },
    /// Health report from the analyzer
    ServerStatus(ext::ServerStatusParams),
    /// Diagnostics published
    DiagnosticsPublished { uri: Url, diagnostics: Vec<Diagnostic> },
    /// Progress update
    Progress(ProgressParams),
    /// Log message
    LogMessage { level: MessageType, message: String },
    /// Show message
    ShowMessage { level: MessageType, message: String },
}
