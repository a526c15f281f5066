//! LSP client errors

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the language server client
#[derive(Debug, Error)]
pub enum LspError {
    #[error("{name} not found (searched {})", display_paths(.searched))]
    ServerNotFound { name: String, searched: Vec<PathBuf> },
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("language server is not running")]
    NotRunning,
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid message: {0}")]
    Protocol(String),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error {code}: {message}")]
    Server { code: i64, message: String },
    #[error("`{0}` was cancelled before the server replied")]
    Cancelled(String),
}

pub type Result<T, E = LspError> = std::result::Result<T, E>;

fn display_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}
