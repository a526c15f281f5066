//! Connection to webby-analyzer for one CLI invocation

use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use lsp::{LspClient, LspEvent, MessageType, Position, ServerConfig, Url};
use runnables::DocumentPosition;
use settings::WebbyConfig;

/// A started language server plus the task logging its events
pub struct Session {
    client: LspClient,
    events: JoinHandle<()>,
}

impl Session {
    pub async fn connect(root: &Path, config: &WebbyConfig) -> Result<Self> {
        let server = ServerConfig::from_settings(&config.server, config.trace)?;
        tracing::info!("Using {}", server.command.display());

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let events = tokio::spawn(log_events(event_rx));

        let mut client = LspClient::new(server, event_tx);
        client
            .start(root)
            .await
            .with_context(|| format!("failed to start language server in {}", root.display()))?;

        Ok(Self { client, events })
    }

    pub fn client(&self) -> &LspClient {
        &self.client
    }

    /// Open `path` on the server and describe the cursor at `line:col` (1-based)
    pub async fn open(&self, path: &Path, line: u32, column: u32) -> Result<DocumentPosition> {
        let path = absolute(path)?;
        let uri = Url::from_file_path(&path)
            .map_err(|_| anyhow!("not a file path: {}", path.display()))?;
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;

        let language_id = self
            .client
            .config()
            .language_id_for(&path)
            .unwrap_or("plaintext")
            .to_string();
        if language_id == lsp::LANGUAGE_ID {
            self.client.did_open(uri.clone(), 1, text).await?;
        }

        Ok(DocumentPosition {
            uri,
            language_id,
            position: to_lsp_position(line, column),
        })
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.client.stop().await?;
        self.events.abort();
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// 1-based editor coordinates to a 0-based LSP position
pub fn to_lsp_position(line: u32, column: u32) -> Position {
    Position::new(line.saturating_sub(1), column.saturating_sub(1))
}

async fn log_events(mut events: mpsc::UnboundedReceiver<LspEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            LspEvent::ShowMessage { level, message } if level == MessageType::ERROR => {
                tracing::error!("{}", message)
            }
            LspEvent::ShowMessage { message, .. } => tracing::info!("{}", message),
            LspEvent::LogMessage { message, .. } => tracing::debug!("{}", message),
            LspEvent::ServerStatus(status) => {
                let message = status.message.unwrap_or_default();
                tracing::debug!("server status: {:?} {}", status.health, message)
            }
            LspEvent::ServerCrashed { name, error } => {
                tracing::error!("{} crashed: {}", name, error)
            }
            other => tracing::trace!("{:?}", other),
        }
    }
}
