//! Shell-backed terminal session

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{Shell, TerminalError, TerminalFactory, TerminalId, TerminalOptions, TerminalSession};

/// A shell process whose stdin receives typed text and whose output goes
/// straight to the parent's stdout/stderr.
pub struct ShellTerminal {
    id: TerminalId,
    title: String,
    child: Option<Child>,
    /// Input sender
    input_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
    writer: Option<JoinHandle<()>>,
}

impl ShellTerminal {
    /// Spawn an interactive shell in the requested directory and environment
    pub fn spawn(
        id: TerminalId,
        shell: &Shell,
        options: &TerminalOptions,
    ) -> Result<Self, TerminalError> {
        tracing::info!("Spawning terminal `{}` with shell: {}", options.name, shell.path.display());

        let mut child = shell
            .interactive()
            .current_dir(&options.cwd)
            .envs(&options.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TerminalError::Spawn {
                shell: shell.path.display().to_string(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(TerminalError::Closed(id))?;
        let (input_tx, mut input_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let writer = tokio::spawn(async move {
            while let Some(data) = input_rx.recv().await {
                if let Err(err) = stdin.write_all(&data).await {
                    tracing::warn!("Terminal input closed: {}", err);
                    break;
                }
                stdin.flush().await.ok();
            }
        });

        Ok(Self {
            id,
            title: options.name.clone(),
            child: Some(child),
            input_tx: Some(input_tx),
            writer: Some(writer),
        })
    }
}

#[async_trait]
impl TerminalSession for ShellTerminal {
    fn id(&self) -> TerminalId {
        self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn send_text(&mut self, text: &str, add_newline: bool) -> Result<(), TerminalError> {
        let tx = self.input_tx.as_ref().ok_or(TerminalError::Closed(self.id))?;
        let mut data = text.as_bytes().to_vec();
        if add_newline {
            data.push(b'\n');
        }
        tx.send(data).map_err(|_| TerminalError::Closed(self.id))
    }

    fn dispose(&mut self) {
        self.input_tx = None;
        if let Some(writer) = self.writer.take() {
            writer.abort();
        }
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.start_kill() {
                tracing::debug!("Terminal {:?} already exited: {}", self.id, err);
            }
        }
        tracing::debug!("Disposed terminal {:?}", self.id);
    }

    async fn wait(&mut self) -> Result<Option<i32>, TerminalError> {
        // Closing stdin lets the shell exit after the queued input.
        self.input_tx = None;
        if let Some(writer) = self.writer.take() {
            writer.await.ok();
        }
        let mut child = self.child.take().ok_or(TerminalError::Closed(self.id))?;
        let status = child.wait().await?;
        Ok(status.code())
    }
}

impl Drop for ShellTerminal {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Creates shell terminals with increasing ids
pub struct ShellTerminalFactory {
    shell: Shell,
    next_id: AtomicU64,
}

impl ShellTerminalFactory {
    pub fn new(shell: Shell) -> Self {
        Self {
            shell,
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for ShellTerminalFactory {
    fn default() -> Self {
        Self::new(Shell::detect())
    }
}

impl TerminalFactory for ShellTerminalFactory {
    fn create(&self, options: TerminalOptions) -> Result<Box<dyn TerminalSession>, TerminalError> {
        let id = TerminalId(self.next_id.fetch_add(1, Ordering::SeqCst));
        Ok(Box::new(ShellTerminal::spawn(id, &self.shell, &options)?))
    }
}
