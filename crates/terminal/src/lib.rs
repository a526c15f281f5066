//! # Webby Terminal
//!
//! Terminal sessions used to run runnables:
//! - `TerminalSession` / `TerminalFactory` describe what an editor terminal must do
//! - `ShellTerminal` is a shell process fed through stdin
//! - `RunTerminal` keeps the single reusable run terminal

pub mod session;
pub mod shell;
pub mod slot;

use std::collections::HashMap;
use std::path::PathBuf;
use async_trait::async_trait;
use thiserror::Error;

pub use session::{ShellTerminal, ShellTerminalFactory};
pub use shell::Shell;
pub use slot::RunTerminal;

/// Terminal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalId(pub u64);

/// Options used when opening a terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalOptions {
    /// Terminal title
    pub name: String,
    /// Working directory
    pub cwd: PathBuf,
    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl TerminalOptions {
    pub fn new(name: impl Into<String>, cwd: PathBuf) -> Self {
        Self {
            name: name.into(),
            cwd,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

/// Terminal errors
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("failed to start shell {shell}: {source}")]
    Spawn {
        shell: String,
        #[source]
        source: std::io::Error,
    },
    #[error("terminal {0:?} is closed")]
    Closed(TerminalId),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// An open terminal
#[async_trait]
pub trait TerminalSession: Send {
    fn id(&self) -> TerminalId;

    fn title(&self) -> &str;

    /// Send text as if typed by the user
    fn send_text(&mut self, text: &str, add_newline: bool) -> Result<(), TerminalError>;

    /// Put the terminal in its text-editing mode (`startinsert` in Vim)
    fn enter_edit_mode(&mut self) {}

    /// Close the terminal; the session is unusable afterwards
    fn dispose(&mut self);

    /// Stop sending input and wait for the session to end
    async fn wait(&mut self) -> Result<Option<i32>, TerminalError>;
}

/// Opens terminals
pub trait TerminalFactory: Send + Sync {
    fn create(&self, options: TerminalOptions) -> Result<Box<dyn TerminalSession>, TerminalError>;
}
