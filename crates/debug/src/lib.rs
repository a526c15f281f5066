//! # Webby Debug
//!
//! Hands a resolved executable to the editor's debugger integration.
//! Three runtimes are supported: termdebug, vimspector and nvim-dap.

pub mod runtime;
pub mod strategy;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use runtime::DebugRuntime;
pub use strategy::{Debugger, LaunchStrategy, NvimDap, Termdebug, Vimspector, render_nvim_dap};

/// Debug errors
#[derive(Debug, Error)]
pub enum DebugError {
    #[error("invalid debug runtime")]
    InvalidRuntime(String),
    #[error("debugger call failed: {0}")]
    Host(String),
}

pub type Result<T, E = DebugError> = std::result::Result<T, E>;

/// What gets debugged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugTarget {
    /// Absolute path to the executable
    pub executable: String,
    /// Program arguments, space separated
    pub args: String,
}

impl DebugTarget {
    pub fn new(executable: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            args: args.into(),
        }
    }
}

/// The editor side of a debug launch
#[async_trait]
pub trait DebugHost: Send + Sync {
    /// Execute an editor command line
    async fn command(&self, command: &str) -> Result<()>;

    /// Call an editor function with JSON arguments
    async fn call_function(&self, name: &str, args: Vec<Value>) -> Result<()>;
}
