//! # Webby Runnables
//!
//! Runnables are run/test/bench actions described by the language server.
//! This crate fetches them, lets the user pick one, and either runs it in
//! the run terminal or builds it and hands the produced executable to a
//! debugger.

pub mod artifact;
pub mod build;
pub mod catalog;
pub mod command;
pub mod host;
pub mod launch;
pub mod select;
pub mod target;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use lsp_types::LocationLink;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use artifact::{BuildMessage, BuildTarget, find_executable};
pub use catalog::{RunnableSource, RunnablesParams, RunnablesRequest, fetch_runnables};
pub use host::{DocumentPosition, EditorHost};
pub use launch::{Launcher, debug_single, run_single, run_test};
pub use select::{first_test, is_test, pick_runnable};
pub use target::{ExpectedTarget, TargetKind};

/// Runnable errors
#[derive(Debug, Error)]
pub enum RunnableError {
    #[error("could not find executable")]
    ExecutableNotFound,
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Lsp(#[from] lsp::LspError),
    #[error(transparent)]
    Terminal(#[from] terminal::TerminalError),
    #[error(transparent)]
    Debug(#[from] debug::DebugError),
}

pub type Result<T, E = RunnableError> = std::result::Result<T, E>;

/// A runnable as sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runnable {
    /// Label shown to the user, not unique
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationLink>,
    #[serde(flatten)]
    pub kind: RunnableKind,
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "lowercase")]
pub enum RunnableKind {
    Webby(WebbyArgs),
    Shell(ShellArgs),
}

/// Arguments of a build-tool runnable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebbyArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,
    /// Passed to the produced executable, after `--`
    #[serde(default)]
    pub executable_args: Vec<String>,
    /// Passed to the build tool
    #[serde(default)]
    pub webby_args: Vec<String>,
    /// Program to use instead of `webby`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_webby: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<HashMap<String, String>>,
    pub cwd: PathBuf,
}

/// Arguments of a plain shell runnable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShellArgs {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<HashMap<String, String>>,
    pub cwd: PathBuf,
}

/// Name of the build tool
pub const WEBBY: &str = "webby";

impl Runnable {
    pub fn cwd(&self) -> &Path {
        match &self.kind {
            RunnableKind::Webby(args) => &args.cwd,
            RunnableKind::Shell(args) => &args.cwd,
        }
    }

    /// Extra environment, empty when the server sent none
    pub fn environment(&self) -> HashMap<String, String> {
        let env = match &self.kind {
            RunnableKind::Webby(args) => args.environment.as_ref(),
            RunnableKind::Shell(args) => args.environment.as_ref(),
        };
        env.cloned().unwrap_or_default()
    }

    /// Program invoked for this runnable
    pub fn program(&self) -> &str {
        match &self.kind {
            RunnableKind::Webby(args) => args.override_webby.as_deref().unwrap_or(WEBBY),
            RunnableKind::Shell(args) => &args.program,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_webby_runnable() {
        let runnable: Runnable = serde_json::from_value(json!({
            "label": "run main",
            "kind": "webby",
            "args": {
                "workspaceRoot": "/ws",
                "webbyArgs": ["run", "--bin", "main"],
                "executableArgs": [],
                "cwd": "/ws"
            }
        }))
        .unwrap();

        assert_eq!(runnable.label, "run main");
        assert!(runnable.location.is_none());
        assert_eq!(runnable.program(), "webby");
        assert_eq!(runnable.cwd(), Path::new("/ws"));
        assert!(runnable.environment().is_empty());
        match &runnable.kind {
            RunnableKind::Webby(args) => {
                assert_eq!(args.webby_args, vec!["run", "--bin", "main"]);
                assert_eq!(args.workspace_root, Some(PathBuf::from("/ws")));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_deserialize_shell_runnable() {
        let runnable: Runnable = serde_json::from_value(json!({
            "label": "lint",
            "kind": "shell",
            "args": {
                "program": "webby-lint",
                "args": ["--all"],
                "environment": { "LINT": "1" },
                "cwd": "/ws/pkg"
            }
        }))
        .unwrap();

        assert_eq!(runnable.program(), "webby-lint");
        assert_eq!(runnable.environment().get("LINT").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_override_webby_and_wire_shape() {
        let runnable = Runnable {
            label: "test all".to_string(),
            location: None,
            kind: RunnableKind::Webby(WebbyArgs {
                webby_args: vec!["test".to_string()],
                override_webby: Some("/opt/webby".to_string()),
                cwd: PathBuf::from("/ws"),
                ..Default::default()
            }),
        };
        assert_eq!(runnable.program(), "/opt/webby");

        let value = serde_json::to_value(&runnable).unwrap();
        assert_eq!(value["kind"], "webby");
        assert_eq!(value["args"]["overrideWebby"], "/opt/webby");
        assert!(value.get("location").is_none());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = serde_json::from_value::<Runnable>(json!({
            "label": "x",
            "kind": "cargo",
            "args": { "cwd": "/" }
        }));
        assert!(result.is_err());
    }
}
