//! Language server binary resolution and process management

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use settings::ServerSettings;

use crate::error::{LspError, Result};
use crate::{SERVER_NAME, ServerConfig};

/// A running language server process
pub struct ServerProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl ServerProcess {
    /// Spawn the server with piped stdio
    pub fn spawn(config: &ServerConfig, cwd: &Path) -> Result<Self> {
        let mut cmd = Command::new(&config.command);

        cmd.args(&config.args)
            .envs(&config.env)
            .current_dir(cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| LspError::Spawn {
            command: config.command.display().to_string(),
            source,
        })?;

        tracing::info!("Started language server: {} ({})", config.name, config.command.display());

        Ok(Self {
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
            child,
        })
    }

    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.stdin.take()
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Kill the process
    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await?;
        Ok(())
    }

    /// Check if the process has exited
    pub fn try_wait(&mut self) -> Result<Option<std::process::ExitStatus>> {
        Ok(self.child.try_wait()?)
    }
}

/// Directory holding managed server installs
pub fn install_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("webby").join("bin"))
}

fn binary_name() -> String {
    format!("{}{}", SERVER_NAME, std::env::consts::EXE_SUFFIX)
}

/// Locate the server binary.
///
/// Order: the configured `webby.server.path`, the managed install directory,
/// then every entry of `PATH`.
pub fn resolve_server(settings: &ServerSettings) -> Result<PathBuf> {
    resolve_server_in(settings, install_dir(), std::env::var_os("PATH"))
}

fn resolve_server_in(
    settings: &ServerSettings,
    install_dir: Option<PathBuf>,
    path_var: Option<std::ffi::OsString>,
) -> Result<PathBuf> {
    let mut searched = Vec::new();

    if let Some(path) = &settings.path {
        if path.is_file() {
            return Ok(path.clone());
        }
        tracing::warn!("Configured server path does not exist: {}", path.display());
        searched.push(path.clone());
    }

    let name = binary_name();
    let candidates = install_dir
        .into_iter()
        .chain(path_var.iter().flat_map(std::env::split_paths))
        .map(|dir| dir.join(&name));

    for candidate in candidates {
        if candidate.is_file() {
            tracing::debug!("Resolved {} at {}", SERVER_NAME, candidate.display());
            return Ok(candidate);
        }
        searched.push(candidate);
    }

    Err(LspError::ServerNotFound {
        name: SERVER_NAME.to_string(),
        searched,
    })
}

/// Numeric server version (`major.minor.patch`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Extract the first dotted numeric token, e.g. `webby-analyzer 0.4.2 (3f1a 2024-05-01)`
pub fn parse_version(text: &str) -> Option<ServerVersion> {
    text.split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .map(|token| token.trim_start_matches('v'))
        .find_map(|token| {
            let mut parts = token.split('.');
            let major = parts.next()?.parse().ok()?;
            let minor = parts.next()?.parse().ok()?;
            let patch = parts
                .next()
                .map(|p| p.chars().take_while(char::is_ascii_digit).collect::<String>())
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);
            Some(ServerVersion { major, minor, patch })
        })
}

/// Whether the installed version is older than the required one
pub fn needs_upgrade(installed: &ServerVersion, required: &ServerVersion) -> bool {
    installed < required
}

/// Run `<server> --version` and return its trimmed output
pub async fn server_version(binary: &Path) -> Result<String> {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| LspError::Spawn {
            command: binary.display().to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(LspError::Protocol(format!(
            "{} --version exited with {}",
            binary.display(),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}
