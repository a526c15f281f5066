//! Shell detection and configuration

use std::path::PathBuf;
use tokio::process::Command;

/// Shell configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    /// Shell executable path
    pub path: PathBuf,
    /// Shell name
    pub name: String,
    /// Flag that makes the shell run a single command string
    pub command_flag: String,
}

impl Shell {
    /// Detect default shell
    pub fn detect() -> Self {
        #[cfg(unix)]
        {
            if let Ok(shell) = std::env::var("SHELL") {
                return Self::from_path(PathBuf::from(shell));
            }
        }

        #[cfg(windows)]
        {
            if let Ok(comspec) = std::env::var("COMSPEC") {
                return Self {
                    path: PathBuf::from(&comspec),
                    name: "cmd".to_string(),
                    command_flag: "/C".to_string(),
                };
            }
        }

        Self::sh()
    }

    /// POSIX `sh`
    pub fn sh() -> Self {
        Self::from_path(PathBuf::from("/bin/sh"))
    }

    fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("sh")
            .to_string();
        let command_flag = if name.eq_ignore_ascii_case("cmd") { "/C" } else { "-c" }.to_string();

        Self { path, name, command_flag }
    }

    /// Interactive session reading commands from stdin
    pub fn interactive(&self) -> Command {
        Command::new(&self.path)
    }

    /// Run `command_line` through the shell, so quoting and expansion apply
    pub fn run(&self, command_line: &str) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.arg(&self.command_flag).arg(command_line);
        cmd
    }
}

impl Default for Shell {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_flag() {
        assert_eq!(Shell::from_path(PathBuf::from("/usr/bin/zsh")).command_flag, "-c");
        assert_eq!(Shell::from_path(PathBuf::from("/usr/bin/zsh")).name, "zsh");
        assert_eq!(Shell::from_path(PathBuf::from("cmd.exe")).command_flag, "/C");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_through_shell() {
        let output = Shell::sh().run("echo 'a b' | tr ' ' '-'").output().await.unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "a-b");
    }
}
