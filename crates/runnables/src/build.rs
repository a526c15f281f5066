//! The build invoked before debugging

use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout};
use tokio::task::JoinHandle;

use terminal::Shell;

use crate::artifact;
use crate::command::{debug_build_args, join_command};
use crate::host::EditorHost;
use crate::target::ExpectedTarget;
use crate::{Result, Runnable, RunnableError};

/// A running build whose stdout is scanned for the executable
pub struct DebugBuild {
    command: String,
    child: Child,
    stdout: Lines<BufReader<ChildStdout>>,
    progress: JoinHandle<()>,
}

impl DebugBuild {
    /// Start the build through `shell` in the runnable's directory.
    /// Stderr lines are reported to `host` as status messages.
    pub fn spawn(runnable: &Runnable, shell: &Shell, host: Arc<dyn EditorHost>) -> Result<Self> {
        let command = join_command(runnable.program(), &debug_build_args(&runnable.kind));
        tracing::info!("Running debug build: {}", command);

        let mut child = shell
            .run(&command)
            .current_dir(runnable.cwd())
            .envs(runnable.environment())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RunnableError::Spawn { command: command.clone(), source })?;

        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let progress = tokio::spawn(async move {
            if let Err(err) = report_progress(BufReader::new(stderr), host.as_ref()).await {
                tracing::warn!("Build stderr closed: {}", err);
            }
        });

        Ok(Self {
            command,
            child,
            stdout: BufReader::new(stdout).lines(),
            progress,
        })
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Scan stdout for the executable. Whatever the outcome, the rest of the
    /// output is drained in the background and the child is reaped.
    pub async fn find_executable(self, expected: &ExpectedTarget) -> Result<String> {
        let Self { mut child, mut stdout, progress, .. } = self;
        let result = artifact::find_executable(&mut stdout, expected).await;

        tokio::spawn(async move {
            while let Ok(Some(_)) = stdout.next_line().await {}
            progress.await.ok();
            match child.wait().await {
                Ok(status) => tracing::debug!("Debug build exited with {}", status),
                Err(err) => tracing::warn!("Failed to wait for debug build: {}", err),
            }
        });

        result
    }
}

fn missing_pipe(name: &str) -> RunnableError {
    RunnableError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        format!("build {} not captured", name),
    ))
}

/// Forward each non-blank line, left-trimmed, to the status line
pub async fn report_progress<R>(reader: R, host: &dyn EditorHost) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_start();
        if !line.is_empty() {
            host.show_status(line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::FakeHost;
    use crate::{RunnableKind, ShellArgs, WebbyArgs};
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_report_progress_trims_and_skips_blank() {
        let host = FakeHost::default();
        let stderr = "   Compiling core v0.1.0\n\n    \n    Finished dev\n";
        report_progress(stderr.as_bytes(), &host).await.unwrap();

        assert_eq!(
            *host.statuses.lock(),
            vec!["Compiling core v0.1.0".to_string(), "Finished dev".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_through_shell() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-build");
        std::fs::write(
            &script,
            concat!(
                "echo '   Building' >&2\n",
                "echo \"args: $*\" >&2\n",
                "echo garbage\n",
                "echo '{\"reason\":\"compiler-artifact\",",
                "\"target\":{\"kind\":[\"bin\"],\"name\":\"app\"},",
                "\"executable\":\"'\"$PWD\"'/app\"}'\n",
            ),
        )
        .unwrap();

        let runnable = crate::Runnable {
            label: "run app".to_string(),
            location: None,
            kind: RunnableKind::Shell(ShellArgs {
                program: format!("sh {}", script.display()),
                args: vec!["run".to_string()],
                environment: None,
                cwd: dir.path().to_path_buf(),
            }),
        };

        let host = Arc::new(FakeHost::default());
        let build = DebugBuild::spawn(&runnable, &Shell::sh(), host.clone()).unwrap();
        assert!(build.command().ends_with("run --message-format=json"));

        let exe = build.find_executable(&ExpectedTarget::default()).await.unwrap();
        let exe = PathBuf::from(exe);
        assert_eq!(exe.file_name().and_then(|n| n.to_str()), Some("app"));

        // stderr forwarding runs concurrently; give it a moment to finish.
        for _ in 0..50 {
            if host.statuses.lock().len() >= 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        let statuses = host.statuses.lock();
        assert_eq!(statuses[0], "Building");
        assert_eq!(statuses[1], "args: run --message-format=json");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_flags_precede_executable_args() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-webby");
        std::fs::write(
            &script,
            concat!(
                "echo \"args: $*\" >&2\n",
                "echo '{\"reason\":\"compiler-artifact\",",
                "\"target\":{\"kind\":[\"lib\"],\"name\":\"core\"},",
                "\"executable\":\"/tmp/core-test\"}'\n",
            ),
        )
        .unwrap();

        let runnable = crate::Runnable {
            label: "test tests::it".to_string(),
            location: None,
            kind: RunnableKind::Webby(WebbyArgs {
                workspace_root: None,
                executable_args: vec!["tests::it".to_string(), "--exact".to_string()],
                webby_args: vec!["test".to_string(), "--package".to_string(), "core".to_string()],
                override_webby: Some(format!("sh {}", script.display())),
                environment: None,
                cwd: dir.path().to_path_buf(),
            }),
        };

        let host = Arc::new(FakeHost::default());
        let build = DebugBuild::spawn(&runnable, &Shell::sh(), host.clone()).unwrap();
        let exe = build.find_executable(&ExpectedTarget::default()).await.unwrap();
        assert_eq!(exe, "/tmp/core-test");

        for _ in 0..50 {
            if !host.statuses.lock().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        }
        assert_eq!(
            host.statuses.lock()[0],
            "args: test --package core --no-run --message-format=json -- tests::it --exact"
        );
    }
}
