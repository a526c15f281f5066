//! Scanning the build tool's JSON-lines output for a compiled executable

use serde::Deserialize;
use tokio::io::{AsyncBufRead, Lines};

use crate::target::ExpectedTarget;
use crate::{Result, RunnableError};

/// The only message reason that carries artifacts
pub const COMPILER_ARTIFACT: &str = "compiler-artifact";

/// One line of build-tool output
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildMessage {
    pub reason: String,
    #[serde(default)]
    pub target: BuildTarget,
    #[serde(default)]
    pub executable: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildTarget {
    #[serde(default)]
    pub kind: Vec<String>,
    #[serde(default)]
    pub name: String,
}

impl BuildMessage {
    /// Executable of a matching artifact, if this message is one
    pub fn executable_for(&self, expected: &ExpectedTarget) -> Option<&str> {
        if self.reason != COMPILER_ARTIFACT || !expected.matches(&self.target) {
            return None;
        }
        self.executable.as_deref().filter(|exe| !exe.is_empty())
    }
}

/// Read lines until the first artifact matching `expected` with an
/// executable. Lines after the match are left unread.
pub async fn find_executable<R>(lines: &mut Lines<R>, expected: &ExpectedTarget) -> Result<String>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let message: BuildMessage = match serde_json::from_str(&line) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!("Skipping malformed build output line ({}): {}", err, line);
                continue;
            }
        };

        if let Some(executable) = message.executable_for(expected) {
            tracing::debug!("Found executable {} for {}", executable, message.target.name);
            return Ok(executable.to_string());
        }
    }

    Err(RunnableError::ExecutableNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::TargetKind;
    use serde_json::json;
    use tokio::io::AsyncBufReadExt;

    fn artifact(kind: &str, name: &str, executable: Option<&str>) -> String {
        let mut message = json!({
            "reason": "compiler-artifact",
            "target": { "kind": [kind], "name": name },
        });
        if let Some(executable) = executable {
            message["executable"] = json!(executable);
        }
        format!("{}\n", message)
    }

    fn bin_foo() -> ExpectedTarget {
        ExpectedTarget {
            kind: Some(TargetKind::Bin),
            name: Some("foo".to_string()),
        }
    }

    #[tokio::test]
    async fn test_first_match_stops_scan() {
        let output = [
            "not-json\n".to_string(),
            "{\"reason\":\"other\"}\n".to_string(),
            artifact("bin", "foo", Some("/x")),
            artifact("bin", "foo", Some("/y")),
        ]
        .concat();
        let mut lines = output.as_bytes().lines();

        assert_eq!(find_executable(&mut lines, &bin_foo()).await.unwrap(), "/x");
        let rest = lines.next_line().await.unwrap().unwrap();
        assert!(rest.contains("/y"));
    }

    #[tokio::test]
    async fn test_no_match_is_error() {
        let output = [
            artifact("lib", "foo", Some("/lib")),
            artifact("bin", "bar", Some("/bar")),
            artifact("bin", "foo", None),
            artifact("bin", "foo", Some("")),
            "{\"reason\":\"build-finished\",\"success\":true}\n".to_string(),
        ]
        .concat();
        let mut lines = output.as_bytes().lines();

        let err = find_executable(&mut lines, &bin_foo()).await.unwrap_err();
        assert!(matches!(err, RunnableError::ExecutableNotFound));
        assert_eq!(err.to_string(), "could not find executable");
    }

    #[tokio::test]
    async fn test_empty_stream() {
        let mut lines = b"".as_slice().lines();
        let result = find_executable(&mut lines, &ExpectedTarget::default()).await;
        assert!(matches!(result, Err(RunnableError::ExecutableNotFound)));
    }

    #[tokio::test]
    async fn test_unfiltered_takes_first_executable() {
        let output = [
            artifact("lib", "core", None),
            "\n".to_string(),
            artifact("test", "core", Some("/t/core-1234")),
        ]
        .concat();
        let mut lines = output.as_bytes().lines();
        let exe = find_executable(&mut lines, &ExpectedTarget::default()).await.unwrap();
        assert_eq!(exe, "/t/core-1234");
    }
}
