//! Command construction for the run and debug paths

use crate::{Runnable, RunnableKind};

/// Requests JSON-lines output from the build tool
pub const MESSAGE_FORMAT_JSON: &str = "--message-format=json";
/// Builds tests without running them
pub const NO_RUN: &str = "--no-run";

/// Tokens following the program on the run path.
///
/// Only the first executable argument is single-quoted.
pub fn run_tokens(kind: &RunnableKind) -> Vec<String> {
    match kind {
        RunnableKind::Webby(args) => {
            let mut tokens = args.webby_args.clone();
            if let Some((first, rest)) = args.executable_args.split_first() {
                tokens.push("--".to_string());
                tokens.push(format!("'{}'", first));
                tokens.extend(rest.iter().cloned());
            }
            tokens
        }
        RunnableKind::Shell(args) => args.args.clone(),
    }
}

/// Full command line typed into the run terminal
pub fn command_line(runnable: &Runnable) -> String {
    join_command(runnable.program(), &run_tokens(&runnable.kind))
}

pub(crate) fn join_command(program: &str, tokens: &[String]) -> String {
    if tokens.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, tokens.join(" "))
    }
}

/// Arguments for the build that produces the executable to debug.
///
/// Same tokens as the run path. Build-tool flags are inserted before the
/// `--` separator so the executable never sees them.
pub fn debug_build_args(kind: &RunnableKind) -> Vec<String> {
    let mut tokens = run_tokens(kind);
    let separator = match kind {
        RunnableKind::Webby(_) => tokens.iter().position(|t| t == "--"),
        RunnableKind::Shell(_) => None,
    };
    let trailing = separator.map(|i| tokens.split_off(i)).unwrap_or_default();

    if let RunnableKind::Webby(_) = kind {
        match tokens.first().map(String::as_str) {
            Some("run") => tokens[0] = "build".to_string(),
            Some("test") if !tokens.iter().any(|t| t == NO_RUN) => {
                tokens.push(NO_RUN.to_string())
            }
            _ => {}
        }
    }

    tokens.push(MESSAGE_FORMAT_JSON.to_string());
    tokens.extend(trailing);
    tokens
}

/// Arguments handed to the debugged program
pub fn debug_program_args(kind: &RunnableKind) -> String {
    match kind {
        RunnableKind::Webby(args) => args.executable_args.join(" "),
        RunnableKind::Shell(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ShellArgs, WebbyArgs};
    use std::path::PathBuf;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn webby(webby_args: &[&str], executable_args: &[&str]) -> RunnableKind {
        RunnableKind::Webby(WebbyArgs {
            webby_args: strings(webby_args),
            executable_args: strings(executable_args),
            cwd: PathBuf::from("/ws"),
            ..Default::default()
        })
    }

    fn shell(program: &str, args: &[&str]) -> Runnable {
        Runnable {
            label: program.to_string(),
            location: None,
            kind: RunnableKind::Shell(ShellArgs {
                program: program.to_string(),
                args: strings(args),
                environment: None,
                cwd: PathBuf::from("/ws"),
            }),
        }
    }

    #[test]
    fn test_shell_command_is_verbatim() {
        let runnable = shell("make", &["-C", "out dir", "--", "all"]);
        assert_eq!(run_tokens(&runnable.kind), strings(&["-C", "out dir", "--", "all"]));
        assert_eq!(command_line(&runnable), "make -C out dir -- all");
        assert_eq!(command_line(&shell("make", &[])), "make");
    }

    #[test]
    fn test_webby_without_executable_args() {
        let kind = webby(&["run", "--bin", "app"], &[]);
        assert_eq!(run_tokens(&kind), strings(&["run", "--bin", "app"]));
    }

    #[test]
    fn test_webby_quotes_only_first_executable_arg() {
        let kind = webby(
            &["test", "--package", "core"],
            &["tests::it works", "--exact", "--nocapture"],
        );
        assert_eq!(
            run_tokens(&kind),
            strings(&[
                "test",
                "--package",
                "core",
                "--",
                "'tests::it works'",
                "--exact",
                "--nocapture",
            ])
        );

        let runnable = Runnable { label: "test it".to_string(), location: None, kind };
        assert_eq!(
            command_line(&runnable),
            "webby test --package core -- 'tests::it works' --exact --nocapture"
        );
    }

    #[test]
    fn test_debug_build_args() {
        assert_eq!(
            debug_build_args(&webby(&["run", "--bin", "app"], &[])),
            strings(&["build", "--bin", "app", "--message-format=json"])
        );
        assert_eq!(
            debug_build_args(&webby(&["test", "--lib"], &[])),
            strings(&["test", "--lib", "--no-run", "--message-format=json"])
        );
        assert_eq!(
            debug_build_args(&webby(&["test", "--no-run"], &[])),
            strings(&["test", "--no-run", "--message-format=json"])
        );
        assert_eq!(
            debug_build_args(&webby(&["bench"], &[])),
            strings(&["bench", "--message-format=json"])
        );
        assert_eq!(
            debug_build_args(&shell("make", &["all", "--", "x"]).kind),
            strings(&["all", "--", "x", "--message-format=json"])
        );
    }

    #[test]
    fn test_debug_build_args_keep_executable_args() {
        assert_eq!(
            debug_build_args(&webby(&["test", "--package", "core"], &["tests::it", "--exact"])),
            strings(&[
                "test",
                "--package",
                "core",
                "--no-run",
                "--message-format=json",
                "--",
                "'tests::it'",
                "--exact",
            ])
        );
        assert_eq!(
            debug_build_args(&webby(&["run", "--bin", "app"], &["in put"])),
            strings(&["build", "--bin", "app", "--message-format=json", "--", "'in put'"])
        );
    }

    #[test]
    fn test_debug_program_args() {
        assert_eq!(debug_program_args(&webby(&["run"], &["a", "b c"])), "a b c");
        assert_eq!(debug_program_args(&shell("make", &["all"]).kind), "");
    }
}
