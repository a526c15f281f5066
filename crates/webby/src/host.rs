//! Terminal-based editor host

use std::io::Write;
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use debug::DebugHost;
use runnables::{DocumentPosition, EditorHost};

/// Prompts on stderr, reads choices from stdin and prints debugger calls
/// as editor commands on stdout.
pub struct CliHost {
    document: Option<DocumentPosition>,
}

impl CliHost {
    pub fn new(document: Option<DocumentPosition>) -> Self {
        Self { document }
    }
}

#[async_trait]
impl EditorHost for CliHost {
    fn show_status(&self, message: &str) {
        eprintln!("{}", message);
    }

    async fn pick(&self, title: &str, items: &[String]) -> Option<usize> {
        eprintln!("{}:", title);
        for (i, item) in items.iter().enumerate() {
            eprintln!("  {}) {}", i + 1, item);
        }
        eprint!("> ");
        std::io::stderr().flush().ok();

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => parse_choice(&line, items.len()),
        }
    }

    fn current_document(&self) -> Option<DocumentPosition> {
        self.document.clone()
    }
}

#[async_trait]
impl DebugHost for CliHost {
    async fn command(&self, command: &str) -> debug::Result<()> {
        println!("{}", format_command(command));
        Ok(())
    }

    async fn call_function(&self, name: &str, args: Vec<Value>) -> debug::Result<()> {
        println!("{}", format_call(name, &args)?);
        Ok(())
    }
}

/// 1-based choice; anything else cancels
pub fn parse_choice(input: &str, len: usize) -> Option<usize> {
    let n: usize = input.trim().parse().ok()?;
    (1..=len).contains(&n).then(|| n - 1)
}

pub fn format_command(command: &str) -> String {
    format!(":{}", command)
}

pub fn format_call(name: &str, args: &[Value]) -> debug::Result<String> {
    let args = args
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| debug::DebugError::Host(e.to_string()))?;
    Ok(format!(":call {}({})", name, args.join(", ")))
}
