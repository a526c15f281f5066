//! # webby-client
//!
//! Drives webby-analyzer from the command line: list, run and debug
//! runnables, and call the server's extension requests.
//!
//! ```bash
//! webby-client runnables src/main.wby 12 5
//! webby-client debug src/main.wby 12 5
//! webby-client ssr src/main.wby 'foo($a) ==>> bar($a)'
//! webby-client config set webby.debug.runtime nvim-dap
//! ```

mod host;
mod session;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lsp::{Range, TextDocumentIdentifier, ext::SsrParams};
use runnables::command::command_line;
use runnables::{EditorHost, Launcher};
use serde_json::Value;
use settings::{LayerPriority, Settings, WebbyConfig, user_settings_path, workspace_settings_path};
use terminal::{Shell, ShellTerminalFactory};

use host::CliHost;
use session::Session;

/// webby-analyzer client
#[derive(Parser, Debug)]
#[command(name = "webby-client")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Workspace root, defaults to the current directory
    #[arg(short, long, value_name = "DIR", global = true)]
    workspace: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Cursor location, 1-based
#[derive(clap::Args, Debug, Clone)]
struct Cursor {
    #[arg(value_name = "FILE")]
    file: PathBuf,
    #[arg(value_name = "LINE", default_value_t = 1)]
    line: u32,
    #[arg(value_name = "COL", default_value_t = 1)]
    column: u32,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the version of the resolved server binary
    ServerVersion {
        /// Warn when the server is older than this
        #[arg(long, value_name = "VERSION")]
        require: Option<String>,
    },
    /// Read or change settings
    #[command(subcommand)]
    Config(ConfigCommand),
    #[command(flatten)]
    Server(ServerCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print every setting with its effective value
    List,
    /// Store a value in the workspace settings file
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        /// JSON value; anything that does not parse is taken as a string
        #[arg(value_name = "VALUE")]
        value: String,
        /// Write the user settings file instead
        #[arg(long)]
        user: bool,
    },
}

/// Commands that talk to a running server
#[derive(Subcommand, Debug)]
enum ServerCommand {
    /// List runnables at a position
    Runnables(Cursor),
    /// Pick a runnable and run it
    Run(Cursor),
    /// Run the first test runnable at a position
    Test(Cursor),
    /// Pick a runnable, build it and start the debugger
    Debug(Cursor),
    /// Print the syntax tree of a file
    SyntaxTree {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Structural search and replace
    Ssr {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// `search ==>> replacement`
        #[arg(value_name = "QUERY")]
        query: String,
        /// Only check that the query parses
        #[arg(long)]
        parse_only: bool,
    },
    /// Print the package graph in dot format
    PackageGraph {
        /// Include non-workspace packages
        #[arg(long)]
        full: bool,
    },
    /// Print the position of the brace matching the one at the cursor
    MatchingBrace(Cursor),
    /// Print the edits joining the cursor line with the next one
    JoinLines(Cursor),
    /// Ask the server to reload the workspace
    ReloadWorkspace,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let root = match &args.workspace {
        Some(root) => root.clone(),
        None => std::env::current_dir()?,
    };
    let settings = Settings::load(Some(root.as_path()))?;
    let config = settings.webby_config();
    tracing::debug!("Workspace root: {}", root.display());

    match args.command {
        Command::ServerVersion { require } => server_version(&config, require.as_deref()).await,
        Command::Config(command) => configure(settings, &root, command),
        Command::Server(command) => run_with_session(&root, &config, command).await,
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(filter)
        .init();
}

async fn server_version(config: &WebbyConfig, require: Option<&str>) -> Result<()> {
    let binary = lsp::resolve_server(&config.server)?;
    let version = lsp::server_version(&binary).await?;
    println!("{} ({})", version, binary.display());

    if let Some(required) = require {
        let required = lsp::parse_version(required)
            .ok_or_else(|| anyhow::anyhow!("invalid version: {}", required))?;
        match lsp::parse_version(&version) {
            Some(installed) if lsp::needs_upgrade(&installed, &required) => {
                tracing::warn!("{} is older than the required {}", installed, required);
            }
            Some(_) => {}
            None => tracing::warn!("could not parse server version from `{}`", version),
        }
    }
    Ok(())
}

fn configure(mut settings: Settings, root: &Path, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::List => {
            let mut all: Vec<_> = settings.all().into_iter().collect();
            all.sort_by(|a, b| a.0.cmp(&b.0));
            for (key, value) in all {
                println!("{} = {}", key, value);
            }
        }
        ConfigCommand::Set { key, value, user } => {
            let value = parse_setting_value(value);
            let (priority, path) = if user {
                let path = user_settings_path()
                    .ok_or_else(|| anyhow!("no user configuration directory"))?;
                (LayerPriority::User, path)
            } else {
                (LayerPriority::Workspace, workspace_settings_path(root))
            };
            settings.write(&key, value, priority, &path)?;
            tracing::info!("Wrote `{}` to {}", key, path.display());
        }
    }
    Ok(())
}

fn parse_setting_value(raw: String) -> Value {
    serde_json::from_str(&raw).unwrap_or(Value::String(raw))
}

async fn run_with_session(root: &Path, config: &WebbyConfig, command: ServerCommand) -> Result<()> {
    let session = Session::connect(root, config).await?;
    let result = dispatch(&session, config, command).await;
    session.shutdown().await?;
    result
}

async fn dispatch(session: &Session, config: &WebbyConfig, command: ServerCommand) -> Result<()> {
    let client = session.client();
    let launcher =
        || Launcher::new(Arc::new(ShellTerminalFactory::default()), Shell::detect(), config);

    match command {
        ServerCommand::Runnables(cursor) => {
            let host = host_at(session, &cursor).await?;
            let Some(document) = host.current_document() else { return Ok(()) };
            for runnable in runnables::fetch_runnables(client, &host, &document).await? {
                println!("{}\t{}", runnable.label, command_line(&runnable));
            }
        }
        ServerCommand::Run(cursor) => {
            let host = host_at(session, &cursor).await?;
            let launcher = launcher();
            if runnables::run_single(client, &host, &launcher).await?.is_some() {
                wait_for_run(&launcher).await?;
            }
        }
        ServerCommand::Test(cursor) => {
            let host = host_at(session, &cursor).await?;
            let launcher = launcher();
            if runnables::run_test(client, &host, &launcher).await?.is_some() {
                wait_for_run(&launcher).await?;
            }
        }
        ServerCommand::Debug(cursor) => {
            let host = Arc::new(host_at(session, &cursor).await?);
            let editor: Arc<dyn EditorHost> = host.clone();
            let launcher = launcher();
            let debugged = runnables::debug_single(client, editor, host.as_ref(), &launcher).await?;
            if let Some(executable) = debugged {
                tracing::info!("Debugging {}", executable);
            }
        }
        ServerCommand::SyntaxTree { file } => {
            let document = session.open(&file, 1, 1).await?;
            println!("{}", client.syntax_tree(document.uri, None).await?);
        }
        ServerCommand::Ssr { file, query, parse_only } => {
            let document = session.open(&file, 1, 1).await?;
            let edit = client
                .ssr(SsrParams {
                    query,
                    parse_only,
                    text_document: TextDocumentIdentifier::new(document.uri),
                    position: document.position,
                    selections: Vec::new(),
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&edit)?);
        }
        ServerCommand::PackageGraph { full } => {
            println!("{}", client.view_package_graph(full).await?);
        }
        ServerCommand::MatchingBrace(cursor) => {
            let document = session.open(&cursor.file, cursor.line, cursor.column).await?;
            for position in client.matching_brace(document.uri, vec![document.position]).await? {
                println!("{}:{}", position.line + 1, position.character + 1);
            }
        }
        ServerCommand::JoinLines(cursor) => {
            let document = session.open(&cursor.file, cursor.line, cursor.column).await?;
            let range = Range::new(document.position, document.position);
            let edits = client.join_lines(document.uri, vec![range]).await?;
            println!("{}", serde_json::to_string_pretty(&edits)?);
        }
        ServerCommand::ReloadWorkspace => {
            client.reload_workspace().await?;
        }
    }
    Ok(())
}

async fn host_at(session: &Session, cursor: &Cursor) -> Result<CliHost> {
    let document = session.open(&cursor.file, cursor.line, cursor.column).await?;
    Ok(CliHost::new(Some(document)))
}

/// The run terminal is this process's child; wait for it to finish.
async fn wait_for_run(launcher: &Launcher) -> Result<()> {
    if let Some(mut terminal) = launcher.run_terminal().take() {
        let status = terminal.wait().await?;
        tracing::debug!("Run terminal exited with {:?}", status);
    }
    Ok(())
}
