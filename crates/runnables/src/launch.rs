//! Running and debugging a selected runnable

use std::sync::Arc;

use debug::{DebugHost, DebugTarget, Debugger};
use settings::{DebugSettings, WebbyConfig};
use terminal::{RunTerminal, Shell, TerminalFactory, TerminalId, TerminalOptions};

use crate::build::DebugBuild;
use crate::command::{command_line, debug_program_args};
use crate::host::EditorHost;
use crate::target::ExpectedTarget;
use crate::{Result, Runnable, RunnableKind};

/// Title of the run terminal
pub const RUN_TERMINAL_NAME: &str = "webby";

/// Owns the run terminal and the debug configuration
pub struct Launcher {
    terminals: Arc<dyn TerminalFactory>,
    run_terminal: RunTerminal,
    shell: Shell,
    start_insert: bool,
    debug: DebugSettings,
}

impl Launcher {
    pub fn new(terminals: Arc<dyn TerminalFactory>, shell: Shell, config: &WebbyConfig) -> Self {
        Self {
            terminals,
            run_terminal: RunTerminal::new(),
            shell,
            start_insert: config.terminal.start_insert,
            debug: config.debug.clone(),
        }
    }

    pub fn run_terminal(&self) -> &RunTerminal {
        &self.run_terminal
    }

    /// Type the runnable's command line into a fresh run terminal
    pub fn run(&self, runnable: &Runnable) -> Result<TerminalId> {
        let options = TerminalOptions::new(RUN_TERMINAL_NAME, runnable.cwd().to_path_buf())
            .with_env(runnable.environment());
        let id = self.run_terminal.replace(self.terminals.as_ref(), options)?;

        let command = command_line(runnable);
        tracing::info!("Running `{}` in terminal {:?}", command, id);

        let start_insert = self.start_insert;
        self.run_terminal
            .with_current(|session| {
                session.send_text(&command, true)?;
                if start_insert {
                    session.enter_edit_mode();
                }
                Ok::<_, terminal::TerminalError>(())
            })
            .transpose()?;

        Ok(id)
    }

    /// Build the runnable, find its executable and start the debugger on it.
    /// Returns the executable path.
    pub async fn debug(
        &self,
        runnable: &Runnable,
        host: Arc<dyn EditorHost>,
        debug_host: &dyn DebugHost,
    ) -> Result<String> {
        let debugger = Debugger::from_settings(&self.debug)?;

        let expected = match &runnable.kind {
            RunnableKind::Webby(args) => ExpectedTarget::from_args(&args.webby_args),
            RunnableKind::Shell(_) => ExpectedTarget::default(),
        };

        let build = DebugBuild::spawn(runnable, &self.shell, host)?;
        let executable = build.find_executable(&expected).await?;

        let target = DebugTarget::new(executable.clone(), debug_program_args(&runnable.kind));
        debugger.launch(debug_host, &target).await?;
        Ok(executable)
    }
}

/// Pick a runnable at the cursor and run it
pub async fn run_single(
    source: &dyn crate::RunnableSource,
    host: &dyn EditorHost,
    launcher: &Launcher,
) -> Result<Option<TerminalId>> {
    let Some(document) = host.current_document() else {
        return Ok(None);
    };
    let runnables = crate::fetch_runnables(source, host, &document).await?;
    match crate::pick_runnable(host, &runnables).await {
        Some(runnable) => launcher.run(runnable).map(Some),
        None => Ok(None),
    }
}

/// Run the first test runnable at the cursor
pub async fn run_test(
    source: &dyn crate::RunnableSource,
    host: &dyn EditorHost,
    launcher: &Launcher,
) -> Result<Option<TerminalId>> {
    let Some(document) = host.current_document() else {
        return Ok(None);
    };
    let runnables = crate::fetch_runnables(source, host, &document).await?;
    match crate::first_test(&runnables) {
        Some(runnable) => launcher.run(runnable).map(Some),
        None => Ok(None),
    }
}

/// Pick a runnable at the cursor and debug it
pub async fn debug_single(
    source: &dyn crate::RunnableSource,
    host: Arc<dyn EditorHost>,
    debug_host: &dyn DebugHost,
    launcher: &Launcher,
) -> Result<Option<String>> {
    let Some(document) = host.current_document() else {
        return Ok(None);
    };
    let runnables = crate::fetch_runnables(source, host.as_ref(), &document).await?;
    let Some(runnable) = crate::pick_runnable(host.as_ref(), &runnables).await else {
        return Ok(None);
    };
    launcher.debug(runnable, Arc::clone(&host), debug_host).await.map(Some)
}
