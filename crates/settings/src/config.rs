//! Typed view of the `webby.*` settings

use std::collections::HashMap;
use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{SettingSchema, Settings};

/// Setting keys
pub mod keys {
    pub const SERVER_PATH: &str = "webby.server.path";
    pub const SERVER_EXTRA_ENV: &str = "webby.server.extraEnv";
    pub const DEBUG_RUNTIME: &str = "webby.debug.runtime";
    pub const VIMSPECTOR_CONFIGURATION_NAME: &str = "webby.debug.vimspector.configuration.name";
    pub const NVIM_DAP_TEMPLATE: &str = "webby.debug.nvimdap.configuration.template";
    pub const TERMINAL_START_INSERT: &str = "webby.terminal.startinsert";
    pub const TRACE_SERVER: &str = "webby.trace.server";
}

/// Lua snippet handed to nvim-dap. `$exe` and `$args` are substituted at launch.
pub const DEFAULT_NVIM_DAP_TEMPLATE: &str = r#"lua require('dap').run({
  type = 'codelldb',
  request = 'launch',
  name = 'webby debug',
  program = $exe,
  args = { $args },
  cwd = vim.fn.getcwd(),
  stopOnEntry = false,
})"#;

pub(crate) fn register_schemas(settings: &mut Settings) {
    settings.register_schema(keys::SERVER_PATH, SettingSchema::string()
        .nullable()
        .with_default(Value::Null)
        .with_description("Path to a custom webby-analyzer binary"));

    settings.register_schema(keys::SERVER_EXTRA_ENV, SettingSchema::object()
        .with_default(json!({}))
        .with_description("Extra environment variables for the language server process"));

    settings.register_schema(keys::DEBUG_RUNTIME, SettingSchema::string()
        .with_default(json!("termdebug"))
        .with_enum(&["termdebug", "vimspector", "nvim-dap"])
        .with_description("Debugger integration used by the debug command"));

    settings.register_schema(keys::VIMSPECTOR_CONFIGURATION_NAME, SettingSchema::string()
        .with_default(json!("launch"))
        .with_description("Vimspector configuration to launch"));

    settings.register_schema(keys::NVIM_DAP_TEMPLATE, SettingSchema::string()
        .with_default(json!(DEFAULT_NVIM_DAP_TEMPLATE))
        .with_description("nvim-dap launch template, `$exe` and `$args` are replaced"));

    settings.register_schema(keys::TERMINAL_START_INSERT, SettingSchema::boolean()
        .with_default(json!(false))
        .with_description("Enter insert mode after opening a run terminal"));

    settings.register_schema(keys::TRACE_SERVER, SettingSchema::string()
        .with_default(json!("off"))
        .with_enum(&["off", "messages", "verbose"])
        .with_description("Trace the communication with the language server"));
}

/// Snapshot of all `webby.*` settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebbyConfig {
    pub server: ServerSettings,
    pub debug: DebugSettings,
    pub terminal: TerminalSettings,
    pub trace: TraceLevel,
}

impl WebbyConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let server = ServerSettings {
            path: settings.get::<String>(keys::SERVER_PATH).map(PathBuf::from),
            extra_env: settings.get(keys::SERVER_EXTRA_ENV).unwrap_or_default(),
        };

        let defaults = DebugSettings::default();
        let debug = DebugSettings {
            runtime: settings.get(keys::DEBUG_RUNTIME).unwrap_or(defaults.runtime),
            vimspector_configuration_name: settings
                .get(keys::VIMSPECTOR_CONFIGURATION_NAME)
                .unwrap_or(defaults.vimspector_configuration_name),
            nvim_dap_template: settings
                .get(keys::NVIM_DAP_TEMPLATE)
                .unwrap_or(defaults.nvim_dap_template),
        };

        Self {
            server,
            debug,
            terminal: TerminalSettings {
                start_insert: settings.get(keys::TERMINAL_START_INSERT).unwrap_or_default(),
            },
            trace: settings.get(keys::TRACE_SERVER).unwrap_or_default(),
        }
    }
}

/// Language server process settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerSettings {
    pub path: Option<PathBuf>,
    pub extra_env: HashMap<String, String>,
}

/// Debugger integration settings.
///
/// `runtime` is kept as the raw configured string; it is only interpreted
/// when a debug session is launched.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugSettings {
    pub runtime: String,
    pub vimspector_configuration_name: String,
    pub nvim_dap_template: String,
}

impl Default for DebugSettings {
    fn default() -> Self {
        Self {
            runtime: "termdebug".to_string(),
            vimspector_configuration_name: "launch".to_string(),
            nvim_dap_template: DEFAULT_NVIM_DAP_TEMPLATE.to_string(),
        }
    }
}

/// Run terminal settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalSettings {
    pub start_insert: bool,
}

/// LSP trace level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceLevel {
    #[default]
    Off,
    Messages,
    Verbose,
}
