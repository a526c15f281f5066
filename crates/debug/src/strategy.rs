//! Launch strategies, one per debug runtime

use async_trait::async_trait;
use serde_json::json;
use settings::DebugSettings;

use crate::{DebugHost, DebugRuntime, DebugTarget, Result};

/// How a resolved target is handed to a debugger
#[async_trait]
pub trait LaunchStrategy: Send + Sync {
    fn runtime(&self) -> DebugRuntime;

    async fn launch(&self, host: &dyn DebugHost, target: &DebugTarget) -> Result<()>;
}

/// Vim's built-in termdebug plugin
pub struct Termdebug;

#[async_trait]
impl LaunchStrategy for Termdebug {
    fn runtime(&self) -> DebugRuntime {
        DebugRuntime::Termdebug
    }

    async fn launch(&self, host: &dyn DebugHost, target: &DebugTarget) -> Result<()> {
        host.command(&format!("TermdebugCommand {} {}", target.executable, target.args)).await
    }
}

/// vimspector, through a named launch configuration
pub struct Vimspector {
    pub configuration: String,
}

#[async_trait]
impl LaunchStrategy for Vimspector {
    fn runtime(&self) -> DebugRuntime {
        DebugRuntime::Vimspector
    }

    async fn launch(&self, host: &dyn DebugHost, target: &DebugTarget) -> Result<()> {
        let settings = json!({
            "configuration": self.configuration,
            "Executable": target.executable,
            "Args": target.args,
        });
        host.call_function("vimspector#LaunchWithSettings", vec![settings]).await
    }
}

/// nvim-dap, through a user-provided command template
pub struct NvimDap {
    pub template: String,
}

#[async_trait]
impl LaunchStrategy for NvimDap {
    fn runtime(&self) -> DebugRuntime {
        DebugRuntime::NvimDap
    }

    async fn launch(&self, host: &dyn DebugHost, target: &DebugTarget) -> Result<()> {
        host.command(&render_nvim_dap(&self.template, target)).await
    }
}

/// Substitute `$exe` with the quoted executable and `$args` with the quoted,
/// comma separated argument list.
///
/// The template is scanned once, so placeholders inside substituted values
/// are left alone.
pub fn render_nvim_dap(template: &str, target: &DebugTarget) -> String {
    let exe = format!("\"{}\"", target.executable);
    let args = target
        .args
        .split_whitespace()
        .map(|arg| format!("\"{}\"", arg))
        .collect::<Vec<_>>()
        .join(",");

    let mut rendered = String::with_capacity(template.len() + exe.len() + args.len());
    let mut rest = template;
    while let Some(start) = rest.find('$') {
        rendered.push_str(&rest[..start]);
        let tail = &rest[start..];
        rest = if let Some(after) = tail.strip_prefix("$exe") {
            rendered.push_str(&exe);
            after
        } else if let Some(after) = tail.strip_prefix("$args") {
            rendered.push_str(&args);
            after
        } else {
            rendered.push('$');
            &tail[1..]
        };
    }
    rendered.push_str(rest);
    rendered
}

/// The configured debugger.
///
/// The runtime name is validated on construction so a bad value is reported
/// before any build is started.
pub struct Debugger {
    strategy: Box<dyn LaunchStrategy>,
}

impl Debugger {
    pub fn from_settings(settings: &DebugSettings) -> Result<Self> {
        let runtime: DebugRuntime = settings.runtime.parse()?;
        let strategy: Box<dyn LaunchStrategy> = match runtime {
            DebugRuntime::Termdebug => Box::new(Termdebug),
            DebugRuntime::Vimspector => Box::new(Vimspector {
                configuration: settings.vimspector_configuration_name.clone(),
            }),
            DebugRuntime::NvimDap => Box::new(NvimDap {
                template: settings.nvim_dap_template.clone(),
            }),
        };
        Ok(Self { strategy })
    }

    pub fn runtime(&self) -> DebugRuntime {
        self.strategy.runtime()
    }

    pub async fn launch(&self, host: &dyn DebugHost, target: &DebugTarget) -> Result<()> {
        tracing::info!("Launching {} under {}", target.executable, self.runtime());
        self.strategy.launch(host, target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DebugError;
    use parking_lot::Mutex;
    use serde_json::Value;

    #[derive(Debug, PartialEq)]
    enum Call {
        Command(String),
        Function(String, Vec<Value>),
    }

    #[derive(Default)]
    struct RecordingHost {
        calls: Mutex<Vec<Call>>,
    }

    #[async_trait]
    impl DebugHost for RecordingHost {
        async fn command(&self, command: &str) -> Result<()> {
            self.calls.lock().push(Call::Command(command.to_string()));
            Ok(())
        }

        async fn call_function(&self, name: &str, args: Vec<Value>) -> Result<()> {
            self.calls.lock().push(Call::Function(name.to_string(), args));
            Ok(())
        }
    }

    fn settings(runtime: &str) -> DebugSettings {
        DebugSettings {
            runtime: runtime.to_string(),
            vimspector_configuration_name: "webby".to_string(),
            nvim_dap_template: "lua dap_run($exe, { $args })".to_string(),
        }
    }

    #[tokio::test]
    async fn test_termdebug() {
        let host = RecordingHost::default();
        let debugger = Debugger::from_settings(&settings("termdebug")).unwrap();
        debugger.launch(&host, &DebugTarget::new("/t/app", "a b")).await.unwrap();

        assert_eq!(
            *host.calls.lock(),
            vec![Call::Command("TermdebugCommand /t/app a b".to_string())]
        );
    }

    #[tokio::test]
    async fn test_vimspector() {
        let host = RecordingHost::default();
        let debugger = Debugger::from_settings(&settings("vimspector")).unwrap();
        debugger.launch(&host, &DebugTarget::new("/t/app", "--x 1")).await.unwrap();

        assert_eq!(
            *host.calls.lock(),
            vec![Call::Function(
                "vimspector#LaunchWithSettings".to_string(),
                vec![json!({ "configuration": "webby", "Executable": "/t/app", "Args": "--x 1" })],
            )]
        );
    }

    #[tokio::test]
    async fn test_nvim_dap() {
        let host = RecordingHost::default();
        let debugger = Debugger::from_settings(&settings("nvim-dap")).unwrap();
        assert_eq!(debugger.runtime(), DebugRuntime::NvimDap);
        debugger.launch(&host, &DebugTarget::new("/t/app", " a  b ")).await.unwrap();

        assert_eq!(
            *host.calls.lock(),
            vec![Call::Command(r#"lua dap_run("/t/app", { "a","b" })"#.to_string())]
        );
    }

    #[test]
    fn test_render_nvim_dap_without_args() {
        let rendered = render_nvim_dap("$exe|$args", &DebugTarget::new("/t/app", ""));
        assert_eq!(rendered, r#""/t/app"|"#);
    }

    #[test]
    fn test_render_nvim_dap_leaves_substituted_text_alone() {
        let target = DebugTarget::new("/tmp/$args/app", "$exe x");
        let rendered = render_nvim_dap("dap_run($exe, { $args }) -- $HOME", &target);
        assert_eq!(rendered, r#"dap_run("/tmp/$args/app", { "$exe","x" }) -- $HOME"#);
    }

    #[test]
    fn test_invalid_runtime_rejected_up_front() {
        let err = Debugger::from_settings(&settings("lldb")).err().unwrap();
        assert!(matches!(err, DebugError::InvalidRuntime(_)));
        assert_eq!(err.to_string(), "invalid debug runtime");
    }
}
