//! LSP client - communicates with the language server

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use lsp_types::notification::Notification as _;
use lsp_types::request::Request as _;
use lsp_types::*;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use settings::TraceLevel;

use crate::error::{LspError, Result};
use crate::ext;
use crate::process::ServerProcess;
use crate::transport::{self, Message, ResponseError, Transport};
use crate::{LspEvent, ServerConfig, ServerState};

type ResponseSender = oneshot::Sender<std::result::Result<Value, ResponseError>>;

/// Requests awaiting a response. Once closed, no new request is accepted.
#[derive(Default)]
struct Pending {
    closed: bool,
    senders: HashMap<i64, ResponseSender>,
}

impl Pending {
    fn register(&mut self, id: i64, tx: ResponseSender) -> Result<()> {
        if self.closed {
            return Err(LspError::NotRunning);
        }
        self.senders.insert(id, tx);
        Ok(())
    }

    /// Dropping the senders fails every outstanding request.
    fn close(&mut self) {
        self.closed = true;
        self.senders.clear();
    }
}

/// LSP client for the language server
pub struct LspClient {
    /// Configuration
    config: ServerConfig,
    /// Server process
    process: Option<ServerProcess>,
    /// Write side of the connection
    transport: Option<Arc<Transport>>,
    /// Current state
    state: Arc<RwLock<ServerState>>,
    /// Request ID counter
    next_id: AtomicI64,
    /// Requests awaiting a response
    pending: Arc<Mutex<Pending>>,
    /// Event sender
    event_tx: mpsc::UnboundedSender<LspEvent>,
    /// Background readers (stdout dispatch, stderr log)
    tasks: Vec<JoinHandle<()>>,
}

impl LspClient {
    /// Create new client
    pub fn new(config: ServerConfig, event_tx: mpsc::UnboundedSender<LspEvent>) -> Self {
        Self {
            config,
            process: None,
            transport: None,
            state: Arc::new(RwLock::new(ServerState::Stopped)),
            next_id: AtomicI64::new(1),
            pending: Arc::default(),
            event_tx,
            tasks: Vec::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Start the language server rooted at `root_path`
    pub async fn start(&mut self, root_path: &Path) -> Result<()> {
        *self.state.write() = ServerState::Starting;
        self.pending = Arc::default();

        let mut process = match ServerProcess::spawn(&self.config, root_path) {
            Ok(process) => process,
            Err(err) => {
                *self.state.write() = ServerState::Failed;
                return Err(err);
            }
        };
        let stdin = process.take_stdin().ok_or(LspError::NotRunning)?;
        let stdout = process.take_stdout().ok_or(LspError::NotRunning)?;
        let transport = Arc::new(Transport::new(stdin));

        self.tasks.push(tokio::spawn(dispatch_loop(
            BufReader::new(stdout),
            Arc::clone(&transport),
            Arc::clone(&self.pending),
            Arc::clone(&self.state),
            self.event_tx.clone(),
            self.config.name.clone(),
            self.config.trace,
        )));

        if let Some(stderr) = process.take_stderr() {
            let name = self.config.name.clone();
            self.tasks.push(tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!("[{}] {}", name, line);
                }
            }));
        }

        self.process = Some(process);
        self.transport = Some(transport);

        let root_uri = Url::from_file_path(root_path).ok();
        if let Err(err) = self.initialize(root_uri).await {
            *self.state.write() = ServerState::Failed;
            return Err(err);
        }

        mark_running(&self.state)?;
        self.event_tx.send(LspEvent::ServerStarted {
            name: self.config.name.clone(),
        }).ok();

        Ok(())
    }

    /// Stop the language server
    pub async fn stop(&mut self) -> Result<()> {
        *self.state.write() = ServerState::ShuttingDown;

        if self.transport.is_some() {
            if let Err(err) = self.request::<request::Shutdown>(()).await {
                tracing::debug!("Shutdown request failed: {}", err);
            }
            self.notify::<notification::Exit>(()).await.ok();
        }

        if let Some(mut process) = self.process.take() {
            if matches!(process.try_wait(), Ok(None)) {
                process.kill().await.ok();
            }
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.transport = None;

        *self.state.write() = ServerState::Stopped;
        self.event_tx.send(LspEvent::ServerStopped {
            name: self.config.name.clone(),
        }).ok();

        Ok(())
    }

    async fn initialize(&self, root_uri: Option<Url>) -> Result<()> {
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_uri,
            capabilities: client_capabilities(),
            initialization_options: self.config.initialization_options.clone(),
            trace: Some(match self.config.trace {
                TraceLevel::Off => TraceValue::Off,
                TraceLevel::Messages => TraceValue::Messages,
                TraceLevel::Verbose => TraceValue::Verbose,
            }),
            client_info: Some(ClientInfo {
                name: "webby".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..Default::default()
        };

        let result: InitializeResult = self.request::<request::Initialize>(params).await?;
        if let Some(info) = &result.server_info {
            let version = info.version.as_deref().unwrap_or("(unknown version)");
            tracing::info!("Connected to {} {}", info.name, version);
        }
        tracing::trace!("Server capabilities: {:?}", result.capabilities);

        self.notify::<notification::Initialized>(InitializedParams {}).await
    }

    /// Send a request and wait for its response
    pub async fn request<R: request::Request>(&self, params: R::Params) -> Result<R::Result>
    where
        R::Params: serde::Serialize,
        R::Result: serde::de::DeserializeOwned,
    {
        let transport = self.transport.as_ref().ok_or(LspError::NotRunning)?;

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().register(id, tx)?;

        tracing::debug!("--> {} #{}", R::METHOD, id);
        let params = serde_json::to_value(params)?;
        if let Err(err) = transport.send_request(id, R::METHOD, params).await {
            self.pending.lock().senders.remove(&id);
            return Err(err);
        }

        let response = rx.await.map_err(|_| LspError::Cancelled(R::METHOD.to_string()))?;
        let value = response.map_err(|e| LspError::Server {
            code: e.code,
            message: e.message,
        })?;

        Ok(serde_json::from_value(value)?)
    }

    /// Send a notification
    pub async fn notify<N: notification::Notification>(&self, params: N::Params) -> Result<()>
    where
        N::Params: serde::Serialize,
    {
        let transport = self.transport.as_ref().ok_or(LspError::NotRunning)?;
        transport.send_notification(N::METHOD, serde_json::to_value(params)?).await
    }

    /// Notify document opened
    pub async fn did_open(&self, uri: Url, version: i32, text: String) -> Result<()> {
        self.notify::<notification::DidOpenTextDocument>(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri,
                language_id: self.config.language_id.clone(),
                version,
                text,
            },
        }).await
    }

    /// Syntax tree of a document
    pub async fn syntax_tree(&self, uri: Url, range: Option<Range>) -> Result<String> {
        self.request::<ext::SyntaxTree>(ext::SyntaxTreeParams {
            text_document: TextDocumentIdentifier { uri },
            range,
        }).await
    }

    /// Structural search and replace
    pub async fn ssr(&self, params: ext::SsrParams) -> Result<WorkspaceEdit> {
        self.request::<ext::Ssr>(params).await
    }

    /// Package graph in `dot` format
    pub async fn view_package_graph(&self, full: bool) -> Result<String> {
        self.request::<ext::ViewPackageGraph>(ext::ViewPackageGraphParams { full }).await
    }

    pub async fn matching_brace(
        &self,
        uri: Url,
        positions: Vec<Position>,
    ) -> Result<Vec<Position>> {
        self.request::<ext::MatchingBrace>(ext::MatchingBraceParams {
            text_document: TextDocumentIdentifier { uri },
            positions,
        }).await
    }

    pub async fn join_lines(&self, uri: Url, ranges: Vec<Range>) -> Result<Vec<TextEdit>> {
        self.request::<ext::JoinLines>(ext::JoinLinesParams {
            text_document: TextDocumentIdentifier { uri },
            ranges,
        }).await
    }

    pub async fn reload_workspace(&self) -> Result<()> {
        self.request::<ext::ReloadWorkspace>(()).await
    }

    /// Get current state
    pub fn state(&self) -> ServerState {
        *self.state.read()
    }
}

/// Only a server still starting becomes running; a crash during
/// initialization leaves it failed.
fn mark_running(state: &RwLock<ServerState>) -> Result<()> {
    let mut state = state.write();
    if *state != ServerState::Starting {
        return Err(LspError::NotRunning);
    }
    *state = ServerState::Running;
    Ok(())
}

fn client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        text_document: Some(TextDocumentClientCapabilities {
            hover: Some(HoverClientCapabilities {
                content_format: Some(vec![MarkupKind::Markdown, MarkupKind::PlainText]),
                ..Default::default()
            }),
            publish_diagnostics: Some(PublishDiagnosticsClientCapabilities {
                related_information: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }),
        window: Some(WindowClientCapabilities {
            work_done_progress: Some(true),
            ..Default::default()
        }),
        experimental: Some(serde_json::json!({
            "serverStatusNotification": true,
            "ssr": true,
        })),
        ..Default::default()
    }
}

/// Read messages from the server until it closes stdout.
async fn dispatch_loop<R>(
    mut reader: R,
    transport: Arc<Transport>,
    pending: Arc<Mutex<Pending>>,
    state: Arc<RwLock<ServerState>>,
    event_tx: mpsc::UnboundedSender<LspEvent>,
    name: String,
    trace: TraceLevel,
) where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let exit_reason = loop {
        let value = match transport::read_message(&mut reader).await {
            Ok(Some(value)) => value,
            Ok(None) => break "server closed its output".to_string(),
            Err(err) => break err.to_string(),
        };

        match trace {
            TraceLevel::Off => {}
            TraceLevel::Messages => tracing::debug!("<-- {}", summarize(&value)),
            TraceLevel::Verbose => tracing::debug!("<-- {}", value),
        }

        let message = match Message::parse(value) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!("Ignoring message from {}: {}", name, err);
                continue;
            }
        };

        match message {
            Message::Response(response) => {
                let Some(tx) = pending.lock().senders.remove(&response.id) else {
                    tracing::debug!("Response for unknown request #{}", response.id);
                    continue;
                };
                let result = match response.error {
                    Some(error) => Err(error),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };
                tx.send(result).ok();
            }
            Message::Notification(notification) => {
                if let Some(event) = notification_event(&notification.method, notification.params) {
                    event_tx.send(event).ok();
                }
            }
            Message::Request(request) => {
                let result = server_request_result(&request.method, &request.params);
                if let Err(err) = transport.send_response(request.id, result).await {
                    tracing::warn!("Failed to answer {}: {}", request.method, err);
                }
            }
        }
    };

    pending.lock().close();

    let expected = matches!(*state.read(), ServerState::ShuttingDown | ServerState::Stopped);
    if !expected {
        *state.write() = ServerState::Failed;
        tracing::error!("{} exited: {}", name, exit_reason);
        event_tx.send(LspEvent::ServerCrashed { name, error: exit_reason }).ok();
    }
}

fn summarize(value: &Value) -> String {
    match (value.get("method").and_then(Value::as_str), value.get("id")) {
        (Some(method), Some(id)) => format!("request {} #{}", method, id),
        (Some(method), None) => format!("notification {}", method),
        (None, Some(id)) => format!("response #{}", id),
        (None, None) => "unknown".to_string(),
    }
}

fn notification_event(method: &str, params: Value) -> Option<LspEvent> {
    let event = match method {
        m if m == notification::PublishDiagnostics::METHOD => {
            let params: PublishDiagnosticsParams = serde_json::from_value(params).ok()?;
            LspEvent::DiagnosticsPublished {
                uri: params.uri,
                diagnostics: params.diagnostics,
            }
        }
        m if m == notification::Progress::METHOD => {
            LspEvent::Progress(serde_json::from_value(params).ok()?)
        }
        m if m == notification::LogMessage::METHOD => {
            let params: LogMessageParams = serde_json::from_value(params).ok()?;
            LspEvent::LogMessage { level: params.typ, message: params.message }
        }
        m if m == notification::ShowMessage::METHOD => {
            let params: ShowMessageParams = serde_json::from_value(params).ok()?;
            LspEvent::ShowMessage { level: params.typ, message: params.message }
        }
        m if m == ext::ServerStatusNotification::METHOD => {
            LspEvent::ServerStatus(serde_json::from_value(params).ok()?)
        }
        _ => {
            tracing::trace!("Unhandled notification {}", method);
            return None;
        }
    };
    Some(event)
}

/// The client keeps no configuration of its own for the server.
fn server_request_result(method: &str, params: &Value) -> Value {
    match method {
        m if m == request::WorkspaceConfiguration::METHOD => {
            let items = params["items"].as_array().map_or(0, Vec::len);
            Value::Array(vec![Value::Null; items])
        }
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn framed(values: &[Value]) -> Vec<u8> {
        values
            .iter()
            .map(|v| transport::format_message(v).unwrap())
            .collect::<String>()
            .into_bytes()
    }

    #[tokio::test]
    async fn test_dispatch_routes_responses_and_events() {
        let pending: Arc<Mutex<Pending>> = Arc::default();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        pending.lock().register(1, tx1).unwrap();
        pending.lock().register(2, tx2).unwrap();

        let input = framed(&[
            json!({"jsonrpc": "2.0", "method": "experimental/serverStatus",
                   "params": {"health": "ok", "quiescent": true}}),
            json!({"jsonrpc": "2.0", "id": 2,
                   "error": {"code": -32601, "message": "unknown method"}}),
            json!({"jsonrpc": "2.0", "id": 1, "result": ["a"]}),
        ]);

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(ServerState::Running));
        let (writer, _server_side) = tokio::io::duplex(4096);

        dispatch_loop(
            &input[..],
            Arc::new(Transport::new(writer)),
            Arc::clone(&pending),
            Arc::clone(&state),
            event_tx,
            "webby-analyzer".to_string(),
            TraceLevel::Messages,
        ).await;

        assert_eq!(rx1.await.unwrap().unwrap(), json!(["a"]));
        assert_eq!(rx2.await.unwrap().unwrap_err().code, -32601);

        match event_rx.recv().await.unwrap() {
            LspEvent::ServerStatus(status) => assert!(status.quiescent),
            other => panic!("unexpected event: {other:?}"),
        }
        // End of stream while running counts as a crash.
        assert!(matches!(event_rx.recv().await.unwrap(), LspEvent::ServerCrashed { .. }));
        assert_eq!(*state.read(), ServerState::Failed);
    }

    #[tokio::test]
    async fn test_dispatch_answers_configuration_requests() {
        let input = framed(&[json!({
            "jsonrpc": "2.0", "id": "cfg-1", "method": "workspace/configuration",
            "params": {"items": [{"section": "webby"}, {"section": "webby.server"}]}
        })]);

        let (writer, server_side) = tokio::io::duplex(4096);
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Transport::new(writer));

        dispatch_loop(
            &input[..],
            Arc::clone(&transport),
            Arc::default(),
            Arc::new(RwLock::new(ServerState::ShuttingDown)),
            event_tx,
            "webby-analyzer".to_string(),
            TraceLevel::Off,
        ).await;
        drop(transport);

        let mut reader = BufReader::new(server_side);
        let reply = transport::read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(reply["id"], "cfg-1");
        assert_eq!(reply["result"], json!([null, null]));
    }

    #[tokio::test]
    async fn test_request_without_server() {
        let (event_tx, _event_rx) = mpsc::unbounded_channel();
        let config = ServerConfig::webby_analyzer("webby-analyzer".into());
        let client = LspClient::new(config, event_tx);
        let err = client.reload_workspace().await.unwrap_err();
        assert!(matches!(err, LspError::NotRunning));
        assert_eq!(client.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_request_after_server_exit_fails() {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let config = ServerConfig::webby_analyzer("webby-analyzer".into());
        let mut client = LspClient::new(config, event_tx.clone());
        *client.state.write() = ServerState::Starting;
        let (writer, _server_side) = tokio::io::duplex(4096);
        let transport = Arc::new(Transport::new(writer));
        client.transport = Some(Arc::clone(&transport));

        let empty: &[u8] = &[];
        dispatch_loop(
            empty,
            transport,
            Arc::clone(&client.pending),
            Arc::clone(&client.state),
            event_tx,
            "webby-analyzer".to_string(),
            TraceLevel::Off,
        ).await;
        assert!(matches!(event_rx.recv().await.unwrap(), LspEvent::ServerCrashed { .. }));

        let err = tokio::time::timeout(std::time::Duration::from_secs(5), client.reload_workspace())
            .await
            .expect("request must not hang after the server exits")
            .unwrap_err();
        assert!(matches!(err, LspError::NotRunning));
        assert!(client.pending.lock().senders.is_empty());
    }

    #[test]
    fn test_failed_start_is_not_marked_running() {
        let state = RwLock::new(ServerState::Failed);
        assert!(matches!(mark_running(&state), Err(LspError::NotRunning)));
        assert_eq!(*state.read(), ServerState::Failed);

        let state = RwLock::new(ServerState::Starting);
        mark_running(&state).unwrap();
        assert_eq!(*state.read(), ServerState::Running);
    }
}
