//! Fetching runnables from the language server

use async_trait::async_trait;
use lsp::{LANGUAGE_ID, LspClient};
use lsp_types::request::Request;
use lsp_types::{Position, TextDocumentIdentifier};
use serde::{Deserialize, Serialize};

use crate::host::{DocumentPosition, EditorHost};
use crate::{Result, Runnable};

pub enum RunnablesRequest {}

impl Request for RunnablesRequest {
    type Params = RunnablesParams;
    type Result = Vec<Runnable>;
    const METHOD: &'static str = "experimental/runnables";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnablesParams {
    pub text_document: TextDocumentIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

/// Anything that can answer a runnables request
#[async_trait]
pub trait RunnableSource: Send + Sync {
    async fn runnables(&self, params: RunnablesParams) -> Result<Vec<Runnable>>;
}

#[async_trait]
impl RunnableSource for LspClient {
    async fn runnables(&self, params: RunnablesParams) -> Result<Vec<Runnable>> {
        Ok(self.request::<RunnablesRequest>(params).await?)
    }
}

/// Runnables at `document`. Documents of another language yield nothing.
pub async fn fetch_runnables(
    source: &dyn RunnableSource,
    host: &dyn EditorHost,
    document: &DocumentPosition,
) -> Result<Vec<Runnable>> {
    if document.language_id != LANGUAGE_ID {
        tracing::debug!("Not a {} document: {}", LANGUAGE_ID, document.uri);
        return Ok(Vec::new());
    }

    host.show_status("Fetching runnables...");
    let params = RunnablesParams {
        text_document: TextDocumentIdentifier::new(document.uri.clone()),
        position: Some(document.position),
    };
    source.runnables(params).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{RunnableKind, ShellArgs};
    use lsp_types::Url;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    /// Source returning a fixed list and recording the requests it gets
    #[derive(Default)]
    pub(crate) struct FakeSource {
        pub runnables: Vec<Runnable>,
        pub requests: Mutex<Vec<RunnablesParams>>,
    }

    #[async_trait]
    impl RunnableSource for FakeSource {
        async fn runnables(&self, params: RunnablesParams) -> Result<Vec<Runnable>> {
            self.requests.lock().push(params);
            Ok(self.runnables.clone())
        }
    }

    /// Host with scripted picker answers and a status log
    #[derive(Default)]
    pub(crate) struct FakeHost {
        pub choice: Option<usize>,
        pub document: Option<DocumentPosition>,
        pub statuses: Mutex<Vec<String>>,
        pub picks: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl EditorHost for FakeHost {
        fn show_status(&self, message: &str) {
            self.statuses.lock().push(message.to_string());
        }

        async fn pick(&self, _title: &str, items: &[String]) -> Option<usize> {
            self.picks.lock().push(items.to_vec());
            self.choice
        }

        fn current_document(&self) -> Option<DocumentPosition> {
            self.document.clone()
        }
    }

    pub(crate) fn document(language_id: &str) -> DocumentPosition {
        DocumentPosition {
            uri: Url::parse("file:///ws/src/main.wby").unwrap(),
            language_id: language_id.to_string(),
            position: Position::new(3, 4),
        }
    }

    pub(crate) fn shell_runnable(label: &str) -> Runnable {
        Runnable {
            label: label.to_string(),
            location: None,
            kind: RunnableKind::Shell(ShellArgs {
                program: "true".to_string(),
                args: Vec::new(),
                environment: None,
                cwd: PathBuf::from("/"),
            }),
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_position() {
        let source = FakeSource {
            runnables: vec![shell_runnable("run a")],
            ..Default::default()
        };
        let host = FakeHost::default();

        let runnables = fetch_runnables(&source, &host, &document("webby")).await.unwrap();
        assert_eq!(runnables.len(), 1);
        assert_eq!(*host.statuses.lock(), vec!["Fetching runnables...".to_string()]);

        let requests = source.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].position, Some(Position::new(3, 4)));
        assert_eq!(requests[0].text_document.uri.path(), "/ws/src/main.wby");
    }

    #[tokio::test]
    async fn test_other_language_is_silent() {
        let source = FakeSource::default();
        let host = FakeHost::default();

        let runnables = fetch_runnables(&source, &host, &document("rust")).await.unwrap();
        assert!(runnables.is_empty());
        assert!(source.requests.lock().is_empty());
        assert!(host.statuses.lock().is_empty());
    }

    #[test]
    fn test_params_wire_shape() {
        let params = RunnablesParams {
            text_document: TextDocumentIdentifier::new(Url::parse("file:///a.wby").unwrap()),
            position: None,
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value, serde_json::json!({ "textDocument": { "uri": "file:///a.wby" } }));
    }
}
