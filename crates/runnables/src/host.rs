//! What the runnable commands need from the editor

use async_trait::async_trait;
use lsp_types::{Position, Url};

/// Cursor location in an open document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPosition {
    pub uri: Url,
    pub language_id: String,
    pub position: Position,
}

/// Editor services used by the run and debug commands
#[async_trait]
pub trait EditorHost: Send + Sync {
    /// Show a transient status message
    fn show_status(&self, message: &str);

    /// Let the user pick one item, `None` when cancelled
    async fn pick(&self, title: &str, items: &[String]) -> Option<usize>;

    /// Document and cursor the command was invoked from
    fn current_document(&self) -> Option<DocumentPosition>;
}
