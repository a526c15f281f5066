//! webby-analyzer protocol extensions.
//!
//! These requests are forwarded to the server unchanged; the editor only
//! renders or applies whatever comes back.

use lsp_types::notification::Notification;
use lsp_types::request::Request;
use lsp_types::{Position, Range, TextDocumentIdentifier, TextEdit, WorkspaceEdit};
use serde::{Deserialize, Serialize};

/// Textual dump of the syntax tree for a document or a range of it
pub enum SyntaxTree {}

impl Request for SyntaxTree {
    type Params = SyntaxTreeParams;
    type Result = String;
    const METHOD: &'static str = "webby-analyzer/syntaxTree";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyntaxTreeParams {
    pub text_document: TextDocumentIdentifier,
    pub range: Option<Range>,
}

/// Structural search and replace
pub enum Ssr {}

impl Request for Ssr {
    type Params = SsrParams;
    type Result = WorkspaceEdit;
    const METHOD: &'static str = "experimental/ssr";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrParams {
    /// `search ==>> replacement`
    pub query: String,
    /// Only validate the query
    pub parse_only: bool,
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
    pub selections: Vec<Range>,
}

/// Package dependency graph rendered as GraphViz `dot`
pub enum ViewPackageGraph {}

impl Request for ViewPackageGraph {
    type Params = ViewPackageGraphParams;
    type Result = String;
    const METHOD: &'static str = "webby-analyzer/viewPackageGraph";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewPackageGraphParams {
    /// Include dependencies outside the workspace
    pub full: bool,
}

pub enum MatchingBrace {}

impl Request for MatchingBrace {
    type Params = MatchingBraceParams;
    type Result = Vec<Position>;
    const METHOD: &'static str = "experimental/matchingBrace";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingBraceParams {
    pub text_document: TextDocumentIdentifier,
    pub positions: Vec<Position>,
}

pub enum JoinLines {}

impl Request for JoinLines {
    type Params = JoinLinesParams;
    type Result = Vec<TextEdit>;
    const METHOD: &'static str = "experimental/joinLines";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinLinesParams {
    pub text_document: TextDocumentIdentifier,
    pub ranges: Vec<Range>,
}

/// Ask the server to reload the project model
pub enum ReloadWorkspace {}

impl Request for ReloadWorkspace {
    type Params = ();
    type Result = ();
    const METHOD: &'static str = "webby-analyzer/reloadWorkspace";
}

/// Server health report
pub enum ServerStatusNotification {}

impl Notification for ServerStatusNotification {
    type Params = ServerStatusParams;
    const METHOD: &'static str = "experimental/serverStatus";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusParams {
    pub health: Health,
    /// No background work is pending
    pub quiescent: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Ok,
    Warning,
    Error,
}
