//! `initialize`/`initialized`/`shutdown`/`exit` payloads and capability
//! records.

use serde::{Deserialize, Serialize};

use crate::basics::Uri;
use crate::sum_types::TextDocumentSync;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocumentClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hover: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceClientCapabilities {
    #[serde(rename = "workspaceFolders", default)]
    pub workspace_folders: bool,
    #[serde(rename = "configuration", default)]
    pub configuration: bool,
    #[serde(rename = "didChangeConfiguration", skip_serializing_if = "Option::is_none")]
    pub did_change_configuration: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default)]
    pub workspace: WorkspaceClientCapabilities,
    #[serde(rename = "textDocument", default)]
    pub text_document: TextDocumentClientCapabilities,
    /// Whether the client declared support for `$/progress`-streamed
    /// partial results anywhere in its capability tree; multi-binding
    /// streaming behavior is gated on this (simplified from the real
    /// per-request `partialResultToken` presence check, which the Router
    /// also performs independently).
    #[serde(rename = "window", default)]
    pub window: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeParams {
    #[serde(rename = "processId")]
    pub process_id: Option<i64>,
    #[serde(rename = "rootUri")]
    pub root_uri: Option<Uri>,
    pub capabilities: ClientCapabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(rename = "textDocumentSync", skip_serializing_if = "Option::is_none")]
    pub text_document_sync: Option<TextDocumentSync>,
    #[serde(rename = "hoverProvider", default)]
    pub hover_provider: bool,
    #[serde(rename = "definitionProvider", default)]
    pub definition_provider: bool,
    #[serde(rename = "documentSymbolProvider", default)]
    pub document_symbol_provider: bool,
    #[serde(rename = "workspaceSymbolProvider", default)]
    pub workspace_symbol_provider: bool,
    #[serde(rename = "documentFormattingProvider", default)]
    pub document_formatting_provider: bool,
    #[serde(rename = "completionProvider", skip_serializing_if = "Option::is_none")]
    pub completion_provider: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeResult {
    pub capabilities: ServerCapabilities,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializedParams {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub id: String,
    pub method: String,
    #[serde(rename = "registerOptions", skip_serializing_if = "Option::is_none")]
    pub register_options: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationParams {
    pub registrations: Vec<Registration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unregistration {
    pub id: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregistrationParams {
    pub unregisterations: Vec<Unregistration>,
}
