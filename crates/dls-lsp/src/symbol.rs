//! `textDocument/definition`, `textDocument/documentSymbol`, and
//! `workspace/symbol` payloads.

use serde::{Deserialize, Serialize};

use crate::basics::{Range, TextDocumentIdentifier, TextDocumentPositionParams, Uri};
use crate::enums::SymbolKind;
use crate::progress::{PartialResultParams, WorkDoneProgressParams};

/// `textDocument/definition` shares its params shape with `textDocument/hover`.
pub type DefinitionParams = TextDocumentPositionParams;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub uri: Uri,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInformation {
    pub name: String,
    pub kind: SymbolKind,
    pub location: Location,
    #[serde(rename = "containerName", skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSymbolParams {
    #[serde(default)]
    pub query: String,
    #[serde(flatten)]
    pub work_done: WorkDoneProgressParams,
    #[serde(flatten)]
    pub partial_result: PartialResultParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSymbolParams {
    #[serde(rename = "textDocument")]
    pub text_document: TextDocumentIdentifier,
}
