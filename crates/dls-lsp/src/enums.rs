//! LSP v3.16 enumerations. Numeric enums decode from integers via
//! `serde_repr`; string enums decode from strings via ordinary `serde`
//! derive.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// LSP-defined JSON-RPC error codes, plus the two server-specific values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum ErrorCode {
    ParseError = -32700,
    InvalidRequest = -32600,
    MethodNotFound = -32601,
    InvalidParams = -32602,
    InternalError = -32603,
    ServerNotInitialized = -32002,
    UnknownErrorCode = -32001,
    RequestCancelled = -32800,
    ContentModified = -32801,
}

impl From<ErrorCode> for i64 {
    fn from(value: ErrorCode) -> Self {
        value as i32 as i64
    }
}

/// `window/logMessage` and `window/showMessage` severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum MessageType {
    Error = 1,
    Warning = 2,
    Info = 3,
    Log = 4,
}

/// `textDocument/publishDiagnostics` severities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

/// How the server wants to be notified of text document changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum TextDocumentSyncKind {
    None = 0,
    Full = 1,
    Incremental = 2,
}

/// `textDocument/completion` item kinds (subset sufficient to exercise the
/// schema's numeric-enum decoding; the D-specific completion backend is
/// out of scope here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum CompletionItemKind {
    Text = 1,
    Method = 2,
    Function = 3,
    Constructor = 4,
    Field = 5,
    Variable = 6,
    Class = 7,
    Module = 9,
    Keyword = 14,
}

/// `textDocument/documentSymbol` and `workspace/symbol` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(i32)]
pub enum SymbolKind {
    File = 1,
    Module = 2,
    Namespace = 3,
    Class = 5,
    Method = 6,
    Function = 12,
    Variable = 13,
    Struct = 23,
    Enum = 10,
    Interface = 11,
}

/// Resource operation capabilities a client may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceOperationKind {
    Create,
    Rename,
    Delete,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_enum_decodes_from_integer() {
        let v: TextDocumentSyncKind = serde_json::from_str("2").unwrap();
        assert_eq!(v, TextDocumentSyncKind::Incremental);
    }

    #[test]
    fn string_enum_decodes_from_string() {
        let v: ResourceOperationKind = serde_json::from_str(r#""rename""#).unwrap();
        assert_eq!(v, ResourceOperationKind::Rename);
    }

    #[test]
    fn error_code_server_specific_values() {
        assert_eq!(i64::from(ErrorCode::ServerNotInitialized), -32002);
        assert_eq!(i64::from(ErrorCode::UnknownErrorCode), -32001);
    }
}
