pub mod basics;
pub mod configuration;
pub mod diagnostic;
pub mod enums;
pub mod lifecycle;
pub mod message;
pub mod progress;
pub mod sum_types;
pub mod symbol;
pub mod text_document;
pub mod window;

pub use basics::{
    Position, Range, TextDocumentIdentifier, TextDocumentPositionParams, Uri,
    VersionedTextDocumentIdentifier,
};
pub use configuration::{ConfigurationItem, ConfigurationParams, DidChangeConfigurationParams};
pub use diagnostic::{Diagnostic, PublishDiagnosticsParams};
pub use enums::{
    CompletionItemKind, DiagnosticSeverity, ErrorCode, MessageType, ResourceOperationKind,
    SymbolKind, TextDocumentSyncKind,
};
pub use lifecycle::{
    ClientCapabilities, InitializeParams, InitializeResult, InitializedParams, Registration,
    RegistrationParams, ServerCapabilities, TextDocumentClientCapabilities, Unregistration,
    UnregistrationParams, WorkspaceClientCapabilities,
};
pub use message::{AnyNotification, AnyRequest, AnyResponse, Message};
pub use progress::{
    CancelParams, PartialResultParams, ProgressParams, ProgressToken, WorkDoneProgressCancelParams,
    WorkDoneProgressCreateParams, WorkDoneProgressParams,
};
pub use sum_types::{
    HoverContents, InsertReplaceEdit, MarkedString, MarkupContent, MarkupKind, OneOfTextEdit,
    TextDocumentSync, TextDocumentSyncOptions, TextEdit,
};
pub use symbol::{
    DefinitionParams, DocumentSymbolParams, Location, SymbolInformation, WorkspaceSymbolParams,
};
pub use text_document::{
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DidSaveTextDocumentParams, DocumentFormattingParams, HoverParams,
    TextDocumentContentChangeEvent, TextDocumentItem,
};
pub use window::{LogMessageParams, ShowMessageParams};
