//! The request/notification loop that ties the wire framer (`dls-rpc`),
//! the parsed [`dls_lsp::message::Message`] envelope, the lifecycle state
//! machine, the cancellation registry, and the router together.
//!
//! Requests are never awaited inline here: each one is spawned as its own
//! task on the server's [`dls_worker::Scheduler`], so the read loop keeps
//! draining frames off the wire (and can observe a `$/cancelRequest` for
//! request A) while request B's handler is still suspended. A handler's
//! reply — and any `$/progress` notification it emits along the way —
//! goes out over an [`crate::router::OutboundSender`] rather than being
//! returned, since by the time it's ready the loop that read the request
//! may already be several frames further along.

use bytes::Bytes;
use dls_lsp::lifecycle::{InitializeParams, InitializeResult, InitializedParams, ServerCapabilities};
use dls_lsp::message::Message;
use dls_lsp::progress::{CancelParams, PartialResultParams, WorkDoneProgressCancelParams};
use dls_lsp::sum_types::TextDocumentSync;
use dls_rpc::{error_code, RequestId, ResponseError};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::handle::ServerHandle;
use crate::lifecycle::LifecycleError;
use crate::router::{self, OutboundMessage, OutboundSender};

/// Read and process exactly one frame from `input`. Notifications are
/// handled inline (they're expected to be quick, and must observe
/// document-sync mutations in wire order); requests are spawned onto the
/// scheduler and reply through `outbound` once their handler resolves.
pub async fn process_one(
    server: &ServerHandle,
    input: &mut (impl AsyncBufRead + Unpin),
    outbound: &OutboundSender,
) -> Result<(), dls_rpc::TransportError> {
    let body = dls_rpc::read_frame(input).await?;
    let body = Bytes::from(body);

    let envelope = match dls_rpc::parse_envelope(body) {
        Ok(envelope) => envelope,
        Err(err) => {
            tracing::warn!(error = %err, "dropping unparseable message");
            return Ok(());
        }
    };

    match Message::from(envelope) {
        Message::Request(req) => {
            spawn_request(server, req.method, req.id, req.params, outbound.clone());
        }
        Message::Notification(note) => {
            handle_notification(server, note.method, note.params).await;
        }
        // This server never issues its own outbound requests in the
        // current scope (no `client/registerCapability` round trip yet),
        // so an inbound `Response` frame has nothing to correlate to.
        Message::Response(_) => {}
    }
    Ok(())
}

/// Spawn `id`'s handler as its own scheduler task, registering it with
/// the cancellation registry *before* returning — so a `$/cancelRequest`
/// read immediately after this call can never race ahead of it.
fn spawn_request(
    server: &ServerHandle,
    method: String,
    id: RequestId,
    params: dls_rpc::RawParams,
    outbound: OutboundSender,
) {
    let ctx = server.context();
    let reply_id = id.clone();
    let registry_id = id.clone();

    let task_id = server.scheduler().spawn_local(move |cancel| async move {
        let Ok(server) = ctx.upgrade() else {
            return;
        };
        let outcome = handle_request(&server, method, params, cancel, outbound.clone()).await;
        server.cancellation().borrow_mut().end(&id);
        let _ = outbound.send(OutboundMessage::Reply(reply_id, outcome));
    });

    server.cancellation().borrow_mut().begin(registry_id, task_id);
}

pub async fn write_message(
    output: &mut (impl AsyncWrite + Unpin),
    message: OutboundMessage,
) -> Result<(), dls_rpc::TransportError> {
    let body = match message {
        OutboundMessage::Reply(id, Ok(result)) => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": result,
        }),
        OutboundMessage::Reply(id, Err(error)) => serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": error,
        }),
        OutboundMessage::Notification(method, params) => serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
        }),
    };
    let payload = serde_json::to_vec(&body).expect("message serializes");
    dls_rpc::write_frame(output, &payload).await
}

async fn handle_request(
    server: &ServerHandle,
    method: String,
    params: dls_rpc::RawParams,
    cancel: CancellationToken,
    outbound: OutboundSender,
) -> Result<Value, ResponseError> {
    match method.as_str() {
        "initialize" => handle_initialize(server, params),
        "shutdown" => handle_shutdown(server),
        _ => dispatch_with_cancellation(server, method, params, cancel, outbound).await,
    }
}

async fn handle_notification(server: &ServerHandle, method: String, params: dls_rpc::RawParams) {
    match method.as_str() {
        "initialized" => {
            let _: InitializedParams = params.decode().unwrap_or_default();
            if let Err(err) = server.lifecycle().borrow_mut().initialized() {
                tracing::warn!(%err, "initialized notification out of sequence");
            }
        }
        "exit" => {
            server.lifecycle().borrow_mut().exit();
        }
        "$/cancelRequest" => {
            if let Ok(cancel_params) = params.decode::<CancelParams>() {
                let task_id = server.cancellation().borrow().task_id(&cancel_params.id);
                let cancelled = match task_id {
                    Some(task_id) => server.scheduler().cancel(task_id).is_ok(),
                    None => false,
                };
                if !cancelled {
                    tracing::debug!(id = %cancel_params.id, "cancel for unknown or finished request");
                }
            }
        }
        "window/workDoneProgress/cancel" => {
            if let Ok(p) = params.decode::<WorkDoneProgressCancelParams>() {
                if !server.progress().borrow().cancel(&p.token) {
                    tracing::debug!(token = ?p.token, "progress cancel for unknown or finished token");
                }
            }
        }
        "textDocument/didOpen" => {
            if let Ok(p) = params.decode::<dls_lsp::text_document::DidOpenTextDocumentParams>() {
                let doc = p.text_document;
                let uri = doc.uri.clone();
                let result =
                    server
                        .documents()
                        .borrow_mut()
                        .open(doc.uri, doc.language_id, doc.version, doc.text);
                if let Err(err) = result {
                    tracing::warn!(%uri, %err, "didOpen for an already-open document");
                } else {
                    server.events().publish(crate::events::ServerEvent::DocumentOpened {
                        uri: uri.to_string(),
                    });
                }
            }
        }
        "textDocument/didChange" => {
            if let Ok(p) = params.decode::<dls_lsp::text_document::DidChangeTextDocumentParams>() {
                let uri = p.text_document.uri.clone();
                let version = p.text_document.version;
                let result = server.documents().borrow_mut().change(&uri, version, &p.content_changes);
                if let Err(err) = result {
                    tracing::warn!(%uri, %err, "didChange for a document that is not open");
                } else {
                    server
                        .events()
                        .publish(crate::events::ServerEvent::DocumentChanged { uri: uri.to_string(), version });
                }
            }
        }
        "textDocument/didSave" => {
            if let Ok(p) = params.decode::<dls_lsp::text_document::DidSaveTextDocumentParams>() {
                let uri = p.text_document.uri.clone();
                let result = server.documents().borrow_mut().save(&uri, p.text);
                if let Err(err) = result {
                    tracing::warn!(%uri, %err, "didSave for a document that is not open");
                } else {
                    server
                        .events()
                        .publish(crate::events::ServerEvent::DocumentSaved { uri: uri.to_string() });
                }
            }
        }
        "textDocument/didClose" => {
            if let Ok(p) = params.decode::<dls_lsp::text_document::DidCloseTextDocumentParams>() {
                let uri = p.text_document.uri.clone();
                let result = server.documents().borrow_mut().close(&uri);
                if let Err(err) = result {
                    tracing::warn!(%uri, %err, "didClose for a document that is not open");
                } else {
                    server.events().publish(crate::events::ServerEvent::DocumentClosed { uri: uri.to_string() });
                }
            }
        }
        _ => {
            if server.lifecycle().borrow().require_ready(method.clone()).is_err() {
                tracing::debug!(%method, "dropping notification before the handshake completes");
                return;
            }
            let bindings = server.router().borrow().bindings_for(&method);
            if let Some(bindings) = bindings {
                let _ = router::dispatch_bindings(&bindings, params, None).await;
            }
        }
    }
}

/// Derive the capabilities actually backed by registered router bindings,
/// rather than hardcoding a fixed set — a binary embedding this framework
/// advertises only what it registered handlers for. Document sync itself
/// is handled inline by this crate (not through the Router), so it is
/// always on.
fn derive_capabilities(server: &ServerHandle) -> ServerCapabilities {
    let router = server.router().borrow();
    ServerCapabilities {
        text_document_sync: Some(TextDocumentSync::Kind(dls_lsp::enums::TextDocumentSyncKind::Incremental)),
        hover_provider: router.is_registered("textDocument/hover"),
        definition_provider: router.is_registered("textDocument/definition"),
        document_symbol_provider: router.is_registered("textDocument/documentSymbol"),
        workspace_symbol_provider: router.is_registered("workspace/symbol"),
        document_formatting_provider: router.is_registered("textDocument/formatting"),
        completion_provider: router
            .is_registered("textDocument/completion")
            .then(|| serde_json::json!({})),
    }
}

fn handle_initialize(server: &ServerHandle, params: dls_rpc::RawParams) -> Result<Value, ResponseError> {
    let init: InitializeParams = params
        .decode()
        .map_err(|e| ResponseError::new(error_code::INVALID_PARAMS, e.to_string()))?;
    let capabilities = derive_capabilities(server);
    server
        .lifecycle()
        .borrow_mut()
        .initialize(&init.capabilities, capabilities.clone())
        .map_err(lifecycle_error_to_response)?;
    let result = InitializeResult { capabilities };
    serde_json::to_value(result).map_err(|e| ResponseError::new(error_code::INTERNAL_ERROR, e.to_string()))
}

fn handle_shutdown(server: &ServerHandle) -> Result<Value, ResponseError> {
    server
        .lifecycle()
        .borrow_mut()
        .shutdown()
        .map_err(lifecycle_error_to_response)?;
    Ok(Value::Null)
}

fn lifecycle_error_to_response(err: LifecycleError) -> ResponseError {
    err.into()
}

async fn dispatch_with_cancellation(
    server: &ServerHandle,
    method: String,
    params: dls_rpc::RawParams,
    cancel: CancellationToken,
    outbound: OutboundSender,
) -> Result<Value, ResponseError> {
    if let Err(err) = server.lifecycle().borrow().require_ready(method.clone()) {
        return Err(err.into());
    }

    // `bindings_for` takes only a short, synchronous borrow of the
    // Router; the `Ref` guard it returns is dropped before the dispatch
    // future is even constructed, let alone awaited, so a concurrently
    // spawned request dispatching a different method never contends on
    // this one's borrow.
    let bindings = server.router().borrow().bindings_for(&method);
    let bindings = match bindings {
        Some(bindings) => bindings,
        None => {
            return Err(ResponseError::new(
                error_code::METHOD_NOT_FOUND,
                format!("method not found: {method}"),
            ))
        }
    };

    let partial_token = params
        .decode::<PartialResultParams>()
        .ok()
        .and_then(|p| p.partial_result_token);
    let progress = partial_token.map(|token| (token, outbound));

    let dispatch_fut = router::dispatch_bindings(&bindings, params, progress);
    tokio::pin!(dispatch_fut);

    tokio::select! {
        () = cancel.cancelled() => Err(ResponseError::new(error_code::REQUEST_CANCELLED, "request cancelled")),
        r = &mut dispatch_fut => r,
    }
}
