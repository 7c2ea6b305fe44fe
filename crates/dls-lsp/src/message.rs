//! Method-tagged request/notification/response envelopes layered over
//! [`dls_rpc::RawEnvelope`] — the boundary between the untyped wire codec
//! (`dls-rpc`) and the Router (`dls-lsp-framework`): this crate attaches
//! the LSP method name and typed error surface on top of the raw envelope.

use dls_rpc::{RawParams, RequestId, ResponseError};

/// A client- or server-originated request: a method name, an id to reply
/// against, and still-undecoded params (decoded lazily by whichever Router
/// binding claims `method`, so routing itself never forces a parse).
#[derive(Debug, Clone)]
pub struct AnyRequest {
    pub id: RequestId,
    pub method: String,
    pub params: RawParams,
}

/// A notification: no id, no reply expected.
#[derive(Debug, Clone)]
pub struct AnyNotification {
    pub method: String,
    pub params: RawParams,
}

/// A reply to a request this side issued, or one a peer is replying to for
/// us — the `Ok`/`Err` split mirrors [`dls_rpc::ResponseOutcome`].
#[derive(Debug, Clone)]
pub struct AnyResponse {
    pub id: RequestId,
    pub outcome: Result<RawParams, ResponseError>,
}

/// Any one of the three frame shapes the wire can carry, after the raw
/// envelope has been classified but before params are decoded.
#[derive(Debug, Clone)]
pub enum Message {
    Request(AnyRequest),
    Notification(AnyNotification),
    Response(AnyResponse),
}

impl From<dls_rpc::RawEnvelope> for Message {
    fn from(envelope: dls_rpc::RawEnvelope) -> Self {
        match envelope {
            dls_rpc::RawEnvelope::Request { id, method, params } => {
                Message::Request(AnyRequest {
                    id,
                    method,
                    params: params.unwrap_or_else(RawParams::empty_object),
                })
            }
            dls_rpc::RawEnvelope::Notification { method, params } => {
                Message::Notification(AnyNotification {
                    method,
                    params: params.unwrap_or_else(RawParams::empty_object),
                })
            }
            dls_rpc::RawEnvelope::Response { id, outcome } => {
                let outcome = match outcome {
                    dls_rpc::ResponseOutcome::Ok(params) => Ok(params),
                    dls_rpc::ResponseOutcome::Err(error) => Err(error),
                };
                Message::Response(AnyResponse { id, outcome })
            }
        }
    }
}
