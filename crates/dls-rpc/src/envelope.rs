//! Parses a framed message body into a [`RawEnvelope`] without forcing a
//! typed decode of `params`/`result`: routing only ever looks at `jsonrpc`,
//! `id`, and `method`.

use bytes::Bytes;
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::message::{RawEnvelope, RequestId, ResponseError, ResponseOutcome};
use crate::value::{ParseError, RawParams};

/// Wire shape of an envelope before we decide whether it is a request,
/// notification, or response. `params`/`result` stay as [`RawValue`] so
/// `serde_json` copies their text without recursively parsing it.
#[derive(Debug, Deserialize)]
struct WireEnvelope {
    #[allow(dead_code)]
    jsonrpc: Option<String>,
    id: Option<RequestId>,
    method: Option<String>,
    params: Option<Box<RawValue>>,
    result: Option<Box<RawValue>>,
    error: Option<ResponseError>,
}

/// Parses one framed message body into a [`RawEnvelope`].
pub fn parse_envelope(body: Bytes) -> Result<RawEnvelope, ParseError> {
    let wire: WireEnvelope = serde_json::from_slice(&body)?;

    let to_raw_params = |raw: Box<RawValue>| RawParams::from_owned(Bytes::from(raw.get().to_owned().into_bytes()));

    match (wire.method, wire.id) {
        (Some(method), Some(id)) => Ok(RawEnvelope::Request {
            id,
            method,
            params: wire.params.map(to_raw_params),
        }),
        (Some(method), None) => Ok(RawEnvelope::Notification {
            method,
            params: wire.params.map(to_raw_params),
        }),
        (None, Some(id)) => {
            let outcome = if let Some(err) = wire.error {
                ResponseOutcome::Err(err)
            } else {
                ResponseOutcome::Ok(
                    wire.result
                        .map(to_raw_params)
                        .unwrap_or_else(|| RawParams::from_owned(Bytes::from_static(b"null"))),
                )
            };
            Ok(RawEnvelope::Response { id, outcome })
        }
        (None, None) => Err(ParseError::NotAnObject),
    }
}
