//! JSON-RPC 2.0 message shapes shared by every protocol spoken over the
//! framer: Request, Notification, Response, and the three-shaped request id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The stable client-visible identifier for a request.
///
/// Equality is value-typed over the three id shapes the wire protocol
/// allows: integer, string, or explicit `null`. A *notification* has no id
/// at all, which is represented by the absence of this type, not by one of
/// its variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    Null,
}

impl PartialEq for RequestId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Null, Self::Null) => true,
            _ => false,
        }
    }
}
impl Eq for RequestId {}

impl std::hash::Hash for RequestId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Self::Number(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            Self::String(s) => {
                1u8.hash(state);
                s.hash(state);
            }
            Self::Null => 2u8.hash(state),
        }
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A raw, not-yet-decoded JSON-RPC envelope. `params` is kept as a
/// reference-counted byte slice into the original message buffer so that
/// routing never has to eagerly deserialize it.
#[derive(Debug, Clone)]
pub enum RawEnvelope {
    Request {
        id: RequestId,
        method: String,
        params: Option<crate::value::RawParams>,
    },
    Notification {
        method: String,
        params: Option<crate::value::RawParams>,
    },
    Response {
        id: RequestId,
        outcome: ResponseOutcome,
    },
}

/// The decoded outcome half of a `Response` envelope.
#[derive(Debug, Clone)]
pub enum ResponseOutcome {
    Ok(crate::value::RawParams),
    Err(ResponseError),
}

/// A JSON-RPC / LSP error object, as returned in a `Response.error` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ResponseError {
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Standard JSON-RPC / LSP error codes, plus the server-specific values.
pub mod error_code {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_NOT_INITIALIZED: i64 = -32002;
    pub const UNKNOWN_ERROR_CODE: i64 = -32001;
    pub const REQUEST_CANCELLED: i64 = -32800;
    pub const CONTENT_MODIFIED: i64 = -32801;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_equality_is_value_typed() {
        assert_eq!(RequestId::Number(1), RequestId::Number(1));
        assert_ne!(RequestId::Number(1), RequestId::String("1".into()));
        assert_eq!(RequestId::Null, RequestId::Null);
    }

    #[test]
    fn response_error_roundtrips() {
        let err = ResponseError::new(error_code::REQUEST_CANCELLED, "cancelled");
        let json = serde_json::to_string(&err).unwrap();
        let back: ResponseError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);
    }
}
