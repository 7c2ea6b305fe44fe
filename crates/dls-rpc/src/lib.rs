//! `dls-rpc`: the framed JSON-RPC transport and lazy JSON codec underlying
//! the D language server's LSP runtime core.
//!
//! Layering separates a low-level generic RPC pump from the schema that
//! sits on top of it: this crate knows nothing about what a "method" means
//! to an LSP client, only how messages are framed and how their envelopes
//! are told apart.

pub mod envelope;
pub mod framer;
pub mod message;
pub mod value;

pub use envelope::parse_envelope;
pub use framer::{read_frame, write_frame, TransportError};
pub use message::{error_code, RawEnvelope, RequestId, ResponseError, ResponseOutcome};
pub use value::{decode_struct_variant, DecodeError, ParseError, RawParams, VariantCandidate};
