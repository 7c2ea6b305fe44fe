//! A thin, `serde_json`-backed codec that adds the two things a generic
//! JSON library does not give you for free: lazy param slices, and
//! struct-variant discrimination by required-key presence.
//!
//! Round-tripping 53-bit integers, insertion-order object construction,
//! tolerant-of-unknown-keys decoding, and numeric/string enum decoding are
//! all exactly `serde_json`'s default behavior once the `preserve_order`
//! feature is enabled; the only genuinely new pieces here are
//! [`RawParams`] and [`decode_struct_variant`].

use std::collections::BTreeSet;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message is not a JSON object")]
    NotAnObject,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode as {target}: {source}")]
    Json {
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("no struct-variant candidate matched; missing keys per candidate: {0:?}")]
    NoVariantMatched(Vec<(&'static str, Vec<&'static str>)>),
}

/// A lazily-decodable parameter or result payload: the original JSON text,
/// kept alive via a reference-counted buffer rather than copied, per the
/// "lazy param slices" design note. Routing a request never has to look
/// inside this value; only a handler that opts in via [`RawParams::decode`]
/// pays the parsing cost.
#[derive(Debug, Clone)]
pub struct RawParams {
    bytes: Bytes,
}

impl RawParams {
    /// Wraps a byte range of an already-parsed message buffer. `start`/`end`
    /// are byte offsets of the value's text within `buffer`.
    #[must_use]
    pub fn from_range(buffer: &Bytes, start: usize, end: usize) -> Self {
        Self {
            bytes: buffer.slice(start..end),
        }
    }

    #[must_use]
    pub fn from_owned(bytes: Bytes) -> Self {
        Self { bytes }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Schema-directed decode. Unknown keys are tolerated by default because
    /// this goes through ordinary `serde` derive, which ignores fields the
    /// target type does not declare.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_slice(&self.bytes).map_err(|source| DecodeError::Json {
            target: std::any::type_name::<T>(),
            source,
        })
    }

    /// Lazily extracts the raw JSON text at `path` (a sequence of object
    /// keys / array indices, `serde_json::Value::pointer` syntax) without
    /// constructing a fully typed value for the rest of the document.
    pub fn extract_slice(&self, pointer: &str) -> Result<Option<Box<RawValue>>, ParseError> {
        let value: serde_json::Value = serde_json::from_slice(&self.bytes)?;
        match value.pointer(pointer) {
            None => Ok(None),
            Some(sub) => {
                let text = serde_json::to_string(sub)?;
                Ok(Some(RawValue::from_string(text)?))
            }
        }
    }

    /// Builds a [`RawParams`] that decodes as an empty object — the default
    /// used by the Router when `params` is absent but the handler's
    /// argument type is a record.
    #[must_use]
    pub fn empty_object() -> Self {
        Self {
            bytes: Bytes::from_static(b"{}"),
        }
    }
}

/// A candidate shape for struct-variant discrimination: a name (for error
/// reporting) and the set of JSON keys that must all be present for the
/// candidate to match.
pub struct VariantCandidate {
    pub name: &'static str,
    pub required_keys: &'static [&'static str],
}

/// Discriminates a "struct variant" sum type by required-key presence: a
/// candidate matches iff every one of its non-optional keys is present in
/// the object; ties are broken by declaration order; no match is a
/// [`DecodeError::NoVariantMatched`] listing, for every candidate, the keys
/// it was missing.
///
/// This single generic function means every sum type in `dls-lsp`
/// (`Hover.contents`, `TextDocumentSync`, `TextEdit | InsertReplaceEdit`,
/// ...) calls through this one dispatcher instead of writing its own
/// `Deserialize` by hand.
pub fn decode_struct_variant<'a>(
    object: &serde_json::Map<String, serde_json::Value>,
    candidates: &[VariantCandidate],
) -> Result<usize, DecodeError> {
    let present: BTreeSet<&str> = object.keys().map(String::as_str).collect();

    let mut missing_report = Vec::with_capacity(candidates.len());
    for (idx, candidate) in candidates.iter().enumerate() {
        let missing: Vec<&'static str> = candidate
            .required_keys
            .iter()
            .copied()
            .filter(|k| !present.contains(k))
            .collect();
        if missing.is_empty() {
            return Ok(idx);
        }
        missing_report.push((candidate.name, missing));
    }

    Err(DecodeError::NoVariantMatched(missing_report))
}

/// Verifies a JSON number fits the LSP / JS `MAX_SAFE_INTEGER` boundary
/// (53-bit integer magnitude) so round-tripping through this codec never
/// silently loses precision.
#[must_use]
pub fn fits_max_safe_integer(n: i64) -> bool {
    const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
    n.unsigned_abs() <= MAX_SAFE_INTEGER as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn decode_tolerates_unknown_keys() {
        let raw = RawParams::from_owned(Bytes::from_static(br#"{"x":1,"y":2,"z":"ignored"}"#));
        let p: Point = raw.decode().unwrap();
        assert_eq!(p, Point { x: 1, y: 2 });
    }

    #[test]
    fn extract_slice_returns_nested_raw_text() {
        let raw = RawParams::from_owned(Bytes::from_static(
            br#"{"textDocument":{"uri":"file:///a.d"}}"#,
        ));
        let slice = raw.extract_slice("/textDocument/uri").unwrap().unwrap();
        assert_eq!(slice.get(), r#""file:///a.d""#);
    }

    #[test]
    fn extract_slice_missing_path_is_none() {
        let raw = RawParams::from_owned(Bytes::from_static(br#"{"a":1}"#));
        assert!(raw.extract_slice("/b").unwrap().is_none());
    }

    #[test]
    fn struct_variant_picks_first_matching_by_declaration_order() {
        let candidates = [
            VariantCandidate {
                name: "TextEdit",
                required_keys: &["range", "newText"],
            },
            VariantCandidate {
                name: "InsertReplaceEdit",
                required_keys: &["insert", "replace", "newText"],
            },
        ];

        let text_edit: serde_json::Value =
            serde_json::from_str(r#"{"range":{},"newText":"x"}"#).unwrap();
        let idx = decode_struct_variant(text_edit.as_object().unwrap(), &candidates).unwrap();
        assert_eq!(idx, 0);

        let insert_replace: serde_json::Value =
            serde_json::from_str(r#"{"newText":"x","insert":{},"replace":{}}"#).unwrap();
        let idx = decode_struct_variant(insert_replace.as_object().unwrap(), &candidates).unwrap();
        assert_eq!(idx, 1);
    }

    #[test]
    fn struct_variant_no_match_lists_missing_keys_per_candidate() {
        let candidates = [VariantCandidate {
            name: "TextEdit",
            required_keys: &["range", "newText"],
        }];
        let value: serde_json::Value = serde_json::from_str(r#"{"range":{}}"#).unwrap();
        let err = decode_struct_variant(value.as_object().unwrap(), &candidates).unwrap_err();
        match err {
            DecodeError::NoVariantMatched(report) => {
                assert_eq!(report, vec![("TextEdit", vec!["newText"])]);
            }
            _ => panic!("expected NoVariantMatched"),
        }
    }

    #[test]
    fn max_safe_integer_boundary() {
        assert!(fits_max_safe_integer(9_007_199_254_740_991));
        assert!(!fits_max_safe_integer(i64::MAX));
    }
}
