//! The LSP payloads that are genuinely sum types on the wire: `Hover.contents`
//! (`MarkedString | MarkedString[] | MarkupContent`), `TextDocumentSyncKind |
//! TextDocumentSyncOptions`, and `TextEdit | InsertReplaceEdit`.
//!
//! Every variant here is discriminated through
//! [`dls_rpc::decode_struct_variant`] — the one generic dispatcher — rather
//! than a bespoke `Deserialize` impl per type.

use dls_rpc::value::VariantCandidate;
use serde::{Deserialize, Serialize};

use crate::basics::Range;
use crate::enums::TextDocumentSyncKind;

/// A plain (language, value) marked code block, or a bare string of
/// Markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkedString {
    String(String),
    LanguageString { language: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkupKind {
    PlainText,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupContent {
    pub kind: MarkupKind,
    pub value: String,
}

/// `Hover.contents`: one of a single [`MarkedString`], an array of them, or
/// a single [`MarkupContent`]. Discriminated by required-key presence
/// (`MarkupContent` is the only shape with a `kind` key) rather than by
/// JSON type alone, so the same dispatcher used for record-shaped sum
/// types also covers this case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HoverContents {
    Scalar(MarkedString),
    Array(Vec<MarkedString>),
    Markup(MarkupContent),
}

impl<'de> Deserialize<'de> for HoverContents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Array(_) => {
                serde_json::from_value(value).map(HoverContents::Array)
            }
            serde_json::Value::Object(obj) => {
                const CANDIDATES: &[VariantCandidate] = &[VariantCandidate {
                    name: "MarkupContent",
                    required_keys: &["kind", "value"],
                }];
                if dls_rpc::decode_struct_variant(obj, CANDIDATES).is_ok() {
                    serde_json::from_value(value).map(HoverContents::Markup)
                } else {
                    serde_json::from_value(value).map(HoverContents::Scalar)
                }
            }
            _ => serde_json::from_value(value).map(HoverContents::Scalar),
        }
        .map_err(serde::de::Error::custom)
    }
}

/// `ServerCapabilities.textDocumentSync`: either a bare
/// [`TextDocumentSyncKind`] or a full options record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDocumentSyncOptions {
    #[serde(rename = "openClose", default)]
    pub open_close: bool,
    pub change: TextDocumentSyncKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TextDocumentSync {
    Kind(TextDocumentSyncKind),
    Options(TextDocumentSyncOptions),
}

impl<'de> Deserialize<'de> for TextDocumentSync {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.is_number() {
            serde_json::from_value(value)
                .map(TextDocumentSync::Kind)
                .map_err(serde::de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(TextDocumentSync::Options)
                .map_err(serde::de::Error::custom)
        }
    }
}

/// A plain text edit: replace `range` with `new_text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub range: Range,
    #[serde(rename = "newText")]
    pub new_text: String,
}

/// A completion-context edit that carries separate insert/replace ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReplaceEdit {
    #[serde(rename = "newText")]
    pub new_text: String,
    pub insert: Range,
    pub replace: Range,
}

/// `TextEdit | InsertReplaceEdit`, a struct-variant dispatch:
/// `InsertReplaceEdit` requires `insert` and `replace`; plain `TextEdit`
/// requires only `range`. Declaration order matters only as a tie-break;
/// the two shapes' required keys never overlap for a well-formed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum OneOfTextEdit {
    InsertReplace(InsertReplaceEdit),
    Plain(TextEdit),
}

impl<'de> Deserialize<'de> for OneOfTextEdit {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        let obj = value
            .as_object()
            .ok_or_else(|| serde::de::Error::custom("TextEdit | InsertReplaceEdit must be an object"))?;

        const CANDIDATES: &[VariantCandidate] = &[
            VariantCandidate {
                name: "InsertReplaceEdit",
                required_keys: &["insert", "replace", "newText"],
            },
            VariantCandidate {
                name: "TextEdit",
                required_keys: &["range", "newText"],
            },
        ];

        match dls_rpc::decode_struct_variant(obj, CANDIDATES) {
            Ok(0) => serde_json::from_value(value)
                .map(OneOfTextEdit::InsertReplace)
                .map_err(serde::de::Error::custom),
            Ok(_) => serde_json::from_value(value)
                .map(OneOfTextEdit::Plain)
                .map_err(serde::de::Error::custom),
            Err(e) => Err(serde::de::Error::custom(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::Position;

    #[test]
    fn hover_contents_scalar_string() {
        let v: HoverContents = serde_json::from_str(r#""plain text""#).unwrap();
        assert_eq!(v, HoverContents::Scalar(MarkedString::String("plain text".into())));
    }

    #[test]
    fn hover_contents_markup() {
        let v: HoverContents =
            serde_json::from_str(r#"{"kind":"markdown","value":"**bold**"}"#).unwrap();
        assert!(matches!(v, HoverContents::Markup(_)));
    }

    #[test]
    fn hover_contents_array() {
        let v: HoverContents = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert!(matches!(v, HoverContents::Array(_)));
    }

    #[test]
    fn text_document_sync_bare_kind() {
        let v: TextDocumentSync = serde_json::from_str("2").unwrap();
        assert_eq!(v, TextDocumentSync::Kind(TextDocumentSyncKind::Incremental));
    }

    #[test]
    fn text_document_sync_options() {
        let v: TextDocumentSync =
            serde_json::from_str(r#"{"openClose":true,"change":1}"#).unwrap();
        match v {
            TextDocumentSync::Options(opts) => {
                assert!(opts.open_close);
                assert_eq!(opts.change, TextDocumentSyncKind::Full);
            }
            _ => panic!("expected Options"),
        }
    }

    #[test]
    fn one_of_text_edit_plain_arm() {
        let pos = Position::new(0, 0);
        let json = serde_json::json!({"range": {"start": pos, "end": pos}, "newText": "x"});
        let v: OneOfTextEdit = serde_json::from_value(json).unwrap();
        assert!(matches!(v, OneOfTextEdit::Plain(_)));
    }

    #[test]
    fn one_of_text_edit_insert_replace_arm() {
        let pos = Position::new(0, 0);
        let range = serde_json::json!({"start": pos, "end": pos});
        let json = serde_json::json!({
            "newText": "x",
            "insert": range.clone(),
            "replace": range,
        });
        let v: OneOfTextEdit = serde_json::from_value(json).unwrap();
        assert!(matches!(v, OneOfTextEdit::InsertReplace(_)));
    }
}
