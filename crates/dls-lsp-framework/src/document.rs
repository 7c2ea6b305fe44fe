//! Document manager. Each open document is stored as a [`ropey::Rope`] so
//! incremental edits and UTF-16 position conversion are both sub-linear;
//! snapshots are cheap because `Rope::clone` is O(1) structural sharing.
//!
//! The line/character -> byte conversion below counts UTF-16 code units
//! over `Rope` line slices, clamping at the end of a line or document
//! rather than panicking on an out-of-range position.

use std::collections::HashMap;

use ropey::{Rope, RopeSlice};

use dls_lsp::basics::{Position, Range, Uri};
use dls_lsp::text_document::TextDocumentContentChangeEvent;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("document {0} is not open")]
    NotOpen(String),
    #[error("document {0} is already open")]
    AlreadyOpen(String),
}

/// Length in bytes of `line`'s trailing line terminator, if any: 0, 1
/// (`\n`) or 2 (`\r\n`). `\r` and `\n` are each one UTF-8 byte, so this
/// also equals the terminator's length in chars.
fn line_terminator_len(line: RopeSlice) -> usize {
    let n = line.len_chars();
    if n == 0 || line.char(n - 1) != '\n' {
        return 0;
    }
    if n >= 2 && line.char(n - 2) == '\r' {
        2
    } else {
        1
    }
}

/// Convert a UTF-16-based LSP [`Position`] to a byte offset into `rope`.
/// Out-of-range lines clamp to the last line; out-of-range characters
/// clamp to the end of that line's content, not past its line terminator.
#[must_use]
pub fn byte_offset(rope: &Rope, position: Position) -> usize {
    let last_line = rope.len_lines().saturating_sub(1);
    let line_idx = (position.line as usize).min(last_line);
    let line_start_byte = rope.line_to_byte(line_idx);
    let line = rope.line(line_idx);
    let content_len_bytes = line.len_bytes() - line_terminator_len(line);

    let mut utf16_count = 0u32;
    let mut byte_in_line = 0usize;
    for ch in line.chars() {
        if byte_in_line >= content_len_bytes || utf16_count >= position.character {
            break;
        }
        utf16_count += ch.len_utf16() as u32;
        byte_in_line += ch.len_utf8();
    }
    line_start_byte + byte_in_line.min(content_len_bytes)
}

/// Convert a byte offset back into a UTF-16-based LSP [`Position`]. The
/// inverse of [`byte_offset`]; clamps an out-of-range offset to the end of
/// the document.
#[must_use]
pub fn position_from_offset(rope: &Rope, offset: usize) -> Position {
    let offset = offset.min(rope.len_bytes());
    let line_idx = rope.byte_to_line(offset);
    let line_start_byte = rope.line_to_byte(line_idx);
    let line = rope.line(line_idx);

    let mut utf16_count = 0u32;
    let mut consumed = 0usize;
    for ch in line.chars() {
        if line_start_byte + consumed >= offset {
            break;
        }
        consumed += ch.len_utf8();
        utf16_count += ch.len_utf16() as u32;
    }
    Position::new(line_idx as u32, utf16_count)
}

fn byte_range(rope: &Rope, range: Range) -> std::ops::Range<usize> {
    let start = byte_offset(rope, range.start);
    let end = byte_offset(rope, range.end);
    start.min(end)..start.max(end)
}

/// Normalizes a document URI by parsing and re-serializing it through
/// `url::Url`, so two URIs that differ only in percent-encoding or
/// trailing-slash style key the same document. Strings that are not a
/// valid URI are kept as-is — a tolerant client should not lose a document
/// over a malformed uri.
#[must_use]
pub fn normalize_uri(uri: &Uri) -> Uri {
    match url::Url::parse(&uri.0) {
        Ok(parsed) => Uri(parsed.to_string()),
        Err(_) => uri.clone(),
    }
}

/// Which line terminator a document was opened with. Detected once from
/// the first line break seen and held fixed afterward; text inserted by
/// later edits is rewritten to match rather than left to drift into a
/// mixed-EOL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolKind {
    Lf,
    CrLf,
}

impl EolKind {
    #[must_use]
    pub fn detect(text: &str) -> Self {
        match text.find('\n') {
            Some(idx) if text.as_bytes().get(idx.wrapping_sub(1)) == Some(&b'\r') => Self::CrLf,
            _ => Self::Lf,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// Rewrite every line ending in `text` to this kind.
    #[must_use]
    pub fn normalize(self, text: &str) -> String {
        let unified = text.replace("\r\n", "\n");
        match self {
            Self::Lf => unified,
            Self::CrLf => unified.replace('\n', "\r\n"),
        }
    }
}

/// A single open document: its text, version, declared language, and
/// detected line-ending convention.
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Uri,
    pub language_id: String,
    pub version: i32,
    pub text: Rope,
    pub eol: EolKind,
}

impl Document {
    /// Apply a batch of content-change events in order. Each event's
    /// `range` (if any) is resolved against the rope *as it stands after
    /// the previous event in the same batch* — incremental edits are not
    /// independent of one another. A full-document replace re-detects the
    /// document's EOL kind; an incremental insert is normalized to the
    /// EOL kind already on file.
    pub fn apply_content_changes(&mut self, changes: &[TextDocumentContentChangeEvent]) {
        for change in changes {
            match change.range {
                None => {
                    self.eol = EolKind::detect(&change.text);
                    self.text = Rope::from_str(&change.text);
                }
                Some(range) => {
                    let bytes = byte_range(&self.text, range);
                    let char_start = self.text.byte_to_char(bytes.start);
                    let char_end = self.text.byte_to_char(bytes.end);
                    self.text.remove(char_start..char_end);
                    self.text.insert(char_start, &self.eol.normalize(&change.text));
                }
            }
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            uri: self.uri.clone(),
            version: self.version,
            text: self.text.clone(),
        }
    }
}

/// An immutable, cheaply-cloned view of a document at a point in time.
/// Handlers read from a snapshot rather than the live `Document` so a
/// long-running request is unaffected by edits that land while it runs.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub uri: Uri,
    pub version: i32,
    pub text: Rope,
}

impl DocumentSnapshot {
    #[must_use]
    pub fn byte_offset(&self, position: Position) -> usize {
        byte_offset(&self.text, position)
    }

    #[must_use]
    pub fn position_from_offset(&self, offset: usize) -> Position {
        position_from_offset(&self.text, offset)
    }
}

/// The registry of every currently-open document, keyed by URI.
#[derive(Debug, Default)]
pub struct DocumentManager {
    documents: HashMap<Uri, Document>,
}

impl DocumentManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(
        &mut self,
        uri: Uri,
        language_id: String,
        version: i32,
        text: String,
    ) -> Result<(), DocumentError> {
        let uri = normalize_uri(&uri);
        if self.documents.contains_key(&uri) {
            return Err(DocumentError::AlreadyOpen(uri.to_string()));
        }
        let eol = EolKind::detect(&text);
        self.documents.insert(
            uri.clone(),
            Document {
                uri,
                language_id,
                version,
                text: Rope::from_str(&text),
                eol,
            },
        );
        Ok(())
    }

    /// Apply a `textDocument/didChange` batch. Changes whose `version` is
    /// not strictly greater than the document's current version are
    /// dropped rather than applied — the client is expected to send
    /// monotonically increasing versions, and an out-of-order or replayed
    /// notification must not regress the document.
    pub fn change(
        &mut self,
        uri: &Uri,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Result<(), DocumentError> {
        let uri = normalize_uri(uri);
        let doc = self
            .documents
            .get_mut(&uri)
            .ok_or_else(|| DocumentError::NotOpen(uri.to_string()))?;
        if version <= doc.version {
            tracing::warn!(
                uri = %doc.uri.0,
                version,
                current = doc.version,
                "dropping out-of-order textDocument/didChange"
            );
            return Ok(());
        }
        doc.apply_content_changes(changes);
        doc.version = version;
        Ok(())
    }

    /// Apply a `textDocument/didSave` notification. `text` is only present
    /// when the server advertised `includeText: true` in its save options;
    /// when absent, saving is a no-op beyond whatever event it triggers.
    pub fn save(&mut self, uri: &Uri, text: Option<String>) -> Result<(), DocumentError> {
        let uri = normalize_uri(uri);
        let doc = self
            .documents
            .get_mut(&uri)
            .ok_or_else(|| DocumentError::NotOpen(uri.to_string()))?;
        if let Some(text) = text {
            doc.eol = EolKind::detect(&text);
            doc.text = Rope::from_str(&text);
        }
        Ok(())
    }

    pub fn close(&mut self, uri: &Uri) -> Result<(), DocumentError> {
        let uri = normalize_uri(uri);
        self.documents
            .remove(&uri)
            .map(|_| ())
            .ok_or_else(|| DocumentError::NotOpen(uri.to_string()))
    }

    #[must_use]
    pub fn snapshot(&self, uri: &Uri) -> Option<DocumentSnapshot> {
        let uri = normalize_uri(uri);
        self.documents.get(&uri).map(Document::snapshot)
    }

    #[must_use]
    pub fn is_open(&self, uri: &Uri) -> bool {
        let uri = normalize_uri(uri);
        self.documents.contains_key(&uri)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position::new(line, character)
    }

    #[test]
    fn byte_offset_ascii_single_line() {
        let rope = Rope::from_str("hello world");
        assert_eq!(byte_offset(&rope, pos(0, 5)), 5);
    }

    #[test]
    fn byte_offset_clamps_past_end_of_line() {
        let rope = Rope::from_str("hi\nthere");
        assert_eq!(byte_offset(&rope, pos(0, 999)), 2);
    }

    #[test]
    fn byte_offset_clamps_past_last_line() {
        let rope = Rope::from_str("only one line");
        assert_eq!(byte_offset(&rope, pos(5, 0)), 0);
    }

    #[test]
    fn byte_offset_counts_utf16_surrogate_pairs() {
        // U+1F600 (😀) is one UTF-16 surrogate pair (2 code units) but 4
        // UTF-8 bytes.
        let rope = Rope::from_str("😀x");
        assert_eq!(byte_offset(&rope, pos(0, 2)), 4);
    }

    #[test]
    fn position_from_offset_round_trips_ascii() {
        let rope = Rope::from_str("line one\nline two\n");
        let offset = byte_offset(&rope, pos(1, 5));
        assert_eq!(position_from_offset(&rope, offset), pos(1, 5));
    }

    #[test]
    fn apply_full_replace_ignores_range() {
        let mut doc = Document {
            uri: Uri::from("file:///a.d".to_string()),
            language_id: "d".into(),
            version: 1,
            text: Rope::from_str("old"),
            eol: EolKind::Lf,
        };
        doc.apply_content_changes(&[TextDocumentContentChangeEvent {
            range: None,
            text: "new".into(),
        }]);
        assert_eq!(doc.text.to_string(), "new");
    }

    #[test]
    fn apply_incremental_edit_replaces_range() {
        let mut doc = Document {
            uri: Uri::from("file:///a.d".to_string()),
            language_id: "d".into(),
            version: 1,
            text: Rope::from_str("hello world"),
            eol: EolKind::Lf,
        };
        doc.apply_content_changes(&[TextDocumentContentChangeEvent {
            range: Some(Range::new(pos(0, 6), pos(0, 11))),
            text: "there".into(),
        }]);
        assert_eq!(doc.text.to_string(), "hello there");
    }

    #[test]
    fn sequential_edits_in_one_batch_compose() {
        let mut doc = Document {
            uri: Uri::from("file:///a.d".to_string()),
            language_id: "d".into(),
            version: 1,
            text: Rope::from_str("abcdef"),
            eol: EolKind::Lf,
        };
        doc.apply_content_changes(&[
            TextDocumentContentChangeEvent {
                range: Some(Range::new(pos(0, 0), pos(0, 3))),
                text: "XYZ".into(),
            },
            TextDocumentContentChangeEvent {
                range: Some(Range::new(pos(0, 3), pos(0, 6))),
                text: "123".into(),
            },
        ]);
        assert_eq!(doc.text.to_string(), "XYZ123");
    }

    #[test]
    fn manager_rejects_reopening_the_same_uri() {
        let mut manager = DocumentManager::new();
        let uri = Uri::from("file:///a.d".to_string());
        manager.open(uri.clone(), "d".into(), 1, "a".into()).unwrap();
        assert!(manager.open(uri, "d".into(), 1, "a".into()).is_err());
    }

    #[test]
    fn manager_change_on_unopened_document_errors() {
        let mut manager = DocumentManager::new();
        let uri = Uri::from("file:///missing.d".to_string());
        assert!(manager.change(&uri, 2, &[]).is_err());
    }

    #[test]
    fn manager_change_drops_stale_or_duplicate_versions() {
        let mut manager = DocumentManager::new();
        let uri = Uri::from("file:///a.d".to_string());
        manager.open(uri.clone(), "d".into(), 3, "abc".into()).unwrap();

        let change = TextDocumentContentChangeEvent { range: None, text: "xyz".into() };
        manager.change(&uri, 3, std::slice::from_ref(&change)).unwrap();
        manager.change(&uri, 2, std::slice::from_ref(&change)).unwrap();

        let snapshot = manager.snapshot(&uri).unwrap();
        assert_eq!(snapshot.version, 3);
        assert_eq!(snapshot.text.to_string(), "abc");
    }

    #[test]
    fn manager_change_applies_strictly_newer_versions() {
        let mut manager = DocumentManager::new();
        let uri = Uri::from("file:///a.d".to_string());
        manager.open(uri.clone(), "d".into(), 1, "abc".into()).unwrap();
        manager
            .change(
                &uri,
                2,
                &[TextDocumentContentChangeEvent { range: None, text: "xyz".into() }],
            )
            .unwrap();
        let snapshot = manager.snapshot(&uri).unwrap();
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.text.to_string(), "xyz");
    }

    #[test]
    fn eol_kind_is_detected_from_opened_text() {
        assert_eq!(EolKind::detect("one\ntwo\n"), EolKind::Lf);
        assert_eq!(EolKind::detect("one\r\ntwo\r\n"), EolKind::CrLf);
        assert_eq!(EolKind::detect("no newline at all"), EolKind::Lf);
    }

    #[test]
    fn incremental_insert_is_normalized_to_the_document_eol() {
        let mut doc = Document {
            uri: Uri::from("file:///a.d".to_string()),
            language_id: "d".into(),
            version: 1,
            text: Rope::from_str("one\r\ntwo\r\n"),
            eol: EolKind::CrLf,
        };
        doc.apply_content_changes(&[TextDocumentContentChangeEvent {
            range: Some(Range::new(pos(0, 3), pos(0, 3))),
            text: "X\nY".into(),
        }]);
        assert_eq!(doc.text.to_string(), "oneX\r\nY\r\ntwo\r\n");
    }

    #[test]
    fn manager_save_replaces_text_when_included() {
        let mut manager = DocumentManager::new();
        let uri = Uri::from("file:///a.d".to_string());
        manager.open(uri.clone(), "d".into(), 1, "old".into()).unwrap();
        manager.save(&uri, Some("new contents".into())).unwrap();
        let snapshot = manager.snapshot(&uri).unwrap();
        assert_eq!(snapshot.text.to_string(), "new contents");
    }

    #[test]
    fn manager_save_without_text_is_a_noop() {
        let mut manager = DocumentManager::new();
        let uri = Uri::from("file:///a.d".to_string());
        manager.open(uri.clone(), "d".into(), 1, "unchanged".into()).unwrap();
        manager.save(&uri, None).unwrap();
        let snapshot = manager.snapshot(&uri).unwrap();
        assert_eq!(snapshot.text.to_string(), "unchanged");
    }

    #[test]
    fn manager_save_on_unopened_document_errors() {
        let mut manager = DocumentManager::new();
        let uri = Uri::from("file:///missing.d".to_string());
        assert!(manager.save(&uri, Some("x".into())).is_err());
    }
}
