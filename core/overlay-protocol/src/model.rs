use rkyv::{Archive, Deserialize, Serialize};
use crate::ids::{CodeId, DocumentId, GroupId, SpanId, SpanKey};
use alloc::string::String;
use alloc::vec::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A positioned token of a document.
///
/// `index` is both the position in the token sequence and the join key used
/// by span annotations. Character offsets count Unicode scalar values.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct Token {
    pub index: u32,
    pub text: String,
    pub begin_char: u32,
    pub end_char: u32,
    pub whitespace_after: bool,
    pub newline_count: u32,
}

/// A labeled, colored category assignable to spans.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct Code {
    pub id: CodeId,
    pub name: String,
    pub color: String,
}

/// A span annotation as delivered by the annotation source.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct SpanRecord {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<SpanId>,
    pub begin_token: u32,
    /// Exclusive.
    pub end_token: u32,
    pub code: Code,
    #[cfg_attr(feature = "serde", serde(default))]
    pub groups: Vec<GroupId>,
}

/// A span annotation owned by a session.
///
/// Spans are never edited in place: a modification produces a new value with
/// a fresh `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct AnnotationSpan {
    pub key: SpanKey,
    pub id: Option<SpanId>,
    pub begin_token: u32,
    /// Exclusive.
    pub end_token: u32,
    pub code: Code,
    pub groups: Vec<GroupId>,
}

impl AnnotationSpan {
    pub fn from_record(key: SpanKey, record: SpanRecord) -> Self {
        Self {
            key,
            id: record.id,
            begin_token: record.begin_token,
            end_token: record.end_token,
            code: record.code,
            groups: record.groups,
        }
    }

    pub fn to_record(&self) -> SpanRecord {
        SpanRecord {
            id: self.id,
            begin_token: self.begin_token,
            end_token: self.end_token,
            code: self.code.clone(),
            groups: self.groups.clone(),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.id.is_none()
    }

    pub fn range(&self) -> SelectionRange {
        SelectionRange::new(self.begin_token, self.end_token)
    }

    pub fn covers(&self, token: u32) -> bool {
        self.begin_token <= token && token < self.end_token
    }
}

/// A token-granular range. `end_token` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct SelectionRange {
    pub begin_token: u32,
    pub end_token: u32,
}

impl SelectionRange {
    pub const fn new(begin_token: u32, end_token: u32) -> Self {
        Self { begin_token, end_token }
    }

    pub fn len(&self) -> u32 {
        self.end_token.saturating_sub(self.begin_token)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The units currently intersecting the viewport, before overscan is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
pub struct ViewportWindow {
    pub first_visible_unit: usize,
    pub last_visible_unit: usize,
    pub overscan: usize,
}

/// A tokenized document bundled with its annotation layer.
///
/// This is the interchange and archive format: JSON through serde, compiled
/// binaries through rkyv.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
pub struct AnnotatedDocument {
    pub version: u32,
    pub document_id: DocumentId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub text: String,
    pub tokens: Vec<String>,
    pub token_character_offsets: Vec<(u32, u32)>,
    /// Sentence boundaries as `[begin, end)` token ranges. Empty when the
    /// source did not segment sentences.
    #[cfg_attr(feature = "serde", serde(default))]
    pub sentence_token_ranges: Vec<(u32, u32)>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub spans: Vec<SpanRecord>,
}
