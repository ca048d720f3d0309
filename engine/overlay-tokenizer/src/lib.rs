//! Plain-text tokenizer producing the same shape as the backend token source:
//! token strings, char offsets and sentence token ranges.

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{anychar, satisfy},
    combinator::{map, recognize},
    IResult,
};
use overlay_protocol::{AnnotatedDocument, DocumentId};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawKind {
    Word,
    Newlines,
    Punct(char),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokenization {
    pub tokens: Vec<String>,
    pub token_character_offsets: Vec<(u32, u32)>,
    pub sentence_token_ranges: Vec<(u32, u32)>,
}

impl Tokenization {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Bundles the tokenization with its text into an unannotated document.
    pub fn into_document(self, document_id: DocumentId, text: &str) -> AnnotatedDocument {
        AnnotatedDocument {
            version: 1,
            document_id,
            text: text.to_string(),
            tokens: self.tokens,
            token_character_offsets: self.token_character_offsets,
            sentence_token_ranges: self.sentence_token_ranges,
            spans: Vec::new(),
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '\''
}

fn is_blank(c: char) -> bool {
    c != '\n' && c.is_whitespace()
}

fn raw_token(input: &str) -> IResult<&str, (&str, RawKind)> {
    alt((
        map(take_while1(is_word_char), |s| (s, RawKind::Word)),
        map(take_while1(|c: char| c == '\n'), |s| (s, RawKind::Newlines)),
        map(recognize(satisfy(|c| !c.is_whitespace())), |s: &str| {
            let c = s.chars().next().unwrap_or_default();
            (s, RawKind::Punct(c))
        }),
    ))(input)
}

fn ends_sentence(kind: RawKind, text: &str) -> bool {
    match kind {
        RawKind::Punct(c) => matches!(c, '.' | '!' | '?'),
        // A blank line closes a paragraph.
        RawKind::Newlines => text.len() > 1,
        RawKind::Word => false,
    }
}

/// Splits `text` into words, single punctuation marks and newline runs.
///
/// Spaces and tabs separate tokens but are not tokens themselves; newline
/// runs are, so the renderer can place line breaks. Offsets count chars.
pub fn tokenize(text: &str) -> Tokenization {
    let mut input = text;
    let mut char_pos = 0u32;
    let mut out = Tokenization::default();
    let mut sentence_start = 0u32;

    loop {
        // 1. Skip blanks
        let (rest, blanks) = match take_while::<_, _, nom::error::Error<&str>>(is_blank)(input) {
            Ok(res) => res,
            Err(_) => break,
        };
        char_pos += blanks.chars().count() as u32;
        input = rest;

        if input.is_empty() {
            break;
        }

        // 2. Match a token
        match raw_token(input) {
            Ok((rest, (slice, kind))) => {
                let len = slice.chars().count() as u32;
                let index = out.tokens.len() as u32;

                out.tokens.push(slice.to_string());
                out.token_character_offsets.push((char_pos, char_pos + len));
                char_pos += len;
                input = rest;

                if ends_sentence(kind, slice) {
                    out.sentence_token_ranges.push((sentence_start, index + 1));
                    sentence_start = index + 1;
                }
            }
            Err(_) => {
                // Skip one char to recover
                match anychar::<_, nom::error::Error<&str>>(input) {
                    Ok((rest, _)) => {
                        char_pos += 1;
                        input = rest;
                    }
                    Err(_) => break,
                }
            }
        }
    }

    let count = out.tokens.len() as u32;
    if sentence_start < count {
        out.sentence_token_ranges.push((sentence_start, count));
    }

    debug!(tokens = out.len(), sentences = out.sentence_token_ranges.len(), "tokenized text");
    out
}
