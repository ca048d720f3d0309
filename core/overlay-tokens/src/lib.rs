//! Token model builder: tokenizer output -> positioned token records.

use overlay_protocol::Token;
use thiserror::Error;
use tracing::debug;

/// The tokenizer output is internally inconsistent; the document cannot be
/// rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedTokenization {
    #[error("{tokens} tokens but {offsets} character offset pairs")]
    LengthMismatch { tokens: usize, offsets: usize },

    #[error("token {index} has inverted offsets ({begin}, {end})")]
    InvertedOffsets { index: usize, begin: u32, end: u32 },

    #[error("token {index} begins at {begin}, before the previous token ends at {previous_end}")]
    OverlappingOffsets { index: usize, begin: u32, previous_end: u32 },

    #[error("token {index} ends at {end}, past the end of the text ({text_len} chars)")]
    OffsetOutOfBounds { index: usize, end: u32, text_len: usize },
}

/// Builds the token sequence of a document.
///
/// `character_offsets[i]` is the `[begin, end)` char span of `tokens[i]` in
/// `raw_text`. The result has exactly one record per input token.
pub fn build(
    raw_text: &str,
    tokens: &[String],
    character_offsets: &[(u32, u32)],
) -> Result<Vec<Token>, MalformedTokenization> {
    if tokens.len() != character_offsets.len() {
        return Err(MalformedTokenization::LengthMismatch {
            tokens: tokens.len(),
            offsets: character_offsets.len(),
        });
    }

    validate_offsets(raw_text, character_offsets)?;

    let built: Vec<Token> = tokens
        .iter()
        .zip(character_offsets)
        .enumerate()
        .map(|(i, (text, &(begin, end)))| {
            let whitespace_after = character_offsets
                .get(i + 1)
                .map(|&(next_begin, _)| next_begin > end)
                .unwrap_or(false);

            Token {
                index: i as u32,
                text: text.clone(),
                begin_char: begin,
                end_char: end,
                whitespace_after,
                newline_count: newline_count(text),
            }
        })
        .collect();

    debug!(tokens = built.len(), "built token model");
    Ok(built)
}

fn validate_offsets(raw_text: &str, offsets: &[(u32, u32)]) -> Result<(), MalformedTokenization> {
    let text_len = raw_text.chars().count();
    let mut previous_end = 0u32;

    for (index, &(begin, end)) in offsets.iter().enumerate() {
        if begin > end {
            return Err(MalformedTokenization::InvertedOffsets { index, begin, end });
        }
        if index > 0 && begin < previous_end {
            return Err(MalformedTokenization::OverlappingOffsets { index, begin, previous_end });
        }
        if end as usize > text_len {
            return Err(MalformedTokenization::OffsetOutOfBounds { index, end, text_len });
        }
        previous_end = end;
    }
    Ok(())
}

/// Line breaks carried by the token's own text (not the gap after it).
fn newline_count(text: &str) -> u32 {
    text.chars().filter(|&c| c == '\n').count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_whitespace_flag_from_gap() {
        let tokens = build("foo bar", &strings(&["foo", "bar"]), &[(0, 3), (4, 7)]).unwrap();

        assert!(tokens[0].whitespace_after);
        assert!(!tokens[1].whitespace_after);
    }

    #[test]
    fn test_adjacent_tokens_have_no_whitespace() {
        let tokens = build("cat.", &strings(&["cat", "."]), &[(0, 3), (3, 4)]).unwrap();
        assert!(!tokens[0].whitespace_after);
    }

    #[test]
    fn test_newline_count_comes_from_token_text() {
        let text = "one\n\ntwo";
        let tokens = build(text, &strings(&["one", "\n\n", "two"]), &[(0, 3), (3, 5), (5, 8)]).unwrap();

        assert_eq!(tokens[0].newline_count, 0);
        assert_eq!(tokens[1].newline_count, 2);
        assert_eq!(tokens[2].newline_count, 0);
    }

    #[test]
    fn test_empty_input_is_not_an_error() {
        assert!(build("", &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn test_length_mismatch() {
        let err = build("foo bar", &strings(&["foo", "bar"]), &[(0, 3)]).unwrap_err();
        assert_eq!(err, MalformedTokenization::LengthMismatch { tokens: 2, offsets: 1 });
    }

    #[test]
    fn test_overlapping_offsets_rejected() {
        let err = build("foobar", &strings(&["foo", "oba"]), &[(0, 3), (2, 5)]).unwrap_err();
        assert!(matches!(err, MalformedTokenization::OverlappingOffsets { index: 1, .. }));
    }

    #[test]
    fn test_inverted_offsets_rejected() {
        let err = build("foo bar", &strings(&["foo", "bar"]), &[(0, 3), (7, 4)]).unwrap_err();
        assert_eq!(err, MalformedTokenization::InvertedOffsets { index: 1, begin: 7, end: 4 });
    }

    #[test]
    fn test_offsets_count_chars_not_bytes() {
        // "άνθρωπος" is 8 chars but 16 bytes.
        let tokens = build("ο άνθρωπος", &strings(&["ο", "άνθρωπος"]), &[(0, 1), (2, 10)]).unwrap();
        assert_eq!(tokens[1].end_char, 10);

        let err = build("ο", &strings(&["ο"]), &[(0, 2)]).unwrap_err();
        assert!(matches!(err, MalformedTokenization::OffsetOutOfBounds { index: 0, .. }));
    }

    proptest! {
        #[test]
        fn test_token_count_matches_input(words in proptest::collection::vec("[a-z]{1,6}", 0..40)) {
            let text = words.join(" ");
            let mut offsets = Vec::new();
            let mut cursor = 0u32;
            for w in &words {
                let len = w.chars().count() as u32;
                offsets.push((cursor, cursor + len));
                cursor += len + 1;
            }

            let tokens = build(&text, &words, &offsets).unwrap();
            prop_assert_eq!(tokens.len(), words.len());
            for (i, t) in tokens.iter().enumerate() {
                prop_assert_eq!(t.index as usize, i);
                prop_assert_eq!(t.whitespace_after, i + 1 < words.len());
            }
        }
    }
}
