pub mod issues;
pub mod marks;

pub use issues::SpanIssue;
pub use marks::MarkBand;

use overlay_protocol::{AnnotationSpan, MarkFlags, SpanKey};
use tracing::{debug, warn};

/// Token index -> spans covering that token.
///
/// Covering lists are ordered by span key (creation order), never by the
/// order spans were handed to [`build_index`], so stacked marks keep their
/// position across rebuilds.
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    /// Accepted spans, sorted by key.
    spans: Vec<AnnotationSpan>,
    /// Positions into `spans`, per token.
    covering: Vec<Vec<u32>>,
}

/// Builds the index over `token_count` tokens.
///
/// Spans whose range is empty, inverted or past the last token are dropped
/// and returned as issues; every other span is indexed.
pub fn build_index<'a, I>(spans: I, token_count: usize) -> (AnnotationIndex, Vec<SpanIssue>)
where
    I: IntoIterator<Item = &'a AnnotationSpan>,
{
    let mut accepted = Vec::new();
    let mut issues = Vec::new();

    for span in spans {
        match check_span(span, token_count) {
            Ok(()) => accepted.push(span.clone()),
            Err(issue) => {
                warn!(%issue, "dropping span from annotation index");
                issues.push(issue);
            }
        }
    }

    // Stable: duplicate keys keep their input order.
    accepted.sort_by_key(|s| s.key);

    let mut covering = vec![Vec::new(); token_count];
    for (pos, span) in accepted.iter().enumerate() {
        for t in span.begin_token..span.end_token {
            covering[t as usize].push(pos as u32);
        }
    }

    debug!(spans = accepted.len(), dropped = issues.len(), token_count, "rebuilt annotation index");
    (AnnotationIndex { spans: accepted, covering }, issues)
}

fn check_span(span: &AnnotationSpan, token_count: usize) -> Result<(), SpanIssue> {
    if span.begin_token >= span.end_token {
        return Err(SpanIssue::InvalidSpan {
            key: span.key,
            id: span.id,
            begin: span.begin_token,
            end: span.end_token,
        });
    }
    if span.end_token as usize > token_count {
        return Err(SpanIssue::MissingTokenReference {
            key: span.key,
            id: span.id,
            end_token: span.end_token,
            token_count,
        });
    }
    Ok(())
}

/// The inline tag of a span is drawn exactly once, on its first token.
pub fn is_span_starting_at(span: &AnnotationSpan, token: u32) -> bool {
    span.begin_token == token
}

impl AnnotationIndex {
    pub fn token_count(&self) -> usize {
        self.covering.len()
    }

    /// All indexed spans in creation order.
    pub fn spans(&self) -> &[AnnotationSpan] {
        &self.spans
    }

    pub fn span(&self, key: SpanKey) -> Option<&AnnotationSpan> {
        self.spans
            .binary_search_by_key(&key, |s| s.key)
            .ok()
            .map(|pos| &self.spans[pos])
    }

    /// Spans covering `token`, bottom of the stack first. Empty for tokens
    /// outside the document.
    pub fn spans_at(&self, token: u32) -> impl Iterator<Item = &AnnotationSpan> + '_ {
        self.covering
            .get(token as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
            .iter()
            .map(move |&pos| &self.spans[pos as usize])
    }

    pub fn covering_count(&self, token: u32) -> usize {
        self.covering.get(token as usize).map_or(0, Vec::len)
    }

    /// Mark bands to draw over `token`.
    ///
    /// Caps are only rounded when exactly one span covers the token; stacked
    /// marks are plain bands of `100 / count` percent each.
    pub fn marks_at(&self, token: u32) -> Vec<MarkBand> {
        let count = self.covering_count(token);
        if count == 0 {
            return Vec::new();
        }
        let height = 100.0 / count as f32;

        self.spans_at(token)
            .enumerate()
            .map(|(slot, span)| {
                let mut flags = MarkFlags::empty();
                if is_span_starting_at(span, token) {
                    flags |= MarkFlags::SHOWS_TAG;
                }
                if count == 1 {
                    flags.set(MarkFlags::ROUNDED_START, span.begin_token == token);
                    flags.set(MarkFlags::ROUNDED_END, span.end_token == token + 1);
                }

                MarkBand {
                    key: span.key,
                    begin_token: span.begin_token,
                    end_token: span.end_token,
                    code_id: span.code.id,
                    label: span.code.name.clone(),
                    color: span.code.color.clone(),
                    offset_percent: slot as f32 * height,
                    height_percent: height,
                    flags,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overlay_protocol::{Code, CodeId, SpanId};
    use proptest::prelude::*;

    fn code(id: u32, name: &str, color: &str) -> Code {
        Code { id: CodeId(id), name: name.to_string(), color: color.to_string() }
    }

    fn span(key: u64, begin: u32, end: u32) -> AnnotationSpan {
        AnnotationSpan {
            key: SpanKey(key),
            id: Some(SpanId(key as u32)),
            begin_token: begin,
            end_token: end,
            code: code(1, "Animal", "#ff0000"),
            groups: vec![],
        }
    }

    fn keys_at(index: &AnnotationIndex, token: u32) -> Vec<u64> {
        index.spans_at(token).map(|s| s.key.0).collect()
    }

    #[test]
    fn test_inverted_span_is_isolated() {
        let spans = vec![span(1, 0, 2), span(2, 5, 3)];
        let (index, issues) = build_index(&spans, 10);

        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], SpanIssue::InvalidSpan { begin: 5, end: 3, .. }));
        assert_eq!(keys_at(&index, 0), vec![1]);
        assert_eq!(keys_at(&index, 1), vec![1]);
        for t in 2..10 {
            assert_eq!(index.covering_count(t), 0);
        }
    }

    #[test]
    fn test_stale_span_is_missing_token_reference() {
        let spans = vec![span(1, 2, 12)];
        let (index, issues) = build_index(&spans, 10);

        assert!(index.spans().is_empty());
        assert_eq!(
            issues,
            vec![SpanIssue::MissingTokenReference {
                key: SpanKey(1),
                id: Some(SpanId(1)),
                end_token: 12,
                token_count: 10,
            }]
        );
    }

    #[test]
    fn test_empty_span_is_invalid() {
        let (_, issues) = build_index(&[span(1, 4, 4)], 10);
        assert_eq!(issues[0].key(), SpanKey(1));
    }

    #[test]
    fn test_stacking_follows_creation_order() {
        let a = span(1, 0, 4);
        let b = span(2, 2, 6);

        let (forward, _) = build_index(&[a.clone(), b.clone()], 8);
        let (reversed, _) = build_index(&[b, a], 8);

        for t in 0..8 {
            assert_eq!(keys_at(&forward, t), keys_at(&reversed, t));
        }
        assert_eq!(keys_at(&forward, 3), vec![1, 2]);
    }

    #[test]
    fn test_singleton_mark_has_rounded_caps() {
        let (index, _) = build_index(&[span(1, 1, 2)], 3);
        let marks = index.marks_at(1);

        assert_eq!(marks.len(), 1);
        assert_eq!(
            marks[0].flags,
            MarkFlags::ROUNDED_START | MarkFlags::ROUNDED_END | MarkFlags::SHOWS_TAG
        );
        assert_eq!(marks[0].height_percent, 100.0);
        assert!(index.marks_at(0).is_empty());
        assert!(index.marks_at(2).is_empty());
    }

    #[test]
    fn test_overlapping_marks_are_plain_bands() {
        let (index, _) = build_index(&[span(1, 0, 3), span(2, 1, 2)], 3);
        let marks = index.marks_at(1);

        assert_eq!(marks.len(), 2);
        assert_eq!(marks[0].flags, MarkFlags::empty());
        assert_eq!(marks[1].flags, MarkFlags::SHOWS_TAG);
        assert_eq!(marks[0].height_percent, 50.0);
        assert_eq!(marks[1].offset_percent, 50.0);

        // Token 0 is covered by span 1 alone: start cap only.
        let first = index.marks_at(0);
        assert_eq!(first[0].flags, MarkFlags::ROUNDED_START | MarkFlags::SHOWS_TAG);
        assert_eq!(index.marks_at(2)[0].flags, MarkFlags::ROUNDED_END);
    }

    #[test]
    fn test_span_lookup_by_key() {
        let (index, _) = build_index(&[span(5, 0, 1), span(2, 1, 2)], 2);
        assert_eq!(index.span(SpanKey(5)).map(|s| s.begin_token), Some(0));
        assert!(index.span(SpanKey(3)).is_none());
        assert_eq!(index.spans_at(99).count(), 0);
    }

    proptest! {
        #[test]
        fn test_index_is_complete(
            ranges in proptest::collection::vec((0u32..30, 1u32..10), 0..20)
        ) {
            let spans: Vec<AnnotationSpan> = ranges
                .iter()
                .enumerate()
                .map(|(i, &(begin, len))| span(i as u64, begin, (begin + len).min(30)))
                .filter(|s| s.begin_token < s.end_token)
                .collect();

            let (index, issues) = build_index(&spans, 30);
            prop_assert!(issues.is_empty());

            for s in &spans {
                for t in s.begin_token..s.end_token {
                    prop_assert!(index.spans_at(t).any(|c| c.key == s.key));
                }
            }
        }

        #[test]
        fn test_order_is_independent_of_input_order(
            ranges in proptest::collection::vec((0u32..20, 1u32..6), 1..12),
            rotate in 0usize..12
        ) {
            let spans: Vec<AnnotationSpan> = ranges
                .iter()
                .enumerate()
                .map(|(i, &(begin, len))| span(i as u64, begin, begin + len))
                .collect();
            let mut shuffled = spans.clone();
            let shift = rotate % shuffled.len();
            shuffled.rotate_left(shift);

            let (a, _) = build_index(&spans, 26);
            let (b, _) = build_index(&shuffled, 26);
            for t in 0..26 {
                prop_assert_eq!(keys_at(&a, t), keys_at(&b, t));
            }
        }
    }
}
