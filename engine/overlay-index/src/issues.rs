use overlay_protocol::{SpanId, SpanKey};
use thiserror::Error;

/// A span that was left out of the index. Never fatal: the rest of the
/// overlay is still built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpanIssue {
    #[error("span {key} (id {id:?}) has an empty or inverted range [{begin}, {end})")]
    InvalidSpan { key: SpanKey, id: Option<SpanId>, begin: u32, end: u32 },

    #[error("span {key} (id {id:?}) references token {end_token} but the document has {token_count} tokens")]
    MissingTokenReference {
        key: SpanKey,
        id: Option<SpanId>,
        end_token: u32,
        token_count: usize,
    },
}

impl SpanIssue {
    pub fn key(&self) -> SpanKey {
        match self {
            SpanIssue::InvalidSpan { key, .. } | SpanIssue::MissingTokenReference { key, .. } => *key,
        }
    }
}
