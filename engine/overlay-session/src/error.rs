use overlay_protocol::SpanKey;
use overlay_tokens::MalformedTokenization;
use overlay_view::ViewError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("document could not be loaded: {0}")]
    Tokenization(#[from] MalformedTokenization),

    #[error("invalid configuration: {0}")]
    Config(#[from] ViewError),

    #[error("no span with key {0}")]
    UnknownSpan(SpanKey),

    #[error("document archive is invalid: {0}")]
    Archive(String),

    #[error("range [{begin}, {end}) does not lie within the document's {token_count} tokens")]
    InvalidRange { begin: u32, end: u32, token_count: usize },
}
