use overlay_protocol::{CodeId, MarkFlags, SpanKey};
use serde::Serialize;

/// One horizontal band of a token's mark stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkBand {
    pub key: SpanKey,
    pub begin_token: u32,
    /// Exclusive.
    pub end_token: u32,
    pub code_id: CodeId,
    pub label: String,
    pub color: String,
    /// Distance from the top of the token box, in percent.
    pub offset_percent: f32,
    pub height_percent: f32,
    pub flags: MarkFlags,
}

impl MarkBand {
    pub fn shows_tag(&self) -> bool {
        self.flags.contains(MarkFlags::SHOWS_TAG)
    }

    pub fn ends_at(&self, token: u32) -> bool {
        self.end_token == token + 1
    }
}
