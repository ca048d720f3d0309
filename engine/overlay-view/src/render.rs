use std::ops::Range;

use overlay_index::{AnnotationIndex, MarkBand};
use overlay_protocol::Token;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedToken {
    pub index: u32,
    pub text: String,
    pub whitespace_after: bool,
    pub newline_count: u32,
    pub marks: Vec<MarkBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TokenSlot {
    Present(RenderedToken),
    /// The unit references a token the document does not have.
    Missing { index: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedUnit {
    pub unit: usize,
    pub slots: Vec<TokenSlot>,
}

impl RenderedUnit {
    pub fn missing_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, TokenSlot::Missing { .. }))
            .count()
    }
}

/// Renders the tokens of one unit with their mark stacks.
pub fn render_unit(unit: usize, range: Range<u32>, tokens: &[Token], index: &AnnotationIndex) -> RenderedUnit {
    let slots: Vec<TokenSlot> = range
        .map(|i| match tokens.get(i as usize) {
            Some(token) => TokenSlot::Present(RenderedToken {
                index: token.index,
                text: token.text.clone(),
                whitespace_after: token.whitespace_after,
                newline_count: token.newline_count,
                marks: index.marks_at(token.index),
            }),
            None => TokenSlot::Missing { index: i },
        })
        .collect();

    let rendered = RenderedUnit { unit, slots };
    let missing = rendered.missing_count();
    if missing > 0 {
        warn!(unit, missing, token_count = tokens.len(), "unit references missing tokens");
    }
    rendered
}
