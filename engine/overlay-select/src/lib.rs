//! Maps a live text selection onto a token-granular range.
//!
//! An endpoint that could not be attributed to a token element (the selection
//! started or ended outside the annotatable text) is `None`.

use overlay_protocol::SelectionRange;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// One end of a selection, attributed to a token element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub token: u32,
    /// Character offset inside the token's text.
    pub offset: u32,
}

/// Relative DOM position of the anchor and the focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentOrder {
    AnchorBeforeFocus,
    FocusBeforeAnchor,
    Same,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSelection {
    pub anchor: Option<SelectionPoint>,
    pub focus: Option<SelectionPoint>,
    pub document_order: DocumentOrder,
}

impl RawSelection {
    pub fn new(anchor: SelectionPoint, focus: SelectionPoint, document_order: DocumentOrder) -> Self {
        Self { anchor: Some(anchor), focus: Some(focus), document_order }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!((self.anchor, self.focus), (Some(a), Some(f)) if a == f)
    }
}

/// Resolves a selection to whole tokens.
///
/// Returns `None` when the selection is collapsed or an endpoint lies outside
/// the token elements. Selections that start or end mid-token are widened to
/// cover the whole token, and the result does not depend on drag direction.
pub fn resolve(selection: &RawSelection) -> Option<SelectionRange> {
    let (Some(anchor), Some(focus)) = (selection.anchor, selection.focus) else {
        trace!("selection endpoint outside token elements");
        return None;
    };
    if anchor == focus {
        trace!(token = anchor.token, "collapsed selection");
        return None;
    }

    let (first, last) = match selection.document_order {
        DocumentOrder::FocusBeforeAnchor => (focus, anchor),
        DocumentOrder::AnchorBeforeFocus | DocumentOrder::Same => (anchor, focus),
    };

    // The DOM order may disagree with token order inside nested markup.
    let begin = first.token.min(last.token);
    let end = first.token.max(last.token).checked_add(1)?;
    Some(SelectionRange::new(begin, end))
}

/// Like [`resolve`], but also rejects endpoints past the current token count,
/// which happens when the DOM still shows a previous tokenization.
pub fn resolve_bounded(selection: &RawSelection, token_count: usize) -> Option<SelectionRange> {
    let stale = [selection.anchor, selection.focus]
        .into_iter()
        .flatten()
        .find(|point| point.token as usize >= token_count);
    if let Some(point) = stale {
        trace!(token = point.token, token_count, "selection endpoint past the last token");
        return None;
    }
    resolve(selection)
}
