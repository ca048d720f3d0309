use overlay_protocol::{Code, GroupId, SelectionRange, SpanId, SpanKey};
use serde::{Deserialize, Serialize};

/// Notifications for the owner of annotation persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OverlayEvent {
    /// A new span is wanted over `range`. Without a code the host still has
    /// to ask the user for one; with a code the span already exists pending
    /// under `key`.
    SpanRequested {
        range: SelectionRange,
        code: Option<Code>,
        key: Option<SpanKey>,
    },
    /// An existing span was replaced by a new version.
    SpanUpdated {
        previous: SpanKey,
        key: SpanKey,
        id: Option<SpanId>,
        range: SelectionRange,
        code: Code,
    },
    SpanDeleted {
        key: SpanKey,
        id: Option<SpanId>,
    },
    GroupsChanged {
        key: SpanKey,
        id: Option<SpanId>,
        groups: Vec<GroupId>,
    },
}
