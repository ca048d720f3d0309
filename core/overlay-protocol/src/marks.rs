use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

bitflags! {
    /// Styling of a single mark band drawn over a token.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
    pub struct MarkFlags: u8 {
        /// Left cap is rounded: the span starts here and is the only mark on the token.
        const ROUNDED_START = 1;
        /// Right cap is rounded: the span ends here and is the only mark on the token.
        const ROUNDED_END = 2;
        /// The span's inline tag/label is drawn on this token.
        const SHOWS_TAG = 4;
    }
}
