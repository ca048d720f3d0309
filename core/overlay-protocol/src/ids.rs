use rkyv::{Archive, Deserialize, Serialize};

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

macro_rules! define_id {
    ($name:ident, $repr:ty, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize)]
        #[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        #[archive(check_bytes)]
        #[repr(transparent)]
        pub struct $name(pub $repr);

        impl $name {
            pub const fn new(id: $repr) -> Self {
                Self(id)
            }

            pub const fn get(self) -> $repr {
                self.0
            }
        }

        impl From<$repr> for $name {
            fn from(id: $repr) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $repr {
            fn from(id: $name) -> $repr {
                id.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(DocumentId, u32, "Backend identifier of a source document.");
define_id!(SpanId, u32, "Persisted identifier of a span annotation. Unset while a span is pending.");
define_id!(CodeId, u32, "Identifier of a code (a labeled, colored category).");
define_id!(GroupId, u32, "Identifier of a span group.");
define_id!(
    SpanKey,
    u64,
    "Session-local creation-sequence key of a span. Stacking order follows this key."
);
