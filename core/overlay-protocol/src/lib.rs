#![no_std] // Shared by the wasm platform and native tools

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod ids;
pub mod marks;

pub use ids::{CodeId, DocumentId, GroupId, SpanId, SpanKey};
pub use marks::MarkFlags;

pub mod model;
pub use model::*;
