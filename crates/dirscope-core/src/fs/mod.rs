//! File system abstractions for dirscope.
//!
//! [`entry::Entry`] and [`listing::Listing`] form the per-directory snapshot,
//! [`ops`] reads directories with one cheap `stat` per child, and
//! [`preview`] produces text previews behind the [`preview::PreviewSource`]
//! capability.

pub mod entry;
pub mod listing;
pub mod ops;
pub mod preview;

pub use entry::{Entry, EntryKind, EntrySize};
pub use listing::Listing;
pub use preview::{PreviewLines, PreviewSource, TextPreviewer};
