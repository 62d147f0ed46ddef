//! dirscope core library: UI-agnostic directory browsing.
//!
//! `dirscope-core` keeps an up-to-date, versioned view of the directories
//! the user is looking at. Listings are read synchronously; recursive
//! directory sizes come from a bounded worker pool and external changes
//! from filesystem notifications, both merged on the caller's thread. The
//! TUI (`dirscope-tui`) only renders and decodes keys.
//!
//! # Modules
//!
//! - [`fs`]: entries, listings, directory reads and text previews.
//! - [`size`]: cancellable recursive size computation on a worker pool.
//! - [`watch`]: coalesced per-directory change notifications.
//! - [`model`]: the [`DirectoryModel`] that merges both into listings.
//! - [`nav`]: the modal [`Navigator`], history, sorting and filtering.
//! - [`config`]: TOML settings and key bindings.
//! - [`error`]: unified error type ([`CoreError`]) and result alias ([`CoreResult`]).

pub mod config;
pub mod error;
pub mod fs;
pub mod model;
pub mod nav;
pub mod size;
pub mod watch;

pub use config::keymap::Keymap;
pub use config::settings::Config;
pub use error::{CoreError, CoreResult};
pub use fs::entry::{Entry, EntryKind, EntrySize};
pub use fs::listing::Listing;
pub use fs::preview::{PreviewSource, TextPreviewer};
pub use model::{DirectoryModel, ListingChange, ListingUpdate, ModelOptions};
pub use nav::controller::{NavState, Navigator, Preview, ViewOptions};
pub use nav::filter::{SortDirection, SortField, SortKey};
pub use nav::history::History;
pub use nav::{Command, CommandSource, Mode, Opener};
pub use size::{SizeComputer, SizeHandle, SizeReport, SizeState};
pub use watch::{WatchBackend, WatchEvent, WatchHandle, Watcher};

/// Normalises a string to NFC (composed) form.
///
/// macOS stores filenames in NFD (decomposed), which makes Korean Hangul
/// render as individual Jamo.
pub fn nfc_string(s: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    s.nfc().collect()
}
