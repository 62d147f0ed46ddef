//! Directory entry representation.

use std::ffi::{OsStr, OsString};
use std::fs::Metadata;
use std::time::SystemTime;

/// What kind of filesystem object an [`Entry`] is.
///
/// Detected from `symlink_metadata`, so a symlink is reported as
/// [`EntryKind::Symlink`] regardless of its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    /// Classifies `metadata` obtained without following symlinks.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let ft = metadata.file_type();
        if ft.is_symlink() {
            EntryKind::Symlink
        } else if ft.is_dir() {
            EntryKind::Directory
        } else if ft.is_file() {
            EntryKind::File
        } else {
            EntryKind::Other
        }
    }
}

/// The size column of an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySize {
    /// Nobody has asked for this directory's size yet.
    Unknown,
    /// A recursive computation is queued or running.
    Pending,
    /// Size in bytes (file length, or recursive total for directories).
    Known(u64),
    /// The size could not be determined; the reason is shown on demand.
    Unavailable(String),
}

impl EntrySize {
    /// Returns the byte count if known.
    pub fn bytes(&self) -> Option<u64> {
        match self {
            EntrySize::Known(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntrySize::Pending)
    }
}

/// One child of a listed directory.
///
/// Identity is `(parent path, name)` with the name kept as the raw
/// `OsString`, so names that are not valid UTF-8 stay distinct and joinable.
/// The parent lives on the owning [`Listing`](crate::fs::listing::Listing).
/// Only the directory model mutates entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    name: OsString,
    kind: EntryKind,
    size: EntrySize,
    modified: Option<SystemTime>,
    permissions: Option<u32>,
}

impl Entry {
    /// Builds an entry from a name and its (non-following) metadata.
    ///
    /// Plain files get their length as a known size; everything else
    /// starts [`EntrySize::Unknown`].
    pub fn from_metadata(name: &OsStr, metadata: &Metadata) -> Self {
        let kind = EntryKind::from_metadata(metadata);
        let size = match kind {
            EntryKind::File => EntrySize::Known(metadata.len()),
            _ => EntrySize::Unknown,
        };
        Self {
            name: name.to_os_string(),
            kind,
            size,
            modified: metadata.modified().ok(),
            permissions: mode_bits(metadata),
        }
    }

    /// Builds an entry without touching the filesystem.
    pub fn new(name: impl Into<OsString>, kind: EntryKind, size: EntrySize) -> Self {
        Self {
            name: name.into(),
            kind,
            size,
            modified: None,
            permissions: None,
        }
    }

    /// The on-disk name, used for path joins and identity.
    pub fn name(&self) -> &OsStr {
        &self.name
    }

    /// The name normalised to NFC for display; invalid UTF-8 is replaced.
    ///
    /// macOS stores filenames decomposed, which renders Hangul and accented
    /// characters as separate code points.
    pub fn display_name(&self) -> String {
        crate::nfc_string(&self.name.to_string_lossy())
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn size(&self) -> &EntrySize {
        &self.size
    }

    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Unix mode bits (`0o755` style), when the platform exposes them.
    pub fn permissions(&self) -> Option<u32> {
        self.permissions
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Returns `true` if the name starts with `.`.
    pub fn is_hidden(&self) -> bool {
        self.name.as_encoded_bytes().starts_with(b".")
    }

    pub(crate) fn set_size(&mut self, size: EntrySize) {
        self.size = size;
    }

    pub(crate) fn set_name(&mut self, name: &OsStr) {
        self.name = name.to_os_string();
    }
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn mode_bits(_metadata: &Metadata) -> Option<u32> {
    None
}
