//! Directory reading operations.

use std::ffi::OsString;
use std::fs::Metadata;
use std::io;
use std::path::Path;

use crate::error::{CoreError, CoreResult};
use crate::fs::entry::{Entry, EntryKind, EntrySize};

/// Reads the immediate children of a directory without recursing.
///
/// Metadata is taken with `symlink_metadata`, so this is one cheap `stat`
/// per child. Children that vanish between `readdir` and `stat` are skipped;
/// children that cannot be stated for any other reason are kept with an
/// [`EntrySize::Unavailable`] size. The returned entries are **unsorted**.
///
/// # Errors
///
/// - [`CoreError::NotFound`]: the path does not exist.
/// - [`CoreError::NotADirectory`]: the path is not a directory.
/// - [`CoreError::PermissionDenied`]: read access is denied.
/// - [`CoreError::Io`]: any other I/O error.
pub fn read_entries(path: &Path) -> CoreResult<Vec<Entry>> {
    let meta = std::fs::metadata(path).map_err(|e| CoreError::from_io(e, path))?;
    if !meta.is_dir() {
        return Err(CoreError::NotADirectory(path.to_path_buf()));
    }

    let read_dir = std::fs::read_dir(path).map_err(|e| CoreError::from_io(e, path))?;

    let mut entries = Vec::new();
    for dir_entry in read_dir {
        // a failed readdir step carries no name to show
        let Ok(dir_entry) = dir_entry else { continue };
        let metadata = std::fs::symlink_metadata(dir_entry.path());
        if let Some(entry) = child_entry(dir_entry.file_name(), metadata) {
            entries.push(entry);
        }
    }

    Ok(entries)
}

/// Builds a child entry from its stat result.
///
/// `None` only when the child disappeared after it was listed.
fn child_entry(name: OsString, metadata: io::Result<Metadata>) -> Option<Entry> {
    match metadata {
        Ok(metadata) => Some(Entry::from_metadata(&name, &metadata)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::debug!(name = ?name, error = %e, "child stat failed");
            Some(Entry::new(
                name,
                EntryKind::Other,
                EntrySize::Unavailable(e.to_string()),
            ))
        }
    }
}

/// Stats a single path and builds its [`Entry`].
///
/// # Errors
///
/// [`CoreError::NotFound`] / [`CoreError::PermissionDenied`] / [`CoreError::Io`]
/// as classified by [`CoreError::from_io`].
pub fn stat_entry(path: &Path) -> CoreResult<Entry> {
    let metadata = std::fs::symlink_metadata(path).map_err(|e| CoreError::from_io(e, path))?;
    let name = path.file_name().unwrap_or_default();
    Ok(Entry::from_metadata(name, &metadata))
}

/// Returns `true` when `path` can be descended into (a directory, or a
/// symlink resolving to one).
pub fn is_navigable_dir(path: &Path) -> bool {
    std::fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}
