//! Versioned snapshot of one directory's children.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::fs::entry::Entry;

/// Ordered, name-unique sequence of [`Entry`] values for one directory.
///
/// `version` grows on every accepted mutation. Consumers can compare it
/// with the last version they rendered to discard stale updates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    path: PathBuf,
    entries: Vec<Entry>,
    version: u64,
    live: bool,
}

impl Listing {
    /// Creates a listing; entries are sorted by name and deduplicated.
    pub fn new(path: PathBuf, mut entries: Vec<Entry>, version: u64) -> Self {
        entries.sort_by(|a, b| a.name().cmp(b.name()));
        entries.dedup_by(|a, b| a.name() == b.name());
        Self {
            path,
            entries,
            version,
            live: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Whether change notification is active for this directory.
    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up a child by its raw name.
    pub fn get(&self, name: impl AsRef<OsStr>) -> Option<&Entry> {
        self.position(name.as_ref()).map(|i| &self.entries[i])
    }

    fn position(&self, name: &OsStr) -> Option<usize> {
        self.entries
            .binary_search_by(|e| e.name().cmp(name))
            .ok()
    }

    pub(crate) fn get_mut(&mut self, name: impl AsRef<OsStr>) -> Option<&mut Entry> {
        let idx = self.position(name.as_ref())?;
        Some(&mut self.entries[idx])
    }

    /// Inserts `entry`, replacing any entry with the same name.
    pub(crate) fn upsert(&mut self, entry: Entry) {
        match self
            .entries
            .binary_search_by(|e| e.name().cmp(entry.name()))
        {
            Ok(idx) => self.entries[idx] = entry,
            Err(idx) => self.entries.insert(idx, entry),
        }
    }

    pub(crate) fn remove(&mut self, name: impl AsRef<OsStr>) -> Option<Entry> {
        let idx = self.position(name.as_ref())?;
        Some(self.entries.remove(idx))
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        debug_assert!(version > self.version);
        self.version = version;
    }

    pub(crate) fn set_live(&mut self, live: bool) {
        self.live = live;
    }
}
