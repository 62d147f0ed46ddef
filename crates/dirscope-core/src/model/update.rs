//! Messages into and out of the directory model.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use crate::fs::entry::Entry;
use crate::size::SizeReport;
use crate::watch::WatchMessage;

/// Everything a background producer can send to the model.
#[derive(Debug, Clone)]
pub enum Inbound {
    Size(SizeReport),
    Watch(WatchMessage),
}

impl From<SizeReport> for Inbound {
    fn from(report: SizeReport) -> Self {
        Inbound::Size(report)
    }
}

impl From<WatchMessage> for Inbound {
    fn from(message: WatchMessage) -> Self {
        Inbound::Watch(message)
    }
}

/// What an accepted mutation did to a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingChange {
    /// An entry was added or re-read.
    Changed(Entry),
    /// A background size computation finished for this entry.
    Sized { entry: Entry, elapsed: Duration },
    Removed(Entry),
    Renamed { from: OsString, entry: Entry },
    /// The listing was re-read as a whole.
    Reloaded,
    /// Change notification stopped; the listing may go stale.
    WatchLost(String),
}

impl ListingChange {
    /// The entry this change concerns, if it concerns a single entry.
    pub fn entry(&self) -> Option<&Entry> {
        match self {
            ListingChange::Changed(entry)
            | ListingChange::Sized { entry, .. }
            | ListingChange::Removed(entry)
            | ListingChange::Renamed { entry, .. } => Some(entry),
            ListingChange::Reloaded | ListingChange::WatchLost(_) => None,
        }
    }
}

/// One published mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingUpdate {
    pub path: PathBuf,
    pub version: u64,
    pub change: ListingChange,
}
