//! Translation of raw notify events into [`WatchEvent`]s, and batching.

use std::path::{Component, Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};

/// A normalized change to a direct child of a watched directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
    Renamed { from: PathBuf, to: PathBuf },
}

impl WatchEvent {
    /// The path whose entry this event affects (the target for renames).
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Removed(p) => p,
            WatchEvent::Renamed { to, .. } => to,
        }
    }
}

/// One step of a batch before rename halves are paired.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Event(WatchEvent),
    RenameFrom(PathBuf, Option<usize>),
    RenameTo(PathBuf, Option<usize>),
}

/// Events collected during one coalescing window.
#[derive(Debug)]
pub(crate) struct Batch {
    root: PathBuf,
    slots: Vec<Slot>,
    root_gone: Option<String>,
    rescan: bool,
}

impl Batch {
    pub(crate) fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            slots: Vec::new(),
            root_gone: None,
            rescan: false,
        }
    }

    /// Reason the watched directory itself disappeared, if it did.
    pub(crate) fn root_gone(&self) -> Option<&str> {
        self.root_gone.as_deref()
    }

    /// Whether the backend reported lost events during this window.
    pub(crate) fn needs_rescan(&self) -> bool {
        self.rescan
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.root_gone.is_none() && !self.rescan
    }

    /// Folds one raw notify event into the batch.
    pub(crate) fn absorb(&mut self, event: notify::Event) {
        if event.need_rescan() {
            self.rescan = true;
            return;
        }
        let tracker = event.attrs.tracker();
        match event.kind {
            EventKind::Access(_) => {}
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
                let from = event.paths[0].clone();
                let to = event.paths[1].clone();
                match (self.direct_child(&from), self.direct_child(&to)) {
                    (true, true) => self.renamed(from, to),
                    (true, false) => self.removed(from),
                    (false, true) => self.created(to),
                    (false, false) => {}
                }
            }
            kind => {
                for path in event.paths {
                    self.absorb_path(&kind, path, tracker);
                }
            }
        }
    }

    fn absorb_path(&mut self, kind: &EventKind, path: PathBuf, tracker: Option<usize>) {
        if path == self.root {
            match kind {
                EventKind::Remove(_) => {
                    self.root_gone = Some("watched directory was removed".to_string());
                }
                EventKind::Modify(ModifyKind::Name(_)) if !path.exists() => {
                    self.root_gone = Some("watched directory was moved".to_string());
                }
                _ => {}
            }
            return;
        }

        let Some(child) = self.child_of_root(&path) else {
            return;
        };
        if child != path {
            // a change below a child shows up as a change of that child
            self.modified(child);
            return;
        }

        match kind {
            EventKind::Create(_) => self.created(path),
            EventKind::Remove(_) => self.removed(path),
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                self.slots.push(Slot::RenameFrom(path, tracker));
            }
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                self.slots.push(Slot::RenameTo(path, tracker));
            }
            EventKind::Modify(ModifyKind::Name(_)) => {
                if path.symlink_metadata().is_ok() {
                    self.created(path);
                } else {
                    self.removed(path);
                }
            }
            _ => self.modified(path),
        }
    }

    fn created(&mut self, path: PathBuf) {
        self.slots.retain(|s| {
            !matches!(
                s,
                Slot::Event(WatchEvent::Removed(p)) | Slot::RenameTo(p, _) if *p == path
            )
        });
        self.slots.push(Slot::Event(WatchEvent::Created(path)));
    }

    fn modified(&mut self, path: PathBuf) {
        let seen = self.slots.iter().any(|s| {
            matches!(
                s,
                Slot::Event(WatchEvent::Created(p)) | Slot::Event(WatchEvent::Modified(p))
                    if *p == path
            )
        });
        if !seen {
            self.slots.push(Slot::Event(WatchEvent::Modified(path)));
        }
    }

    fn removed(&mut self, path: PathBuf) {
        self.slots.retain(|s| {
            !matches!(
                s,
                Slot::Event(WatchEvent::Created(p))
                    | Slot::Event(WatchEvent::Modified(p))
                    | Slot::RenameFrom(p, _)
                    if *p == path
            )
        });
        self.slots.push(Slot::Event(WatchEvent::Removed(path)));
    }

    fn renamed(&mut self, from: PathBuf, to: PathBuf) {
        self.slots
            .retain(|s| !matches!(s, Slot::RenameTo(p, _) if *p == to));
        let renamed = Slot::Event(WatchEvent::Renamed {
            from: from.clone(),
            to,
        });
        match self
            .slots
            .iter()
            .position(|s| matches!(s, Slot::RenameFrom(p, _) if *p == from))
        {
            Some(idx) => self.slots[idx] = renamed,
            None => self.slots.push(renamed),
        }
    }

    /// Emits the batch, pairing rename halves by tracker and turning lone
    /// halves into removals (moved out) or creations (moved in).
    pub(crate) fn finish(self) -> Vec<WatchEvent> {
        let mut pending_to: Vec<(PathBuf, Option<usize>)> = Vec::new();
        let mut rest: Vec<Slot> = Vec::with_capacity(self.slots.len());
        for slot in self.slots {
            match slot {
                Slot::RenameTo(path, tracker) => pending_to.push((path, tracker)),
                other => rest.push(other),
            }
        }

        let mut out = Vec::with_capacity(rest.len() + pending_to.len());
        for slot in rest {
            match slot {
                Slot::Event(event) => out.push(event),
                Slot::RenameFrom(from, tracker) => {
                    let paired = tracker.and_then(|t| {
                        pending_to
                            .iter()
                            .position(|(_, other)| *other == Some(t))
                    });
                    match paired {
                        Some(idx) => {
                            let (to, _) = pending_to.remove(idx);
                            out.push(WatchEvent::Renamed { from, to });
                        }
                        None => out.push(WatchEvent::Removed(from)),
                    }
                }
                Slot::RenameTo(..) => {}
            }
        }
        out.extend(pending_to.into_iter().map(|(to, _)| WatchEvent::Created(to)));
        out
    }

    fn direct_child(&self, path: &Path) -> bool {
        path.parent() == Some(self.root.as_path())
    }

    /// Maps `path` to the direct child of the root that contains it.
    fn child_of_root(&self, path: &Path) -> Option<PathBuf> {
        let rel = path.strip_prefix(&self.root).ok()?;
        match rel.components().next()? {
            Component::Normal(name) => Some(self.root.join(name)),
            _ => None,
        }
    }
}
