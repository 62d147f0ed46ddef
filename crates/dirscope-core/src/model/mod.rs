//! The authoritative store of open directory listings.
//!
//! [`DirectoryModel`] is owned by one thread (the interactive loop). Size
//! workers and watch coalescers never touch it; they send [`Inbound`]
//! messages into a single channel, and every mutation happens while the
//! owner drains [`DirectoryModel::updates`]. Each accepted mutation bumps a
//! model-wide version counter and is published as one [`ListingUpdate`].
//!
//! Stale background work is discarded by identity rather than by time: a
//! size report is applied only if its task id is the ticket currently held
//! for that entry, and a watch message only if it comes from the listing's
//! current subscription.

pub mod update;

use std::collections::{HashMap, HashSet, VecDeque};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::fs::entry::{Entry, EntryKind, EntrySize};
use crate::fs::listing::Listing;
use crate::fs::ops;
use crate::size::{SizeComputer, SizeHandle, SizeOutcome, SizeReport};
use crate::watch::{WatchBackend, WatchEvent, WatchHandle, WatchMessage, WatchSignal, Watcher};

pub use update::{Inbound, ListingChange, ListingUpdate};

/// Tunables for a [`DirectoryModel`].
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub worker_pool_size: usize,
    pub auto_compute: bool,
    pub watch: bool,
    pub coalesce_interval: Duration,
    pub poll_fallback: bool,
    pub poll_interval: Duration,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ModelOptions {
    fn from(config: &Config) -> Self {
        Self {
            worker_pool_size: config.sizes.worker_pool_size,
            auto_compute: config.sizes.auto_compute,
            watch: config.watch.enabled,
            coalesce_interval: config.watch.coalesce_interval(),
            poll_fallback: config.watch.poll_fallback,
            poll_interval: config.watch.poll_interval(),
        }
    }
}

/// Per-directory state behind a [`Listing`].
struct OpenDir {
    listing: Listing,
    /// Entry name → the size task whose result we will accept.
    tickets: HashMap<OsString, SizeHandle>,
    /// Entries whose size was asked for explicitly.
    requested: HashSet<OsString>,
    watch: Option<WatchHandle>,
    fell_back: bool,
}

impl OpenDir {
    fn new(listing: Listing) -> Self {
        Self {
            listing,
            tickets: HashMap::new(),
            requested: HashSet::new(),
            watch: None,
            fell_back: false,
        }
    }

    /// Starts a fresh size task for `name` and marks it pending.
    fn enqueue(&mut self, sizes: &SizeComputer, name: &OsStr) -> bool {
        self.cancel_ticket(name);
        if self.listing.get(name).is_none() {
            return false;
        }
        let handle = sizes.request(self.listing.path().join(name));
        if let Some(entry) = self.listing.get_mut(name) {
            entry.set_size(EntrySize::Pending);
        }
        self.tickets.insert(name.to_os_string(), handle);
        true
    }

    fn cancel_ticket(&mut self, name: &OsStr) {
        if let Some(handle) = self.tickets.remove(name) {
            handle.cancel();
        }
    }

    fn cancel_all(&mut self) -> usize {
        let count = self.tickets.len();
        for (_, handle) in self.tickets.drain() {
            handle.cancel();
        }
        count
    }
}

/// Version counter plus the queue of published updates.
#[derive(Debug, Default)]
struct Outbox {
    last_version: u64,
    queue: VecDeque<ListingUpdate>,
}

impl Outbox {
    fn next_version(&mut self) -> u64 {
        self.last_version += 1;
        self.last_version
    }

    fn publish(&mut self, listing: &mut Listing, change: ListingChange) {
        let version = self.next_version();
        listing.set_version(version);
        self.queue.push_back(ListingUpdate {
            path: listing.path().to_path_buf(),
            version,
            change,
        });
    }
}

/// Owner of every open listing and of the background producers feeding them.
pub struct DirectoryModel {
    options: ModelOptions,
    sizes: SizeComputer,
    watcher: Watcher,
    inbox_tx: Sender<Inbound>,
    inbox_rx: Receiver<Inbound>,
    dirs: HashMap<PathBuf, OpenDir>,
    outbox: Outbox,
}

impl DirectoryModel {
    pub fn new(options: ModelOptions) -> Self {
        let (inbox_tx, inbox_rx) = crossbeam_channel::unbounded();
        let sizes = SizeComputer::new(options.worker_pool_size, inbox_tx.clone());
        Self::with_sizes(options, sizes, inbox_tx, inbox_rx)
    }

    fn with_sizes(
        options: ModelOptions,
        sizes: SizeComputer,
        inbox_tx: Sender<Inbound>,
        inbox_rx: Receiver<Inbound>,
    ) -> Self {
        Self {
            watcher: Watcher::new(options.coalesce_interval),
            options,
            sizes,
            inbox_tx,
            inbox_rx,
            dirs: HashMap::new(),
            outbox: Outbox::default(),
        }
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Lists the immediate children of `path` and starts background work
    /// for it.
    ///
    /// Files carry their length; directories are `Pending` when automatic
    /// sizing is on and `Unknown` otherwise. Opening a path that is already
    /// open replaces the previous generation, whose late results are then
    /// ignored.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`], [`CoreError::NotADirectory`],
    /// [`CoreError::PermissionDenied`] or [`CoreError::Io`] when the
    /// directory cannot be read. The model is unchanged in that case.
    pub fn open(&mut self, path: &Path) -> CoreResult<Listing> {
        let started = Instant::now();
        let path = std::fs::canonicalize(path).map_err(|e| CoreError::from_io(e, path))?;
        let entries = ops::read_entries(&path)?;

        if self.dirs.contains_key(&path) {
            self.close(&path);
        }

        let mut dir = OpenDir::new(Listing::new(
            path.clone(),
            entries,
            self.outbox.next_version(),
        ));
        if self.options.auto_compute {
            let names: Vec<OsString> = dir
                .listing
                .entries()
                .iter()
                .filter(|e| e.is_dir())
                .map(|e| e.name().to_os_string())
                .collect();
            for name in &names {
                dir.enqueue(&self.sizes, name);
            }
        }

        let (watch, fell_back) = self.start_watch(&path);
        dir.listing.set_live(watch.is_some());
        dir.watch = watch;
        dir.fell_back = fell_back;

        tracing::debug!(
            path = %path.display(),
            entries = dir.listing.len(),
            pending = dir.tickets.len(),
            live = dir.listing.is_live(),
            "opened in {:?}",
            started.elapsed()
        );
        let snapshot = dir.listing.clone();
        self.dirs.insert(path, dir);
        Ok(snapshot)
    }

    /// Enqueues a recursive size computation for one entry.
    ///
    /// A no-op for non-directories and for entries already pending.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if `path` is not open or has no entry `name`.
    pub fn request_size(&mut self, path: &Path, name: impl AsRef<OsStr>) -> CoreResult<()> {
        let name = name.as_ref();
        let key = self
            .key_for(path)
            .ok_or_else(|| CoreError::NotFound(path.to_path_buf()))?;
        let Some(dir) = self.dirs.get_mut(&key) else {
            return Err(CoreError::NotFound(key));
        };
        let entry = dir
            .listing
            .get(name)
            .ok_or_else(|| CoreError::NotFound(key.join(name)))?;
        if !entry.is_dir() || entry.size().is_pending() {
            return Ok(());
        }

        dir.requested.insert(name.to_os_string());
        if dir.enqueue(&self.sizes, name) {
            if let Some(entry) = dir.listing.get(name).cloned() {
                self.outbox
                    .publish(&mut dir.listing, ListingChange::Changed(entry));
            }
        }
        Ok(())
    }

    /// Drains pending background messages, yielding published updates.
    ///
    /// Returns `None` once nothing is pending; calling again later resumes.
    pub fn updates(&mut self) -> Updates<'_> {
        Updates { model: self }
    }

    /// Cancels the size tasks of `path` and drops its watch subscription.
    pub fn close(&mut self, path: &Path) {
        let Some(key) = self.key_for(path) else {
            return;
        };
        if let Some(mut dir) = self.dirs.remove(&key) {
            let cancelled = dir.cancel_all();
            tracing::debug!(path = %key.display(), cancelled, "closed");
        }
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.key_for(path).is_some()
    }

    pub fn listing(&self, path: &Path) -> Option<&Listing> {
        let key = self.key_for(path)?;
        self.dirs.get(&key).map(|d| &d.listing)
    }

    /// Re-reads an open listing in place.
    ///
    /// Directory sizes already known or pending are kept; new directories
    /// are enqueued when automatic sizing is on.
    ///
    /// # Errors
    ///
    /// [`CoreError::NotFound`] if `path` is not open, or any error from
    /// re-reading the directory.
    pub fn refresh(&mut self, path: &Path) -> CoreResult<()> {
        let key = self
            .key_for(path)
            .ok_or_else(|| CoreError::NotFound(path.to_path_buf()))?;
        let entries = ops::read_entries(&key)?;
        let Some(dir) = self.dirs.get_mut(&key) else {
            return Err(CoreError::NotFound(key));
        };

        let mut fresh = Vec::with_capacity(entries.len());
        for mut entry in entries {
            if let Some(old) = dir.listing.get(entry.name()) {
                if entry.is_dir() && old.is_dir() {
                    entry.set_size(old.size().clone());
                }
            }
            fresh.push(entry);
        }

        dir.tickets.retain(|name, handle| {
            let keep = fresh
                .iter()
                .any(|e| e.name() == name && e.size().is_pending());
            if !keep {
                handle.cancel();
            }
            keep
        });
        dir.requested
            .retain(|name| fresh.iter().any(|e| e.name() == name && e.is_dir()));

        let live = dir.listing.is_live();
        let version = self.outbox.next_version();
        dir.listing = Listing::new(key.clone(), fresh, version);
        dir.listing.set_live(live);

        if self.options.auto_compute {
            let unsized_dirs: Vec<OsString> = dir
                .listing
                .entries()
                .iter()
                .filter(|e| e.is_dir() && *e.size() == EntrySize::Unknown)
                .map(|e| e.name().to_os_string())
                .collect();
            for name in &unsized_dirs {
                dir.enqueue(&self.sizes, name);
            }
        }

        self.outbox.queue.push_back(ListingUpdate {
            path: key,
            version,
            change: ListingChange::Reloaded,
        });
        Ok(())
    }

    fn key_for(&self, path: &Path) -> Option<PathBuf> {
        if self.dirs.contains_key(path) {
            return Some(path.to_path_buf());
        }
        std::fs::canonicalize(path)
            .ok()
            .filter(|p| self.dirs.contains_key(p))
    }

    /// Subscribes natively, falling back to polling when allowed.
    fn start_watch(&self, path: &Path) -> (Option<WatchHandle>, bool) {
        if !self.options.watch {
            return (None, false);
        }
        match self
            .watcher
            .subscribe(path, WatchBackend::Native, self.inbox_tx.clone())
        {
            Ok(handle) => (Some(handle), false),
            Err(e) => {
                tracing::warn!("native watch on {} failed: {e}", path.display());
                if !self.options.poll_fallback {
                    return (None, false);
                }
                (self.poll_watch(path), true)
            }
        }
    }

    fn poll_watch(&self, path: &Path) -> Option<WatchHandle> {
        let backend = WatchBackend::Poll(self.options.poll_interval);
        match self.watcher.subscribe(path, backend, self.inbox_tx.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!("poll watch on {} failed: {e}", path.display());
                None
            }
        }
    }

    fn apply(&mut self, message: Inbound) {
        match message {
            Inbound::Size(report) => self.apply_size(report),
            Inbound::Watch(message) => self.apply_watch(message),
        }
    }

    fn apply_size(&mut self, report: SizeReport) {
        let elapsed = report.elapsed();
        let (Some(parent), Some(name)) = (report.path.parent(), report.path.file_name()) else {
            return;
        };
        let Some(dir) = self.dirs.get_mut(parent) else {
            tracing::trace!(id = report.id, path = %report.path.display(), "size report for closed directory dropped");
            return;
        };
        match dir.tickets.get(name) {
            Some(ticket) if ticket.id() == report.id => {}
            _ => {
                tracing::trace!(id = report.id, path = %report.path.display(), "stale size report dropped");
                return;
            }
        }
        dir.tickets.remove(name);

        let size = match &report.outcome {
            SizeOutcome::Done(bytes) => EntrySize::Known(*bytes),
            SizeOutcome::Failed(reason) => EntrySize::Unavailable(reason.clone()),
            SizeOutcome::Cancelled => EntrySize::Unknown,
        };
        let Some(entry) = dir.listing.get_mut(name) else {
            return;
        };
        entry.set_size(size);
        let entry = entry.clone();

        tracing::debug!(path = %report.path.display(), "dir size computed in {elapsed:?}");
        self.outbox
            .publish(&mut dir.listing, ListingChange::Sized { entry, elapsed });
    }

    fn apply_watch(&mut self, message: WatchMessage) {
        let Some(dir) = self.dirs.get(&message.dir) else {
            tracing::trace!(dir = %message.dir.display(), "watch message for closed directory dropped");
            return;
        };
        if dir.watch.as_ref().map(WatchHandle::id) != Some(message.subscription) {
            tracing::trace!(subscription = message.subscription, "watch message from old subscription dropped");
            return;
        }

        match message.signal {
            WatchSignal::Event(WatchEvent::Removed(path)) => self.remove_entry(&message.dir, &path),
            WatchSignal::Event(WatchEvent::Renamed { from, to }) => {
                self.rename_entry(&message.dir, &from, &to)
            }
            WatchSignal::Event(WatchEvent::Created(path) | WatchEvent::Modified(path)) => {
                self.restat_entry(&message.dir, &path)
            }
            WatchSignal::Rescan => {
                if let Err(e) = self.refresh(&message.dir) {
                    tracing::warn!("rescan of {} failed: {e}", message.dir.display());
                }
            }
            WatchSignal::Terminated(reason) => self.watch_terminated(&message.dir, reason),
        }
    }

    fn remove_entry(&mut self, key: &Path, path: &Path) {
        let Some(name) = child_name(key, path) else {
            return;
        };
        let Some(dir) = self.dirs.get_mut(key) else {
            return;
        };
        dir.cancel_ticket(&name);
        dir.requested.remove(&name);
        if let Some(entry) = dir.listing.remove(&name) {
            self.outbox
                .publish(&mut dir.listing, ListingChange::Removed(entry));
        }
    }

    fn rename_entry(&mut self, key: &Path, from: &Path, to: &Path) {
        let (from_name, to_name) = match (child_name(key, from), child_name(key, to)) {
            (Some(f), Some(t)) => (f, t),
            (Some(_), None) => return self.remove_entry(key, from),
            (None, Some(_)) => return self.restat_entry(key, to),
            (None, None) => return,
        };
        let Some(dir) = self.dirs.get_mut(key) else {
            return;
        };
        let Some(mut entry) = dir.listing.remove(&from_name) else {
            return self.restat_entry(key, to);
        };

        let was_pending = dir.tickets.contains_key(&from_name);
        dir.cancel_ticket(&from_name);
        dir.cancel_ticket(&to_name);
        dir.requested.remove(&to_name);
        if dir.requested.remove(&from_name) {
            dir.requested.insert(to_name.clone());
        }

        entry.set_name(&to_name);
        dir.listing.upsert(entry);
        if was_pending {
            dir.enqueue(&self.sizes, &to_name);
        }

        if let Some(entry) = dir.listing.get(&to_name).cloned() {
            self.outbox.publish(
                &mut dir.listing,
                ListingChange::Renamed {
                    from: from_name,
                    entry,
                },
            );
        }
    }

    fn restat_entry(&mut self, key: &Path, path: &Path) {
        let Some(name) = child_name(key, path) else {
            return;
        };
        match ops::stat_entry(path) {
            Ok(entry) => {
                let Some(dir) = self.dirs.get_mut(key) else {
                    return;
                };
                dir.cancel_ticket(&name);
                let compute = entry.is_dir()
                    && (self.options.auto_compute || dir.requested.contains(&name));
                if !entry.is_dir() {
                    dir.requested.remove(&name);
                }
                dir.listing.upsert(entry);
                if compute {
                    dir.enqueue(&self.sizes, &name);
                }
                if let Some(entry) = dir.listing.get(&name).cloned() {
                    self.outbox
                        .publish(&mut dir.listing, ListingChange::Changed(entry));
                }
            }
            Err(CoreError::NotFound(_)) => self.remove_entry(key, path),
            Err(e) if e.is_permission_denied() => {
                let Some(dir) = self.dirs.get_mut(key) else {
                    return;
                };
                dir.cancel_ticket(&name);
                let unavailable = EntrySize::Unavailable(e.to_string());
                match dir.listing.get_mut(&name) {
                    Some(entry) => entry.set_size(unavailable),
                    None => dir
                        .listing
                        .upsert(Entry::new(name.clone(), EntryKind::Other, unavailable)),
                }
                if let Some(entry) = dir.listing.get(&name).cloned() {
                    self.outbox
                        .publish(&mut dir.listing, ListingChange::Changed(entry));
                }
            }
            Err(e) => tracing::warn!("cannot stat {}: {e}", path.display()),
        }
    }

    fn watch_terminated(&mut self, key: &Path, reason: String) {
        let Some(dir) = self.dirs.get_mut(key) else {
            return;
        };
        let was_native = dir
            .watch
            .take()
            .is_some_and(|h| h.backend() == WatchBackend::Native);
        tracing::warn!(path = %key.display(), "watch lost: {reason}");

        if was_native && self.options.poll_fallback && !dir.fell_back && key.is_dir() {
            dir.fell_back = true;
            let backend = WatchBackend::Poll(self.options.poll_interval);
            match self.watcher.subscribe(key, backend, self.inbox_tx.clone()) {
                Ok(handle) => {
                    dir.watch = Some(handle);
                    tracing::info!(path = %key.display(), "watching by polling");
                    match self.refresh(key) {
                        Ok(()) => return,
                        Err(e) => tracing::warn!("resync of {} failed: {e}", key.display()),
                    }
                }
                Err(e) => tracing::warn!("poll fallback for {} failed: {e}", key.display()),
            }
        }

        let Some(dir) = self.dirs.get_mut(key) else {
            return;
        };
        dir.watch = None;
        dir.listing.set_live(false);
        self.outbox
            .publish(&mut dir.listing, ListingChange::WatchLost(reason));
    }
}

/// Iterator returned by [`DirectoryModel::updates`].
pub struct Updates<'a> {
    model: &'a mut DirectoryModel,
}

impl Iterator for Updates<'_> {
    type Item = ListingUpdate;

    fn next(&mut self) -> Option<ListingUpdate> {
        loop {
            if let Some(update) = self.model.outbox.queue.pop_front() {
                return Some(update);
            }
            let message = self.model.inbox_rx.try_recv().ok()?;
            self.model.apply(message);
        }
    }
}

/// The name of `path` if it is a direct child of `dir`.
fn child_name(dir: &Path, path: &Path) -> Option<OsString> {
    if path.parent()? != dir {
        return None;
    }
    path.file_name().map(OsStr::to_os_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    /// `/a` with `x` (10 bytes), `y` (20 bytes) and `b/` holding 5 bytes.
    fn fixture() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a");
        fs::create_dir_all(a.join("b")).unwrap();
        fs::write(a.join("x"), vec![0u8; 10]).unwrap();
        fs::write(a.join("y"), vec![0u8; 20]).unwrap();
        fs::write(a.join("b").join("inner"), vec![0u8; 5]).unwrap();
        let a = fs::canonicalize(a).unwrap();
        (tmp, a)
    }

    fn quiet() -> ModelOptions {
        ModelOptions {
            worker_pool_size: 1,
            watch: false,
            ..ModelOptions::default()
        }
    }

    fn watched() -> ModelOptions {
        ModelOptions {
            worker_pool_size: 1,
            coalesce_interval: Duration::from_millis(20),
            ..ModelOptions::default()
        }
    }

    /// Subscribed, but real notifications stay parked in the coalescer for
    /// the life of the test, so only injected messages arrive.
    fn injected() -> ModelOptions {
        ModelOptions {
            worker_pool_size: 1,
            coalesce_interval: Duration::from_secs(3600),
            ..ModelOptions::default()
        }
    }

    impl DirectoryModel {
        fn paused(options: ModelOptions) -> Self {
            let (tx, rx) = crossbeam_channel::unbounded();
            let sizes = SizeComputer::paused(options.worker_pool_size, tx.clone());
            Self::with_sizes(options, sizes, tx, rx)
        }

        fn ticket(&self, dir: &Path, name: &str) -> Option<u64> {
            self.dirs.get(dir)?.tickets.get(OsStr::new(name)).map(SizeHandle::id)
        }

        fn subscription(&self, dir: &Path) -> Option<u64> {
            self.dirs.get(dir)?.watch.as_ref().map(WatchHandle::id)
        }

        fn inject(&self, message: impl Into<Inbound>) {
            self.inbox_tx.send(message.into()).unwrap();
        }
    }

    fn done(id: u64, path: PathBuf, bytes: u64) -> SizeReport {
        let now = Instant::now();
        SizeReport {
            id,
            path,
            outcome: SizeOutcome::Done(bytes),
            started_at: now,
            finished_at: now,
        }
    }

    fn event(model: &DirectoryModel, dir: &Path, event: WatchEvent) -> WatchMessage {
        WatchMessage {
            dir: dir.to_path_buf(),
            subscription: model.subscription(dir).unwrap(),
            signal: WatchSignal::Event(event),
        }
    }

    fn wait_for(
        model: &mut DirectoryModel,
        pred: impl Fn(&ListingUpdate) -> bool,
    ) -> Option<ListingUpdate> {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if let Some(found) = model.updates().find(|u| pred(u)) {
                return Some(found);
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        None
    }

    #[test]
    fn open_lists_files_and_pending_directories() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::new(quiet());

        let listing = model.open(&a).unwrap();

        let names: Vec<_> = listing.entries().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["b", "x", "y"]);
        assert_eq!(listing.get("x").unwrap().size(), &EntrySize::Known(10));
        assert_eq!(listing.get("y").unwrap().size(), &EntrySize::Known(20));
        assert_eq!(listing.get("b").unwrap().size(), &EntrySize::Pending);
        assert!(!listing.is_live());
    }

    #[test]
    fn directory_size_arrives_as_update() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::new(quiet());
        let listing = model.open(&a).unwrap();

        let update = wait_for(&mut model, |u| {
            matches!(&u.change, ListingChange::Sized { entry, .. } if entry.name() == "b")
        })
        .expect("size of b");

        assert_eq!(update.path, a);
        assert!(update.version > listing.version());
        assert_eq!(
            model.listing(&a).unwrap().get("b").unwrap().size(),
            &EntrySize::Known(5)
        );
    }

    #[test]
    fn open_missing_directory_fails_without_state() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::new(quiet());
        let err = model.open(&a.join("nope")).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert!(!model.is_open(&a.join("nope")));
    }

    #[test]
    fn open_file_is_not_a_directory() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::new(quiet());
        assert!(matches!(
            model.open(&a.join("x")),
            Err(CoreError::NotADirectory(_))
        ));
    }

    #[test]
    fn request_size_without_auto_compute() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::new(ModelOptions {
            auto_compute: false,
            ..quiet()
        });
        let listing = model.open(&a).unwrap();
        assert_eq!(listing.get("b").unwrap().size(), &EntrySize::Unknown);

        model.request_size(&a, "x").unwrap();
        model.request_size(&a, "b").unwrap();
        assert!(matches!(
            model.request_size(&a, "ghost"),
            Err(CoreError::NotFound(_))
        ));

        let first = model.updates().next().expect("pending update");
        assert!(matches!(&first.change, ListingChange::Changed(e) if e.size().is_pending()));

        let sized = wait_for(&mut model, |u| matches!(u.change, ListingChange::Sized { .. }));
        assert!(sized.is_some());
        assert_eq!(
            model.listing(&a).unwrap().get("b").unwrap().size(),
            &EntrySize::Known(5)
        );
    }

    #[test]
    fn removal_discards_late_size_result() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(injected());
        model.open(&a).unwrap();
        let ticket = model.ticket(&a, "b").unwrap();

        model.inject(event(&model, &a, WatchEvent::Removed(a.join("b"))));
        model.inject(done(ticket, a.join("b"), 5));

        let updates: Vec<_> = model.updates().collect();
        assert_eq!(updates.len(), 1);
        assert!(matches!(&updates[0].change, ListingChange::Removed(e) if e.name() == "b"));
        assert!(model.listing(&a).unwrap().get("b").is_none());
    }

    #[test]
    fn interleaved_events_and_results_lose_nothing() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(injected());
        model.open(&a).unwrap();
        let first = model.ticket(&a, "b").unwrap();

        fs::write(a.join("b").join("more"), vec![0u8; 3]).unwrap();
        model.inject(event(&model, &a, WatchEvent::Modified(a.join("b"))));
        model.inject(done(first, a.join("b"), 999));
        let restat: Vec<_> = model.updates().collect();
        assert_eq!(restat.len(), 1);

        let second = model.ticket(&a, "b").unwrap();
        assert_ne!(first, second);

        fs::write(a.join("new"), vec![0u8; 4]).unwrap();
        model.inject(done(second, a.join("b"), 8));
        model.inject(event(&model, &a, WatchEvent::Created(a.join("new"))));

        let updates: Vec<_> = model.updates().collect();
        assert_eq!(updates.len(), 2);
        assert!(updates[0].version > restat[0].version);
        assert!(updates[1].version > updates[0].version);

        let listing = model.listing(&a).unwrap();
        assert_eq!(listing.get("b").unwrap().size(), &EntrySize::Known(8));
        assert_eq!(listing.get("new").unwrap().size(), &EntrySize::Known(4));
        assert_eq!(listing.get("x").unwrap().size(), &EntrySize::Known(10));
    }

    #[test]
    fn reopen_rejects_previous_generation() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(quiet());
        let first_listing = model.open(&a).unwrap();
        let old = model.ticket(&a, "b").unwrap();

        model.close(&a);
        assert!(!model.is_open(&a));
        model.inject(done(old, a.join("b"), 999));
        assert_eq!(model.updates().count(), 0);

        let second_listing = model.open(&a).unwrap();
        assert!(second_listing.version() > first_listing.version());
        let new = model.ticket(&a, "b").unwrap();
        assert_ne!(old, new);

        model.inject(done(old, a.join("b"), 999));
        assert_eq!(model.updates().count(), 0);
        assert!(model.listing(&a).unwrap().get("b").unwrap().size().is_pending());

        model.inject(done(new, a.join("b"), 5));
        assert_eq!(model.updates().count(), 1);
        assert_eq!(
            model.listing(&a).unwrap().get("b").unwrap().size(),
            &EntrySize::Known(5)
        );
    }

    #[test]
    fn rename_keeps_known_size() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(injected());
        model.open(&a).unwrap();
        let ticket = model.ticket(&a, "b").unwrap();
        model.inject(done(ticket, a.join("b"), 5));
        model.updates().for_each(drop);

        model.inject(event(
            &model,
            &a,
            WatchEvent::Renamed {
                from: a.join("b"),
                to: a.join("c"),
            },
        ));
        let updates: Vec<_> = model.updates().collect();
        assert_eq!(updates.len(), 1);
        match &updates[0].change {
            ListingChange::Renamed { from, entry } => {
                assert_eq!(from, "b");
                assert_eq!(entry.name(), "c");
                assert_eq!(entry.size(), &EntrySize::Known(5));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(model.listing(&a).unwrap().get("b").is_none());
    }

    #[test]
    fn rename_of_pending_directory_requeues_under_new_name() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(injected());
        model.open(&a).unwrap();
        let old = model.ticket(&a, "b").unwrap();

        model.inject(event(
            &model,
            &a,
            WatchEvent::Renamed {
                from: a.join("b"),
                to: a.join("c"),
            },
        ));
        model.updates().for_each(drop);

        let new = model.ticket(&a, "c").unwrap();
        assert_ne!(old, new);
        assert!(model.ticket(&a, "b").is_none());
        assert!(model.listing(&a).unwrap().get("c").unwrap().size().is_pending());
    }

    #[test]
    fn messages_from_old_subscription_are_ignored() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(injected());
        model.open(&a).unwrap();
        let current = model.subscription(&a).unwrap();

        model.inject(WatchMessage {
            dir: a.clone(),
            subscription: current + 1000,
            signal: WatchSignal::Event(WatchEvent::Removed(a.join("x"))),
        });
        assert_eq!(model.updates().count(), 0);
        assert!(model.listing(&a).unwrap().get("x").is_some());
    }

    #[test]
    fn rescan_rereads_the_listing() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(injected());
        model.open(&a).unwrap();
        fs::write(a.join("late"), vec![0u8; 3]).unwrap();
        fs::remove_file(a.join("y")).unwrap();

        model.inject(WatchMessage {
            dir: a.clone(),
            subscription: model.subscription(&a).unwrap(),
            signal: WatchSignal::Rescan,
        });
        let updates: Vec<_> = model.updates().collect();
        assert!(updates
            .iter()
            .any(|u| matches!(u.change, ListingChange::Reloaded)));
        let listing = model.listing(&a).unwrap();
        assert_eq!(listing.get("late").unwrap().size(), &EntrySize::Known(3));
        assert!(listing.get("y").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_directories_size_independently() {
        use std::os::unix::ffi::OsStrExt;
        let tmp = TempDir::new().unwrap();
        let a = fs::canonicalize(tmp.path()).unwrap();
        let first = OsStr::from_bytes(b"d\xff");
        let second = OsStr::from_bytes(b"d\xfe");
        if fs::create_dir(a.join(first)).is_err() {
            // filesystem rejects non-UTF-8 names
            return;
        }
        fs::create_dir(a.join(second)).unwrap();
        fs::write(a.join(first).join("f"), vec![0u8; 4]).unwrap();
        fs::write(a.join(second).join("f"), vec![0u8; 9]).unwrap();

        let mut model = DirectoryModel::new(quiet());
        assert_eq!(model.open(&a).unwrap().len(), 2);
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            model.updates().for_each(drop);
            let listing = model.listing(&a).unwrap();
            if listing.entries().iter().all(|e| !e.size().is_pending()) {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        let listing = model.listing(&a).unwrap();
        assert_eq!(listing.get(first).unwrap().size(), &EntrySize::Known(4));
        assert_eq!(listing.get(second).unwrap().size(), &EntrySize::Known(9));
    }

    #[test]
    fn termination_without_fallback_marks_listing_not_live() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(ModelOptions {
            poll_fallback: false,
            ..injected()
        });
        assert!(model.open(&a).unwrap().is_live());

        model.inject(WatchMessage {
            dir: a.clone(),
            subscription: model.subscription(&a).unwrap(),
            signal: WatchSignal::Terminated("gone".to_string()),
        });
        let updates: Vec<_> = model.updates().collect();
        assert!(matches!(&updates[0].change, ListingChange::WatchLost(r) if r == "gone"));
        assert!(!model.listing(&a).unwrap().is_live());
        assert!(model.subscription(&a).is_none());
    }

    #[test]
    fn termination_falls_back_to_polling_once() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(injected());
        model.open(&a).unwrap();
        let native = model.subscription(&a).unwrap();

        model.inject(WatchMessage {
            dir: a.clone(),
            subscription: native,
            signal: WatchSignal::Terminated("inotify died".to_string()),
        });
        let updates: Vec<_> = model.updates().collect();
        assert!(matches!(updates[0].change, ListingChange::Reloaded));
        assert!(model.listing(&a).unwrap().is_live());
        let polling = model.subscription(&a).unwrap();
        assert_ne!(native, polling);

        model.inject(WatchMessage {
            dir: a.clone(),
            subscription: polling,
            signal: WatchSignal::Terminated("poll died".to_string()),
        });
        let updates: Vec<_> = model.updates().collect();
        assert!(matches!(updates[0].change, ListingChange::WatchLost(_)));
        assert!(!model.listing(&a).unwrap().is_live());
    }

    #[test]
    fn refresh_keeps_known_sizes_and_adds_new_entries() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(quiet());
        model.open(&a).unwrap();
        let ticket = model.ticket(&a, "b").unwrap();
        model.inject(done(ticket, a.join("b"), 5));
        model.updates().for_each(drop);

        fs::write(a.join("z"), vec![0u8; 2]).unwrap();
        fs::remove_file(a.join("y")).unwrap();
        model.refresh(&a).unwrap();

        let updates: Vec<_> = model.updates().collect();
        assert_eq!(updates.len(), 1);
        assert!(matches!(updates[0].change, ListingChange::Reloaded));

        let listing = model.listing(&a).unwrap();
        assert_eq!(listing.get("b").unwrap().size(), &EntrySize::Known(5));
        assert_eq!(listing.get("z").unwrap().size(), &EntrySize::Known(2));
        assert!(listing.get("y").is_none());
    }

    #[test]
    fn refresh_enqueues_new_directories() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::paused(quiet());
        model.open(&a).unwrap();
        fs::create_dir(a.join("c")).unwrap();

        model.refresh(&a).unwrap();

        let listing = model.listing(&a).unwrap();
        assert_eq!(listing.get("c").unwrap().size(), &EntrySize::Pending);
        assert!(model.ticket(&a, "c").is_some());
    }

    #[test]
    fn live_watch_reports_new_file() {
        let (_tmp, a) = fixture();
        let mut model = DirectoryModel::new(watched());
        model.open(&a).unwrap();

        fs::write(a.join("fresh"), vec![0u8; 6]).unwrap();

        let update = wait_for(&mut model, |u| {
            u.change
                .entry()
                .is_some_and(|e| e.name() == "fresh" && e.size() == &EntrySize::Known(6))
        });
        assert!(update.is_some());
        assert!(model.listing(&a).unwrap().get("fresh").is_some());
    }

    #[test]
    fn child_name_only_accepts_direct_children() {
        let dir = Path::new("/a");
        assert_eq!(child_name(dir, Path::new("/a/b")), Some(OsString::from("b")));
        assert_eq!(child_name(dir, Path::new("/a/b/c")), None);
        assert_eq!(child_name(dir, Path::new("/other/b")), None);
    }
}
