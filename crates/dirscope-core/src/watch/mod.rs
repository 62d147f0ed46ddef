//! Filesystem change notification for one directory at a time.
//!
//! [`Watcher::subscribe`] installs a non-recursive notify watch and spawns a
//! coalescer thread that batches raw events into [`WatchEvent`]s and delivers
//! them as [`WatchMessage`]s. The returned [`WatchHandle`] owns the OS watch;
//! dropping it ends the subscription.

pub mod event;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use notify::{PollWatcher, RecursiveMode};

use crate::error::{CoreError, CoreResult};
use event::Batch;
pub use event::WatchEvent;

/// Which notify backend a subscription uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchBackend {
    /// The platform's native mechanism (inotify, FSEvents, ...).
    Native,
    /// Periodic rescans at the given interval.
    Poll(Duration),
}

/// Payload of a [`WatchMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    Event(WatchEvent),
    /// Events were lost; the whole directory must be re-read.
    Rescan,
    /// The subscription ended; no further messages follow.
    Terminated(String),
}

/// One delivery from a subscription's coalescer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchMessage {
    pub dir: PathBuf,
    pub subscription: u64,
    pub signal: WatchSignal,
}

/// Subscription factory.
#[derive(Debug)]
pub struct Watcher {
    coalesce: Duration,
    next_id: AtomicU64,
}

impl Watcher {
    pub fn new(coalesce: Duration) -> Self {
        Self {
            coalesce,
            next_id: AtomicU64::new(1),
        }
    }

    /// Watches the direct children of `path`, delivering messages to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be created or refuses the path.
    pub fn subscribe<T>(
        &self,
        path: &Path,
        backend: WatchBackend,
        sink: Sender<T>,
    ) -> CoreResult<WatchHandle>
    where
        T: From<WatchMessage> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (raw_tx, raw_rx) = crossbeam_channel::unbounded::<notify::Result<notify::Event>>();
        let handler = move |res: notify::Result<notify::Event>| {
            let _ = raw_tx.send(res);
        };

        let mut watcher: Box<dyn notify::Watcher + Send> = match backend {
            WatchBackend::Native => Box::new(notify::recommended_watcher(handler)?),
            WatchBackend::Poll(interval) => Box::new(PollWatcher::new(
                handler,
                notify::Config::default().with_poll_interval(interval),
            )?),
        };
        watcher.watch(path, RecursiveMode::NonRecursive)?;

        let stop = Arc::new(AtomicBool::new(false));
        let coalescer = Coalescer {
            root: path.to_path_buf(),
            subscription: id,
            interval: self.coalesce,
            stop: Arc::clone(&stop),
        };
        thread::Builder::new()
            .name(format!("watch-{id}"))
            .spawn(move || coalescer.run(raw_rx, sink))?;

        tracing::debug!(id, path = %path.display(), ?backend, "watch subscribed");
        Ok(WatchHandle {
            id,
            path: path.to_path_buf(),
            backend,
            stop,
            _watcher: watcher,
        })
    }

    /// Ends a subscription. Equivalent to dropping the handle.
    pub fn unsubscribe(&self, handle: WatchHandle) {
        drop(handle);
    }
}

/// Live subscription. Dropping it releases the OS watch and silences the
/// coalescer.
pub struct WatchHandle {
    id: u64,
    path: PathBuf,
    backend: WatchBackend,
    stop: Arc<AtomicBool>,
    _watcher: Box<dyn notify::Watcher + Send>,
}

impl WatchHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backend(&self) -> WatchBackend {
        self.backend
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        tracing::debug!(id = self.id, path = %self.path.display(), "watch released");
    }
}

struct Coalescer {
    root: PathBuf,
    subscription: u64,
    interval: Duration,
    stop: Arc<AtomicBool>,
}

impl Coalescer {
    /// Runs until the raw channel disconnects (handle dropped), the sink
    /// disconnects, or the subscription terminates.
    fn run<T: From<WatchMessage>>(self, raw: Receiver<notify::Result<notify::Event>>, sink: Sender<T>) {
        while let Ok(first) = raw.recv() {
            let mut batch = Batch::new(&self.root);
            let mut failure = self.fold(&mut batch, first);

            let deadline = Instant::now() + self.interval;
            while failure.is_none() {
                let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                    break;
                };
                match raw.recv_timeout(remaining) {
                    Ok(res) => failure = self.fold(&mut batch, res),
                    Err(RecvTimeoutError::Timeout) => break,
                    Err(RecvTimeoutError::Disconnected) => return,
                }
            }

            if self.stop.load(Ordering::Acquire) {
                return;
            }

            let gone = failure.or_else(|| {
                batch
                    .root_gone()
                    .map(str::to_string)
                    .or_else(|| (!self.root.is_dir()).then(|| "watched directory is gone".to_string()))
            });

            if batch.needs_rescan() {
                tracing::debug!(path = %self.root.display(), "backend dropped events, rescan");
                if !self.deliver(&sink, WatchSignal::Rescan) {
                    return;
                }
            } else {
                for event in batch.finish() {
                    if !self.deliver(&sink, WatchSignal::Event(event)) {
                        return;
                    }
                }
            }

            if let Some(reason) = gone {
                tracing::warn!(path = %self.root.display(), "watch terminated: {reason}");
                self.deliver(&sink, WatchSignal::Terminated(reason));
                return;
            }
        }
    }

    fn fold(&self, batch: &mut Batch, res: notify::Result<notify::Event>) -> Option<String> {
        match res {
            Ok(event) => {
                batch.absorb(event);
                None
            }
            Err(e) => Some(CoreError::from(e).to_string()),
        }
    }

    fn deliver<T: From<WatchMessage>>(&self, sink: &Sender<T>, signal: WatchSignal) -> bool {
        let message = WatchMessage {
            dir: self.root.clone(),
            subscription: self.subscription,
            signal,
        };
        sink.send(T::from(message)).is_ok()
    }
}
