//! Bounded worker pool for recursive size computation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender};

use super::task::{SizeHandle, SizeOutcome, SizeReport, SizeState};
use super::walk;
use crate::error::CoreError;

type InFlight = Arc<Mutex<HashMap<PathBuf, SizeHandle>>>;
type Spawner = Box<dyn FnOnce() + Send>;

/// Fixed pool of threads summing subtree sizes.
///
/// Requests are served from one FIFO queue. At most one task per path is
/// in flight; asking again for a queued or running path returns the
/// existing [`SizeHandle`]. Finished tasks send a [`SizeReport`] (converted
/// into the caller's message type) on the channel given at construction.
pub struct SizeComputer {
    job_tx: Sender<SizeHandle>,
    inflight: InFlight,
    next_id: AtomicU64,
    pool_size: usize,
    spawner: Option<Spawner>,
}

impl SizeComputer {
    /// Creates the pool and starts its workers.
    ///
    /// A `pool_size` of 0 uses the machine's available parallelism.
    pub fn new<T>(pool_size: usize, report_tx: Sender<T>) -> Self
    where
        T: From<SizeReport> + Send + 'static,
    {
        let mut computer = Self::paused(pool_size, report_tx);
        computer.resume();
        computer
    }

    /// Creates the pool without starting workers; requests queue up until
    /// [`resume`](Self::resume) is called.
    pub fn paused<T>(pool_size: usize, report_tx: Sender<T>) -> Self
    where
        T: From<SizeReport> + Send + 'static,
    {
        let pool_size = effective_pool_size(pool_size);
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<SizeHandle>();
        let inflight: InFlight = Arc::default();

        let worker_inflight = Arc::clone(&inflight);
        let spawner: Spawner = Box::new(move || {
            for index in 0..pool_size {
                let rx = job_rx.clone();
                let tx = report_tx.clone();
                let inflight = Arc::clone(&worker_inflight);
                let spawned = thread::Builder::new()
                    .name(format!("size-worker-{index}"))
                    .spawn(move || run_worker(rx, inflight, tx));
                if let Err(e) = spawned {
                    tracing::warn!("failed to spawn size worker {index}: {e}");
                }
            }
        });

        Self {
            job_tx,
            inflight,
            next_id: AtomicU64::new(1),
            pool_size,
            spawner: Some(spawner),
        }
    }

    /// Starts the workers of a paused pool. No-op once running.
    pub fn resume(&mut self) {
        if let Some(spawn) = self.spawner.take() {
            tracing::debug!(workers = self.pool_size, "size pool started");
            spawn();
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Enqueues a computation for `path`, or returns the task already
    /// queued or running for it.
    pub fn request(&self, path: PathBuf) -> SizeHandle {
        let mut inflight = lock(&self.inflight);
        if let Some(existing) = inflight.get(&path) {
            if !existing.is_cancelled() {
                return existing.clone();
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = SizeHandle::new(id, path.clone());
        inflight.insert(path, handle.clone());

        if self.job_tx.send(handle.clone()).is_err() {
            inflight.remove(handle.path());
            handle.set_state(SizeState::Failed("size workers stopped".to_string()));
        } else {
            tracing::trace!(id, path = %handle.path().display(), "size task queued");
        }
        handle
    }

    /// Number of tasks queued or running.
    pub fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }

    /// Cancels the in-flight task for `path`, if any.
    pub fn cancel(&self, path: &Path) {
        if let Some(handle) = lock(&self.inflight).get(path) {
            handle.cancel();
        }
    }
}

impl Drop for SizeComputer {
    fn drop(&mut self) {
        for handle in lock(&self.inflight).values() {
            handle.cancel();
        }
    }
}

fn run_worker<T>(jobs: Receiver<SizeHandle>, inflight: InFlight, reports: Sender<T>)
where
    T: From<SizeReport>,
{
    while let Ok(handle) = jobs.recv() {
        let started_at = Instant::now();
        let outcome = if handle.is_cancelled() {
            SizeOutcome::Cancelled
        } else {
            handle.set_state(SizeState::Running);
            match walk::compute(handle.path(), handle.token()) {
                Ok(bytes) => SizeOutcome::Done(bytes),
                Err(CoreError::Cancelled) => SizeOutcome::Cancelled,
                Err(e) => SizeOutcome::Failed(e.to_string()),
            }
        };
        let finished_at = Instant::now();
        handle.set_state(outcome.clone().into());

        {
            let mut slots = lock(&inflight);
            if slots.get(handle.path()).map(SizeHandle::id) == Some(handle.id()) {
                slots.remove(handle.path());
            }
        }

        let report = SizeReport {
            id: handle.id(),
            path: handle.path().to_path_buf(),
            outcome,
            started_at,
            finished_at,
        };
        tracing::debug!(
            id = report.id,
            path = %report.path.display(),
            elapsed_ms = report.elapsed().as_millis() as u64,
            outcome = ?report.outcome,
            "size task finished"
        );
        if reports.send(T::from(report)).is_err() {
            break;
        }
    }
}

fn effective_pool_size(requested: usize) -> usize {
    if requested > 0 {
        return requested;
    }
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn lock(inflight: &InFlight) -> MutexGuard<'_, HashMap<PathBuf, SizeHandle>> {
    inflight.lock().unwrap_or_else(PoisonError::into_inner)
}
