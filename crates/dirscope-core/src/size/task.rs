//! Per-request size task state.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use super::walk::CancelToken;

/// Lifecycle of one size request.
///
/// `Queued → Running → {Done, Cancelled, Failed}`; the last three are
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeState {
    Queued,
    Running,
    Done(u64),
    Cancelled,
    Failed(String),
}

impl SizeState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SizeState::Done(_) | SizeState::Cancelled | SizeState::Failed(_)
        )
    }
}

/// Terminal result carried by a [`SizeReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeOutcome {
    Done(u64),
    Cancelled,
    Failed(String),
}

impl From<SizeOutcome> for SizeState {
    fn from(outcome: SizeOutcome) -> Self {
        match outcome {
            SizeOutcome::Done(bytes) => SizeState::Done(bytes),
            SizeOutcome::Cancelled => SizeState::Cancelled,
            SizeOutcome::Failed(reason) => SizeState::Failed(reason),
        }
    }
}

/// Message a worker sends once a task reaches a terminal state.
#[derive(Debug, Clone)]
pub struct SizeReport {
    pub id: u64,
    pub path: PathBuf,
    pub outcome: SizeOutcome,
    pub started_at: Instant,
    pub finished_at: Instant,
}

impl SizeReport {
    pub fn elapsed(&self) -> Duration {
        self.finished_at.saturating_duration_since(self.started_at)
    }
}

/// Caller-side view of a queued or running task.
///
/// Cloning shares the task; the computer and the caller observe the same
/// state and cancel token.
#[derive(Debug, Clone)]
pub struct SizeHandle {
    id: u64,
    path: PathBuf,
    token: CancelToken,
    state: Arc<Mutex<SizeState>>,
}

impl SizeHandle {
    pub(crate) fn new(id: u64, path: PathBuf) -> Self {
        Self {
            id,
            path,
            token: CancelToken::new(),
            state: Arc::new(Mutex::new(SizeState::Queued)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> SizeState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests cancellation. A queued task is skipped; a running one stops
    /// at its next directory boundary.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub(crate) fn token(&self) -> &CancelToken {
        &self.token
    }

    pub(crate) fn set_state(&self, state: SizeState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}
