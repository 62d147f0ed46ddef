//! Recursive size summation with cooperative cancellation.

use std::fs::ReadDir;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};

/// Maximum directory depth the walker descends before giving up.
///
/// Each level holds one open [`ReadDir`], so this also caps the file
/// descriptors a single walk holds. Symlinks are never followed; a subtree
/// deeper than this reports an error instead of exhausting the process limit.
/// With `worker_pool_size` workers the pool holds at most
/// `worker_pool_size * MAX_DEPTH` descriptors.
const MAX_DEPTH: usize = 256;

/// Shared flag checked by a running computation.
///
/// Clones observe the same flag; cancelling is sticky.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sums the sizes of all regular files below `root`.
///
/// The walk is depth-first and keeps one open [`ReadDir`] per level, so
/// memory grows with depth rather than with the width of any directory.
/// `token` is checked before each descent and after each directory is
/// exhausted.
///
/// # Errors
///
/// - [`CoreError::Cancelled`] once `token` is observed.
/// - [`CoreError::PermissionDenied`], [`CoreError::NotFound`] or
///   [`CoreError::Io`] for the first unreadable path anywhere in the subtree.
pub fn compute(root: &Path, token: &CancelToken) -> CoreResult<u64> {
    walk(root, token, |_, _| {})
}

/// [`compute`] with a callback run after each descent, given the new
/// directory and the number of open levels.
fn walk(root: &Path, token: &CancelToken, mut entered: impl FnMut(&Path, usize)) -> CoreResult<u64> {
    if token.is_cancelled() {
        return Err(CoreError::Cancelled);
    }

    let root_meta = std::fs::symlink_metadata(root).map_err(|e| CoreError::from_io(e, root))?;
    if !root_meta.is_dir() {
        return Ok(if root_meta.is_file() { root_meta.len() } else { 0 });
    }

    let mut total: u64 = 0;
    let mut stack: Vec<(PathBuf, ReadDir)> = vec![(root.to_path_buf(), open_dir(root)?)];

    loop {
        let next = match stack.last_mut() {
            Some((_, iter)) => iter.next(),
            None => break,
        };

        match next {
            None => {
                stack.pop();
                if token.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
            }
            Some(Err(e)) => {
                let dir = stack.last().map(|(d, _)| d.clone()).unwrap_or_default();
                return Err(CoreError::from_io(e, &dir));
            }
            Some(Ok(child)) => {
                let path = child.path();
                let file_type = child.file_type().map_err(|e| CoreError::from_io(e, &path))?;
                if file_type.is_dir() {
                    if token.is_cancelled() {
                        return Err(CoreError::Cancelled);
                    }
                    if stack.len() >= MAX_DEPTH {
                        return Err(CoreError::Io(std::io::Error::new(
                            std::io::ErrorKind::Other,
                            format!("maximum depth ({MAX_DEPTH}) exceeded at {}", path.display()),
                        )));
                    }
                    let iter = open_dir(&path)?;
                    entered(&path, stack.len() + 1);
                    stack.push((path, iter));
                } else if file_type.is_file() {
                    let len = child
                        .metadata()
                        .map_err(|e| CoreError::from_io(e, &path))?
                        .len();
                    total = total.saturating_add(len);
                }
            }
        }
    }

    Ok(total)
}

fn open_dir(path: &Path) -> CoreResult<ReadDir> {
    std::fs::read_dir(path).map_err(|e| CoreError::from_io(e, path))
}
