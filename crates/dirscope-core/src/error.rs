//! Error types for `dirscope-core`.
//!
//! All fallible operations in the core library return [`CoreResult<T>`],
//! which is an alias for `Result<T, CoreError>`.

use std::path::{Path, PathBuf};

/// Unified error type for all core operations.
///
/// None of these is fatal to the process; callers render them as status
/// messages and carry on.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The target path does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// The process lacks permission to access the path.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// A directory was expected but the path points to something else.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The file cannot be previewed as text.
    #[error("cannot preview {0}: binary content")]
    BinaryContent(PathBuf),

    /// Failed to parse a TOML configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// A background computation observed its cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// The filesystem notification subscription died.
    #[error("watch terminated: {0}")]
    WatchTerminated(String),

    /// An I/O error that doesn't fit a more specific variant.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Classifies an I/O error raised while touching `path`.
    pub fn from_io(err: std::io::Error, path: &Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => CoreError::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => CoreError::PermissionDenied(path.to_path_buf()),
            _ => CoreError::Io(err),
        }
    }

    /// Returns `true` for the permission subset of I/O failures.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            CoreError::PermissionDenied(_) => true,
            CoreError::Io(e) => e.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

impl From<notify::Error> for CoreError {
    fn from(err: notify::Error) -> Self {
        match err.kind {
            notify::ErrorKind::Io(io) => CoreError::Io(io),
            notify::ErrorKind::PathNotFound => match err.paths.first() {
                Some(p) => CoreError::NotFound(p.clone()),
                None => CoreError::WatchTerminated("path not found".to_string()),
            },
            other => CoreError::WatchTerminated(format!("{other:?}")),
        }
    }
}

/// Convenience alias used throughout `dirscope-core`.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_displays_path() {
        let err = CoreError::NotFound(PathBuf::from("/missing/file"));
        assert_eq!(err.to_string(), "path not found: /missing/file");
    }

    #[test]
    fn permission_denied_displays_path() {
        let err = CoreError::PermissionDenied(PathBuf::from("/secret"));
        assert_eq!(err.to_string(), "permission denied: /secret");
    }

    #[test]
    fn watch_terminated_displays_reason() {
        let err = CoreError::WatchTerminated("inotify limit".to_string());
        assert_eq!(err.to_string(), "watch terminated: inotify limit");
    }

    #[test]
    fn from_io_classifies_kinds() {
        let path = Path::new("/x");
        let nf = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(CoreError::from_io(nf, path), CoreError::NotFound(_)));

        let pd = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        let err = CoreError::from_io(pd, path);
        assert!(matches!(err, CoreError::PermissionDenied(_)));
        assert!(err.is_permission_denied());

        let other = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err = CoreError::from_io(other, path);
        assert!(matches!(err, CoreError::Io(_)));
        assert!(!err.is_permission_denied());
    }

    #[test]
    fn io_error_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let core_err: CoreError = io_err.into();
        assert!(matches!(core_err, CoreError::Io(_)));
        assert!(core_err.to_string().contains("gone"));
    }

    #[test]
    fn notify_path_not_found_maps_to_not_found() {
        let err = notify::Error::path_not_found().add_path(PathBuf::from("/gone"));
        let core_err: CoreError = err.into();
        assert!(matches!(core_err, CoreError::NotFound(p) if p == Path::new("/gone")));
    }
}
