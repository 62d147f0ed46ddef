//! Descend/ascend history with per-directory cursor memory.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Immutable navigation history.
///
/// The stack holds the directories we descended from (push on descend, pop
/// on ascend). Independently, the name last selected in each visited
/// directory is remembered so returning to it restores the cursor. Every
/// mutation returns a **new** `History`.
#[derive(Debug, Clone, Default)]
pub struct History {
    stack: Vec<PathBuf>,
    cursors: HashMap<PathBuf, OsString>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes the directory being left by a descend.
    pub fn push(&self, path: PathBuf) -> Self {
        let mut stack = self.stack.clone();
        stack.push(path);
        Self {
            stack,
            cursors: self.cursors.clone(),
        }
    }

    /// Pops the most recent directory, or `None` when the stack is empty.
    pub fn pop(&self) -> Option<(Self, PathBuf)> {
        let mut stack = self.stack.clone();
        let path = stack.pop()?;
        Some((
            Self {
                stack,
                cursors: self.cursors.clone(),
            },
            path,
        ))
    }

    /// Records `name` as the selected entry of `dir`.
    pub fn remember(&self, dir: &Path, name: impl AsRef<OsStr>) -> Self {
        let mut cursors = self.cursors.clone();
        cursors.insert(dir.to_path_buf(), name.as_ref().to_os_string());
        Self {
            stack: self.stack.clone(),
            cursors,
        }
    }

    /// The entry name last selected in `dir`.
    pub fn remembered(&self, dir: &Path) -> Option<&OsStr> {
        self.cursors.get(dir).map(OsString::as_os_str)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_history_is_empty() {
        let history = History::new();
        assert!(history.is_empty());
        assert!(history.pop().is_none());
    }

    #[test]
    fn push_then_pop_returns_path() {
        let history = History::new().push(PathBuf::from("/a"));
        let (history, path) = history.pop().unwrap();
        assert_eq!(path, PathBuf::from("/a"));
        assert_eq!(history.depth(), 0);
    }

    #[test]
    fn push_does_not_mutate_original() {
        let history = History::new();
        let _pushed = history.push(PathBuf::from("/home"));
        assert!(history.is_empty());
    }

    #[test]
    fn pop_is_lifo() {
        let history = History::new()
            .push(PathBuf::from("/a"))
            .push(PathBuf::from("/a/b"));
        let (history, first) = history.pop().unwrap();
        let (_, second) = history.pop().unwrap();
        assert_eq!(first, PathBuf::from("/a/b"));
        assert_eq!(second, PathBuf::from("/a"));
    }

    #[test]
    fn cursor_memory_survives_push_and_pop() {
        let history = History::new()
            .remember(Path::new("/a"), "b")
            .push(PathBuf::from("/a"));
        let (history, _) = history.pop().unwrap();
        assert_eq!(history.remembered(Path::new("/a")), Some(OsStr::new("b")));
        assert_eq!(history.remembered(Path::new("/elsewhere")), None);
    }

    #[test]
    fn remember_overwrites() {
        let history = History::new()
            .remember(Path::new("/a"), "x")
            .remember(Path::new("/a"), "y");
        assert_eq!(history.remembered(Path::new("/a")), Some(OsStr::new("y")));
    }
}
