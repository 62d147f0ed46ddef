//! Navigation logic for dirscope.
//!
//! [`controller::Navigator`] is the modal state machine; [`history`] keeps the
//! descend/ascend stack with per-directory cursor memory; [`filter`] builds the
//! sorted, filtered projection that is rendered. The traits here are the seams
//! to the outside world: where commands come from and how files are opened.

pub mod controller;
pub mod filter;
pub mod history;

use std::path::Path;
use std::time::Duration;

/// Interaction mode of the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Normal,
    Preview,
    Search,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Mode::Normal => "NORMAL",
            Mode::Preview => "PREVIEW",
            Mode::Search => "SEARCH",
        }
    }
}

/// Logical command, already decoded from whatever produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    MoveUp,
    MoveDown,
    CursorTop,
    CursorBottom,
    Descend,
    Ascend,
    ToggleMode(Mode),
    /// Back to Normal from any mode.
    Cancel,
    OpenExternally,
    Refresh,
    /// Request the recursive size of the entry under the cursor.
    ComputeSize,
    ToggleHidden,
    CycleSort,
    FilterChar(char),
    Backspace,
    Quit,
}

/// `(id, command)` pairs for every command that can be bound to a key.
const BINDABLE: &[(&str, Command)] = &[
    ("move_up", Command::MoveUp),
    ("move_down", Command::MoveDown),
    ("cursor_top", Command::CursorTop),
    ("cursor_bottom", Command::CursorBottom),
    ("descend", Command::Descend),
    ("ascend", Command::Ascend),
    ("preview", Command::ToggleMode(Mode::Preview)),
    ("search", Command::ToggleMode(Mode::Search)),
    ("cancel", Command::Cancel),
    ("open", Command::OpenExternally),
    ("refresh", Command::Refresh),
    ("compute_size", Command::ComputeSize),
    ("toggle_hidden", Command::ToggleHidden),
    ("cycle_sort", Command::CycleSort),
    ("quit", Command::Quit),
];

impl Command {
    /// Resolves a config-file action id such as `"move_down"`.
    pub fn from_id(id: &str) -> Option<Self> {
        BINDABLE
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, cmd)| *cmd)
    }

    /// The config-file id, for commands that can be bound.
    pub fn id(self) -> Option<&'static str> {
        BINDABLE
            .iter()
            .find(|(_, cmd)| *cmd == self)
            .map(|(name, _)| *name)
    }
}

/// Source of user commands.
pub trait CommandSource {
    /// Waits up to `timeout` for the next command.
    ///
    /// `Ok(None)` means nothing arrived in time (or the input was not a
    /// command); the caller uses the gap to drain background updates.
    fn next_command(&mut self, mode: Mode, timeout: Duration) -> std::io::Result<Option<Command>>;
}

/// Launches a file with the platform's default application.
///
/// Fire-and-forget: implementations report failures through logging only.
pub trait Opener {
    fn open(&self, path: &Path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_for_bindable_commands() {
        for (id, cmd) in BINDABLE {
            assert_eq!(Command::from_id(id), Some(*cmd));
            assert_eq!(cmd.id(), Some(*id));
        }
    }

    #[test]
    fn text_commands_are_not_bindable() {
        assert_eq!(Command::FilterChar('a').id(), None);
        assert_eq!(Command::Backspace.id(), None);
        assert_eq!(Command::from_id("delete_everything"), None);
    }
}
