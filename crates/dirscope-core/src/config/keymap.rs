//! Key binding configuration.
//!
//! Key bindings map key names (e.g. `"j"`, `"gg"`, `"Enter"`) to navigation
//! [`Command`]s. The defaults follow vim conventions; the `[keys]` table of
//! the config file is merged on top, using action ids like `"move_down"`.

use std::collections::HashMap;

use crate::nav::{Command, Mode};

/// Complete set of Normal-mode key bindings.
#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<String, Command>,
}

impl Default for Keymap {
    fn default() -> Self {
        let mut bindings = HashMap::new();

        // Navigation
        bindings.insert("j".to_string(), Command::MoveDown);
        bindings.insert("k".to_string(), Command::MoveUp);
        bindings.insert("h".to_string(), Command::Ascend);
        bindings.insert("l".to_string(), Command::Descend);
        bindings.insert("gg".to_string(), Command::CursorTop);
        bindings.insert("G".to_string(), Command::CursorBottom);
        bindings.insert("Enter".to_string(), Command::Descend);
        bindings.insert("Backspace".to_string(), Command::Ascend);

        // Modes
        bindings.insert("p".to_string(), Command::ToggleMode(Mode::Preview));
        bindings.insert("/".to_string(), Command::ToggleMode(Mode::Search));

        // Actions
        bindings.insert("o".to_string(), Command::OpenExternally);
        bindings.insert("r".to_string(), Command::Refresh);
        bindings.insert("S".to_string(), Command::ComputeSize);
        bindings.insert(".".to_string(), Command::ToggleHidden);
        bindings.insert("s".to_string(), Command::CycleSort);
        bindings.insert("q".to_string(), Command::Quit);

        Self { bindings }
    }
}

impl Keymap {
    /// Default bindings with `overrides` (key → action id) applied.
    ///
    /// Unknown action ids are logged and skipped.
    pub fn with_overrides(overrides: &HashMap<String, String>) -> Self {
        let mut keymap = Self::default();
        for (key, id) in overrides {
            match Command::from_id(id) {
                Some(cmd) => {
                    keymap.bindings.insert(key.clone(), cmd);
                }
                None => tracing::warn!("unknown action {id:?} bound to key {key:?}"),
            }
        }
        keymap
    }

    /// Returns the command mapped to `key`, or `None` if unbound.
    pub fn command_for_key(&self, key: &str) -> Option<Command> {
        self.bindings.get(key).copied()
    }

    /// Keys bound to `cmd`, sorted.
    pub fn keys_for(&self, cmd: Command) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .bindings
            .iter()
            .filter(|(_, c)| **c == cmd)
            .map(|(k, _)| k.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keymap_has_navigation_keys() {
        let keymap = Keymap::default();

        assert_eq!(keymap.command_for_key("j"), Some(Command::MoveDown));
        assert_eq!(keymap.command_for_key("k"), Some(Command::MoveUp));
        assert_eq!(keymap.command_for_key("h"), Some(Command::Ascend));
        assert_eq!(keymap.command_for_key("l"), Some(Command::Descend));
        assert_eq!(keymap.command_for_key("gg"), Some(Command::CursorTop));
        assert_eq!(keymap.command_for_key("G"), Some(Command::CursorBottom));
    }

    #[test]
    fn default_keymap_has_mode_keys() {
        let keymap = Keymap::default();

        assert_eq!(
            keymap.command_for_key("p"),
            Some(Command::ToggleMode(Mode::Preview))
        );
        assert_eq!(
            keymap.command_for_key("/"),
            Some(Command::ToggleMode(Mode::Search))
        );
    }

    #[test]
    fn unknown_key_returns_none() {
        let keymap = Keymap::default();
        assert_eq!(keymap.command_for_key("z"), None);
        assert_eq!(keymap.command_for_key(""), None);
    }

    #[test]
    fn overrides_merge_over_defaults() {
        let mut overrides = HashMap::new();
        overrides.insert("x".to_string(), "quit".to_string());
        overrides.insert("j".to_string(), "move_up".to_string());
        overrides.insert("y".to_string(), "launch_rockets".to_string());

        let keymap = Keymap::with_overrides(&overrides);

        assert_eq!(keymap.command_for_key("x"), Some(Command::Quit));
        assert_eq!(keymap.command_for_key("j"), Some(Command::MoveUp));
        assert_eq!(keymap.command_for_key("y"), None);
        assert_eq!(keymap.command_for_key("h"), Some(Command::Ascend));
    }

    #[test]
    fn keys_for_lists_every_binding() {
        let keymap = Keymap::default();
        assert_eq!(keymap.keys_for(Command::Descend), vec!["Enter", "l"]);
        assert_eq!(keymap.keys_for(Command::Quit), vec!["q"]);
    }
}
