use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dirscope_core::config::keymap::Keymap;
use dirscope_core::nav::{Command, CommandSource, Mode};

/// Tracks state for multi-key sequences like "gg".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InputState {
    pending_g: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self { pending_g: false }
    }
}

/// Maps a key event to a command based on the current mode.
/// Returns the command and a new InputState (immutable pattern).
///
/// In Normal and Preview mode, keys are resolved through the `Keymap`;
/// arrow keys, Esc and Ctrl+C are hardcoded. Search mode is hardcoded:
/// printable characters extend the query.
pub fn handle_key(
    key: KeyEvent,
    mode: Mode,
    state: &InputState,
    keymap: &Keymap,
) -> (Option<Command>, InputState) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return (Some(Command::Quit), InputState::new());
    }
    match mode {
        Mode::Normal | Mode::Preview => handle_browse_key(key, state, keymap),
        Mode::Search => handle_search_key(key),
    }
}

fn handle_browse_key(
    key: KeyEvent,
    state: &InputState,
    keymap: &Keymap,
) -> (Option<Command>, InputState) {
    let new_state = InputState::new();

    if state.pending_g {
        let cmd = match key.code {
            KeyCode::Char('g') => keymap.command_for_key("gg"),
            _ => None,
        };
        return (cmd, new_state);
    }

    let cmd = match key.code {
        KeyCode::Down => Some(Command::MoveDown),
        KeyCode::Up => Some(Command::MoveUp),
        KeyCode::Left => Some(Command::Ascend),
        KeyCode::Right => Some(Command::Descend),
        KeyCode::Home => Some(Command::CursorTop),
        KeyCode::End => Some(Command::CursorBottom),
        KeyCode::Esc => Some(Command::Cancel),
        KeyCode::Char('g') if keymap.command_for_key("g").is_none() => {
            return (None, InputState { pending_g: true });
        }
        KeyCode::Char(c) => keymap.command_for_key(&c.to_string()),
        other => key_name(other).and_then(|name| keymap.command_for_key(name)),
    };

    (cmd, new_state)
}

fn handle_search_key(key: KeyEvent) -> (Option<Command>, InputState) {
    let cmd = match key.code {
        KeyCode::Esc => Some(Command::Cancel),
        KeyCode::Enter => Some(Command::Descend),
        KeyCode::Backspace => Some(Command::Backspace),
        KeyCode::Down => Some(Command::MoveDown),
        KeyCode::Up => Some(Command::MoveUp),
        KeyCode::Char(c) => Some(Command::FilterChar(c)),
        _ => None,
    };
    (cmd, InputState::new())
}

/// Keymap name of a non-character key.
fn key_name(code: KeyCode) -> Option<&'static str> {
    let name = match code {
        KeyCode::Enter => "Enter",
        KeyCode::Backspace => "Backspace",
        KeyCode::Tab => "Tab",
        KeyCode::Delete => "Delete",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        _ => return None,
    };
    Some(name)
}

/// Reads commands from the terminal with crossterm.
pub struct TerminalInput {
    keymap: Keymap,
    state: InputState,
}

impl TerminalInput {
    pub fn new(keymap: Keymap) -> Self {
        Self {
            keymap,
            state: InputState::new(),
        }
    }
}

impl CommandSource for TerminalInput {
    fn next_command(&mut self, mode: Mode, timeout: Duration) -> std::io::Result<Option<Command>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let (cmd, state) = handle_key(key, mode, &self.state, &self.keymap);
                self.state = state;
                Ok(cmd)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;
    use std::collections::HashMap;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn decode(code: KeyCode, mode: Mode) -> Option<Command> {
        handle_key(key(code), mode, &InputState::new(), &Keymap::default()).0
    }

    #[test]
    fn normal_vim_keys() {
        assert_eq!(decode(KeyCode::Char('j'), Mode::Normal), Some(Command::MoveDown));
        assert_eq!(decode(KeyCode::Char('k'), Mode::Normal), Some(Command::MoveUp));
        assert_eq!(decode(KeyCode::Char('h'), Mode::Normal), Some(Command::Ascend));
        assert_eq!(decode(KeyCode::Char('l'), Mode::Normal), Some(Command::Descend));
        assert_eq!(decode(KeyCode::Char('G'), Mode::Normal), Some(Command::CursorBottom));
    }

    #[test]
    fn normal_named_keys_go_through_keymap() {
        assert_eq!(decode(KeyCode::Enter, Mode::Normal), Some(Command::Descend));
        assert_eq!(decode(KeyCode::Backspace, Mode::Normal), Some(Command::Ascend));
        assert_eq!(decode(KeyCode::F(5), Mode::Normal), None);
    }

    #[test]
    fn arrows_are_hardcoded() {
        assert_eq!(decode(KeyCode::Down, Mode::Normal), Some(Command::MoveDown));
        assert_eq!(decode(KeyCode::Left, Mode::Preview), Some(Command::Ascend));
        assert_eq!(decode(KeyCode::Right, Mode::Preview), Some(Command::Descend));
    }

    #[test]
    fn gg_sequence_moves_to_top() {
        let km = Keymap::default();
        let (cmd, state) = handle_key(key(KeyCode::Char('g')), Mode::Normal, &InputState::new(), &km);
        assert_eq!(cmd, None);
        assert!(state.pending_g);

        let (cmd, state) = handle_key(key(KeyCode::Char('g')), Mode::Normal, &state, &km);
        assert_eq!(cmd, Some(Command::CursorTop));
        assert!(!state.pending_g);
    }

    #[test]
    fn g_followed_by_other_key_is_dropped() {
        let km = Keymap::default();
        let (_, state) = handle_key(key(KeyCode::Char('g')), Mode::Normal, &InputState::new(), &km);
        let (cmd, state) = handle_key(key(KeyCode::Char('j')), Mode::Normal, &state, &km);
        assert_eq!(cmd, None);
        assert_eq!(state, InputState::new());
    }

    #[test]
    fn mode_keys_toggle() {
        assert_eq!(
            decode(KeyCode::Char('p'), Mode::Normal),
            Some(Command::ToggleMode(Mode::Preview))
        );
        assert_eq!(
            decode(KeyCode::Char('p'), Mode::Preview),
            Some(Command::ToggleMode(Mode::Preview))
        );
        assert_eq!(
            decode(KeyCode::Char('/'), Mode::Normal),
            Some(Command::ToggleMode(Mode::Search))
        );
        assert_eq!(decode(KeyCode::Esc, Mode::Preview), Some(Command::Cancel));
    }

    #[test]
    fn search_mode_captures_characters() {
        assert_eq!(decode(KeyCode::Char('q'), Mode::Search), Some(Command::FilterChar('q')));
        assert_eq!(decode(KeyCode::Char('j'), Mode::Search), Some(Command::FilterChar('j')));
        assert_eq!(decode(KeyCode::Backspace, Mode::Search), Some(Command::Backspace));
        assert_eq!(decode(KeyCode::Enter, Mode::Search), Some(Command::Descend));
        assert_eq!(decode(KeyCode::Esc, Mode::Search), Some(Command::Cancel));
    }

    #[test]
    fn ctrl_c_quits_in_every_mode() {
        let km = Keymap::default();
        for mode in [Mode::Normal, Mode::Preview, Mode::Search] {
            let (cmd, _) = handle_key(ctrl('c'), mode, &InputState::new(), &km);
            assert_eq!(cmd, Some(Command::Quit));
        }
    }

    #[test]
    fn overrides_rebind_keys() {
        let overrides = HashMap::from([("x".to_string(), "compute_size".to_string())]);
        let km = Keymap::with_overrides(&overrides);
        let (cmd, _) = handle_key(key(KeyCode::Char('x')), Mode::Normal, &InputState::new(), &km);
        assert_eq!(cmd, Some(Command::ComputeSize));
    }
}
