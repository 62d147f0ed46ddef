//! Status bar rendering.
//!
//! The status bar occupies a single row at the bottom of the terminal and
//! shows the mode, cursor position, sort order, hidden-file indicator, the
//! search query and an optional status message.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use dirscope_core::fs::entry::Entry;
use dirscope_core::nav::Mode;

use crate::ui::panel::size_label;

/// Data needed to render the status bar.
pub struct StatusBarProps<'a> {
    pub mode: Mode,
    pub entry_count: usize,
    pub selected_index: usize,
    pub selected_entry: Option<&'a Entry>,
    pub sort_label: String,
    pub show_hidden: bool,
    pub query: &'a str,
    pub status_message: Option<&'a str>,
}

/// Renders the bottom status bar.
pub fn render_statusbar(f: &mut Frame, area: Rect, props: &StatusBarProps<'_>) {
    let bg = Color::DarkGray;
    let line = Line::from(statusbar_spans(props, bg));
    let bar = Paragraph::new(line).style(Style::default().bg(bg));
    f.render_widget(bar, area);
}

fn statusbar_spans(props: &StatusBarProps<'_>, bg: Color) -> Vec<Span<'static>> {
    let mode_color = match props.mode {
        Mode::Normal => Color::Blue,
        Mode::Preview => Color::Green,
        Mode::Search => Color::Magenta,
    };

    let position = if props.entry_count > 0 {
        format!(" {}/{}", props.selected_index + 1, props.entry_count)
    } else {
        " 0/0".to_owned()
    };

    let file_info = props
        .selected_entry
        .map(|e| format!("  {} ({})", e.display_name(), size_label(e.size())))
        .unwrap_or_default();

    let hidden_indicator = if props.show_hidden { " [H]" } else { "" };

    let mut spans = vec![
        Span::styled(
            format!(" {} ", props.mode.label()),
            Style::default()
                .fg(Color::Black)
                .bg(mode_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            position,
            Style::default()
                .fg(Color::White)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(file_info, Style::default().fg(Color::White).bg(bg)),
        Span::styled(
            format!("  [{}]", props.sort_label),
            Style::default().fg(Color::Cyan).bg(bg),
        ),
        Span::styled(
            hidden_indicator.to_owned(),
            Style::default()
                .fg(Color::Yellow)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if props.mode == Mode::Search {
        spans.push(Span::styled(
            format!("  /{}", props.query),
            Style::default().fg(Color::White).bg(bg),
        ));
    }

    if let Some(msg) = props.status_message {
        spans.push(Span::styled(
            format!("  {msg}"),
            Style::default()
                .fg(Color::LightRed)
                .bg(bg)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirscope_core::fs::entry::{EntryKind, EntrySize};

    fn props<'a>(mode: Mode, entry: Option<&'a Entry>) -> StatusBarProps<'a> {
        StatusBarProps {
            mode,
            entry_count: if entry.is_some() { 3 } else { 0 },
            selected_index: 1,
            selected_entry: entry,
            sort_label: "type↑".to_string(),
            show_hidden: false,
            query: "ab",
            status_message: None,
        }
    }

    fn text(props: &StatusBarProps<'_>) -> String {
        statusbar_spans(props, Color::DarkGray)
            .iter()
            .map(|s| s.content.as_ref())
            .collect()
    }

    #[test]
    fn shows_mode_position_and_size() {
        let entry = Entry::new("b", EntryKind::Directory, EntrySize::Known(2048));
        let out = text(&props(Mode::Normal, Some(&entry)));
        assert!(out.starts_with(" NORMAL "));
        assert!(out.contains(" 2/3"));
        assert!(out.contains("b (2.0 KB)"));
        assert!(out.contains("[type↑]"));
        assert!(!out.contains("/ab"));
    }

    #[test]
    fn empty_listing_shows_zero_position() {
        let out = text(&props(Mode::Normal, None));
        assert!(out.contains(" 0/0"));
    }

    #[test]
    fn search_mode_shows_query() {
        let out = text(&props(Mode::Search, None));
        assert!(out.contains("/ab"));
    }

    #[test]
    fn status_message_and_hidden_marker() {
        let mut p = props(Mode::Normal, None);
        p.show_hidden = true;
        p.status_message = Some("permission denied");
        let out = text(&p);
        assert!(out.contains("[H]"));
        assert!(out.ends_with("permission denied"));
    }
}
