//! File list panel with size and permission columns.
//!
//! Renders the projection as a scrollable `List`. Directory sizes show
//! `…` while a background computation is outstanding.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use dirscope_core::fs::entry::{Entry, EntryKind, EntrySize};

/// Width reserved for the size column.
const SIZE_WIDTH: usize = 9;
/// Width of a `drwxr-xr-x` permission string.
const MODE_WIDTH: usize = 10;

/// Renders the entry list; the selected row is reversed.
pub fn render_file_list(f: &mut Frame, area: Rect, entries: &[Entry], selected: usize, title: &str) {
    // borders, highlight symbol and two column gaps
    let name_width = (area.width as usize).saturating_sub(2 + 2 + SIZE_WIDTH + MODE_WIDTH + 2);

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            let name = fit(&format!("{}{}", kind_marker(entry.kind()), entry.display_name()), name_width);
            ListItem::new(Line::from(vec![
                Span::styled(format!("{name:<name_width$}"), entry_style(entry)),
                Span::raw(" "),
                Span::styled(
                    format!("{:>SIZE_WIDTH$}", size_label(entry.size())),
                    size_style(entry.size()),
                ),
                Span::raw(" "),
                Span::styled(
                    permissions_label(entry.kind(), entry.permissions()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title.to_owned())
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut state = ListState::default();
    if !entries.is_empty() {
        state.select(Some(selected));
    }

    f.render_stateful_widget(list, area, &mut state);
}

fn entry_style(entry: &Entry) -> Style {
    match entry.kind() {
        EntryKind::Directory => Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::BOLD),
        EntryKind::Symlink => Style::default().fg(Color::Cyan),
        _ if entry.is_hidden() => Style::default().fg(Color::DarkGray),
        _ => Style::default(),
    }
}

fn size_style(size: &EntrySize) -> Style {
    match size {
        EntrySize::Pending => Style::default().fg(Color::Yellow),
        EntrySize::Unavailable(_) => Style::default().fg(Color::Red),
        _ => Style::default(),
    }
}

fn kind_marker(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Directory => "/",
        EntryKind::Symlink => "@",
        EntryKind::File | EntryKind::Other => " ",
    }
}

/// Truncates `s` to `width` characters, marking the cut with `~`.
fn fit(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        return s.to_string();
    }
    let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
    out.push('~');
    out
}

/// Text for the size column.
pub fn size_label(size: &EntrySize) -> String {
    match size {
        EntrySize::Unknown => "-".to_string(),
        EntrySize::Pending => "…".to_string(),
        EntrySize::Known(bytes) => format_size(*bytes),
        EntrySize::Unavailable(_) => "?".to_string(),
    }
}

/// Human-readable byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.1} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// `ls -l` style permission string, or dashes when the mode is unknown.
pub fn permissions_label(kind: EntryKind, mode: Option<u32>) -> String {
    let type_char = match kind {
        EntryKind::Directory => 'd',
        EntryKind::Symlink => 'l',
        EntryKind::File | EntryKind::Other => '-',
    };
    let Some(mode) = mode else {
        return format!("{type_char}?????????");
    };
    let mut out = String::with_capacity(MODE_WIDTH);
    out.push(type_char);
    for shift in [6, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}
