use std::path::{Path, PathBuf};

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

/// Renders the current directory as a breadcrumb trail, with a stale marker
/// on the right when change notification has stopped.
/// Example: " ~ / projects / dirscope                  [stale]"
pub fn render_breadcrumb(f: &mut Frame, area: Rect, current_dir: &Path, live: bool) {
    let mut parts = breadcrumb_spans(current_dir, home_dir().as_deref());

    if !live {
        let marker = " [stale] ";
        let path_width: usize = parts.iter().map(|s| s.width()).sum();
        let spacer_len = (area.width as usize).saturating_sub(path_width + marker.len());
        if spacer_len > 0 {
            parts.push(Span::raw(" ".repeat(spacer_len)));
        }
        parts.push(Span::styled(
            marker,
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));
    }

    let breadcrumb = Paragraph::new(Line::from(parts)).style(Style::default().bg(Color::Black));
    f.render_widget(breadcrumb, area);
}

fn breadcrumb_spans(current_dir: &Path, home: Option<&Path>) -> Vec<Span<'static>> {
    let component_style = Style::default().fg(Color::White);
    let separator_style = Style::default().fg(Color::DarkGray);

    let Some(stripped) = home.and_then(|h| current_dir.strip_prefix(h).ok()) else {
        return vec![Span::styled(
            format!(" {}", dirscope_core::nfc_string(&current_dir.to_string_lossy())),
            component_style,
        )];
    };

    let mut parts = vec![Span::styled(
        " ~",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    for component in stripped.components() {
        parts.push(Span::styled(" / ", separator_style));
        parts.push(Span::styled(
            dirscope_core::nfc_string(&component.as_os_str().to_string_lossy()),
            component_style,
        ));
    }
    parts
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}
