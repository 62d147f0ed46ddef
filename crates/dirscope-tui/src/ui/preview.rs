//! Right-hand pane: file preview in Preview mode, activity log otherwise.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use dirscope_core::nav::controller::Preview;

/// Renders the preview lines of the selected file, or why there are none.
pub fn render_preview(f: &mut Frame, area: Rect, preview: Option<&Preview>) {
    let title = preview
        .map(|p| format!("Preview: {}", dirscope_core::nfc_string(&p.name.to_string_lossy())))
        .unwrap_or_else(|| "Preview".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(Color::Cyan));

    let lines = preview_lines(preview);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn preview_lines(preview: Option<&Preview>) -> Vec<Line<'static>> {
    match preview.map(|p| &p.content) {
        Some(Ok(lines)) if lines.is_empty() => vec![dim("(empty file)")],
        Some(Ok(lines)) => lines.iter().map(|l| Line::raw(l.clone())).collect(),
        Some(Err(reason)) => vec![dim(&format!("no preview: {reason}"))],
        None => vec![dim("nothing selected")],
    }
}

/// Renders recent background activity, newest at the bottom.
pub fn render_activity<'a>(f: &mut Frame, area: Rect, activity: impl Iterator<Item = &'a str>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Activity")
        .border_style(Style::default().fg(Color::DarkGray));

    let capacity = area.height.saturating_sub(2) as usize;
    let all: Vec<&str> = activity.collect();
    let lines: Vec<Line> = all[all.len().saturating_sub(capacity)..]
        .iter()
        .map(|l| Line::raw(l.to_string()))
        .collect();

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn dim(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    ))
}
