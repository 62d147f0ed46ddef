use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};
use dirscope_core::nav::controller::Navigator;
use dirscope_core::nav::Mode;

use crate::ui::breadcrumb::render_breadcrumb;
use crate::ui::panel::render_file_list;
use crate::ui::preview::{render_activity, render_preview};
use crate::ui::statusbar::{render_statusbar, StatusBarProps};

/// Main render function: composes the full UI layout each frame.
///
/// ```text
/// breadcrumb                         | [stale]
/// file list (50%) | preview or activity (50%)
/// status bar
/// ```
pub fn render(f: &mut Frame, nav: &Navigator) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    let state = nav.state();
    let live = nav.listing().map(|l| l.is_live()).unwrap_or(false);
    render_breadcrumb(f, rows[0], &state.current_path, live);

    let title = format!("{} entries", nav.view().len());
    render_file_list(f, columns[0], nav.view(), state.cursor, &title);

    match state.mode {
        Mode::Preview => render_preview(f, columns[1], nav.preview()),
        Mode::Normal | Mode::Search => render_activity(f, columns[1], nav.activity()),
    }

    let props = StatusBarProps {
        mode: state.mode,
        entry_count: nav.view().len(),
        selected_index: state.cursor,
        selected_entry: nav.selected(),
        sort_label: nav.options().sort.label(),
        show_hidden: nav.options().show_hidden,
        query: nav.query(),
        status_message: nav.status(),
    };
    render_statusbar(f, rows[2], &props);
}
