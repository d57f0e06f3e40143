// Screen layout.
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +-------------------------------+------------------+
// | Wheel (65%)                   | Roster (35%)     |
// |                               |                  |
// +-------------------------------+------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+
//
// Dialogs (quiz, decision, settings, key entry, alerts) are drawn centered on
// top of this layout by their own widgets.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone)]
pub struct AppLayout {
    pub status_bar: Rect,
    pub wheel: Rect,
    /// Right column: the entrant list.
    pub side_panel: Rect,
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Min(8),    // wheel + roster
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(vertical[1]);

    AppLayout {
        status_bar: vertical[0],
        wheel: horizontal[0],
        side_panel: horizontal[1],
        help_bar: vertical[2],
    }
}
