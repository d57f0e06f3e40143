// Side panel listing the entrants still on the wheel.
//
// The selected entrant is marked with a star; while spinning the slice under
// the pointer is highlighted and kept in view.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use classwheel_core::wheel::slice_color;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let title = format!(" Học sinh ({}) ", state.names.len());
    let block = Block::default().borders(Borders::ALL).title(title);

    if state.names.is_empty() {
        let paragraph = Paragraph::new("  Chưa có tên nào.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = state
        .names
        .iter()
        .enumerate()
        .map(|(i, name)| format_entry(i, name, state.selected == Some(i)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().bg(Color::DarkGray));
    let mut list_state = ListState::default().with_selected(state.selected.or(state.segment));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn format_entry(index: usize, name: &str, selected: bool) -> ListItem<'static> {
    let ((r, g, b), _) = slice_color(index);
    let mut spans = vec![
        Span::styled("█ ", Style::default().fg(Color::Rgb(r, g, b))),
        Span::styled(format!("{:>2}. ", index + 1), Style::default().fg(Color::Gray)),
    ];
    if selected {
        spans.push(Span::styled(
            format!("{name} ★"),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        spans.push(Span::raw(name.to_string()));
    }
    ListItem::new(Line::from(spans))
}
