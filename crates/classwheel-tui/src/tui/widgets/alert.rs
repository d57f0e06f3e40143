// Blocking notice shown until dismissed with Enter or Esc.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use super::centered_rect;

const MAX_WIDTH: u16 = 60;

pub fn render(frame: &mut Frame, area: Rect, message: &str) {
    let width = (message.chars().count() as u16).saturating_add(6).clamp(24, MAX_WIDTH);
    // Borders, a blank line, the hint, plus the wrapped message.
    let inner_width = width.saturating_sub(4).max(1) as usize;
    let message_rows = message.chars().count().div_ceil(inner_width).max(1) as u16;
    let dialog_area = centered_rect(width, message_rows + 4, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(Span::styled(
            " Thông báo ",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ));

    let text = vec![
        Line::from(Span::styled(message.to_string(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(Span::styled("Enter: đóng", Style::default().fg(Color::DarkGray))),
    ];
    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::tests::buffer_text;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn message_and_hint_are_shown() {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), "Danh sách trống!"))
            .unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("Danh sách trống!"));
        assert!(text.contains("Enter: đóng"));
    }
}
