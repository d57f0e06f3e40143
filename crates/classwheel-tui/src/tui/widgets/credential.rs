// API key entry screen. The key is masked while typing.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use super::centered_rect;
use crate::tui::ViewState;

const DIALOG_WIDTH: u16 = 64;
const DIALOG_HEIGHT: u16 = 11;
const MASK: char = '•';

/// Masked rendering of `input`.
pub fn masked(input: &str) -> String {
    input.chars().map(|_| MASK).collect()
}

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(Span::styled(
            " 🔑 Gemini API Key ",
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));

    let input_width = DIALOG_WIDTH.saturating_sub(8) as usize;
    let shown: String = {
        let mask = masked(&state.credential_input);
        let skip = mask.chars().count().saturating_sub(input_width);
        mask.chars().skip(skip).collect()
    };

    let text = vec![
        Line::from("Nhập API Key để tạo câu hỏi bằng AI."),
        Line::from(Span::styled(
            "Lấy key miễn phí tại https://aistudio.google.com/app/apikey",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(shown),
            Span::styled("▏", Style::default().fg(Color::Yellow)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Enter", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(": lưu   "),
            Span::styled("Esc", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(": bỏ qua (không dùng AI)"),
        ]),
    ];
    let paragraph = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}
