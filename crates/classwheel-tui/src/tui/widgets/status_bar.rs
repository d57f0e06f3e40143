// Status bar: roster and bank sizes, spin duration, sound, AI key and phase.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use classwheel_app::protocol::GamePhase;

use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let separator = || Span::styled(" | ", Style::default().fg(Color::Gray));
    let mut spans = vec![
        Span::styled(
            " 🎡 Vòng quay ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        separator(),
        Span::styled(
            format!("{} học sinh", state.names.len()),
            Style::default().fg(Color::White),
        ),
        separator(),
        Span::styled(
            format!("{} câu hỏi", state.question_count),
            Style::default().fg(Color::White),
        ),
        separator(),
        Span::styled(
            format!("Quay: {}", state.spin_duration.label()),
            Style::default().fg(Color::White),
        ),
        separator(),
    ];

    spans.push(if state.sound_enabled {
        Span::styled("🔊 Bật", Style::default().fg(Color::Green))
    } else {
        Span::styled("🔇 Tắt", Style::default().fg(Color::DarkGray))
    });
    spans.push(separator());
    spans.push(if state.has_credential {
        Span::styled("AI: sẵn sàng", Style::default().fg(Color::Green))
    } else {
        Span::styled("AI: chưa có API Key", Style::default().fg(Color::Yellow))
    });
    spans.push(separator());

    let (label, color) = phase_label(state.phase);
    spans.push(Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn phase_label(phase: GamePhase) -> (&'static str, Color) {
    match phase {
        GamePhase::Idle => ("Sẵn sàng", Color::Green),
        GamePhase::Spinning => ("Đang quay...", Color::Yellow),
        GamePhase::Question => ("Câu hỏi", Color::Cyan),
        GamePhase::Deciding => ("Chờ quyết định", Color::Magenta),
    }
}
