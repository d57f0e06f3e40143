// Question dialog for the selected entrant.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

use classwheel_app::protocol::QuizView;
use classwheel_core::quiz::{QuizOutcome, QuizPhase, OPTION_LABELS};

use super::{centered_rect, plain_markup};
use crate::tui::ViewState;

const DIALOG_WIDTH: u16 = 72;
const DIALOG_HEIGHT: u16 = 16;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(quiz) = &state.quiz else {
        return;
    };
    let dialog_area = centered_rect(DIALOG_WIDTH, DIALOG_HEIGHT, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" Câu hỏi cho {} ", quiz.entrant),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let mut lines = vec![
        Line::from(Span::styled(
            plain_markup(quiz.item.question()),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for (index, option) in quiz.item.options().iter().enumerate() {
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {}. ", OPTION_LABELS[index]),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(plain_markup(option)),
        ])
        .style(option_style(quiz, index)));
    }
    lines.push(Line::from(""));
    lines.push(footer(quiz));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

/// Highlight for option `index` in the current phase.
pub fn option_style(quiz: &QuizView, index: usize) -> Style {
    let correct = quiz.item.correct();
    match quiz.phase {
        QuizPhase::Unanswered | QuizPhase::Resolved(QuizOutcome::Skipped) => Style::default(),
        QuizPhase::Locked { selected } if selected == index => {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        }
        QuizPhase::Locked { .. } => Style::default().fg(Color::DarkGray),
        QuizPhase::Revealed { selected, .. } => {
            if index == correct {
                Style::default().fg(Color::Black).bg(Color::Green)
            } else if index == selected {
                Style::default().fg(Color::White).bg(Color::Red)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        }
        QuizPhase::Resolved(QuizOutcome::Answered { .. }) if index == correct => {
            Style::default().fg(Color::Black).bg(Color::Green)
        }
        QuizPhase::Resolved(QuizOutcome::Answered { .. }) => Style::default().fg(Color::DarkGray),
    }
}

fn footer(quiz: &QuizView) -> Line<'static> {
    let correct_label = OPTION_LABELS[quiz.item.correct()];
    match quiz.phase {
        QuizPhase::Unanswered => Line::from(Span::styled(
            "A-D: trả lời   S: bỏ qua",
            Style::default().fg(Color::DarkGray),
        )),
        QuizPhase::Locked { .. } => Line::from(Span::styled(
            "Đang kiểm tra...",
            Style::default().fg(Color::Yellow),
        )),
        QuizPhase::Revealed { correct: true, .. }
        | QuizPhase::Resolved(QuizOutcome::Answered { correct: true }) => Line::from(Span::styled(
            "🎉 Chính xác!",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        QuizPhase::Revealed { correct: false, .. }
        | QuizPhase::Resolved(QuizOutcome::Answered { correct: false }) => Line::from(Span::styled(
            format!("❌ Sai rồi! Đáp án đúng: {correct_label}"),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        QuizPhase::Resolved(QuizOutcome::Skipped) => Line::from(Span::styled(
            "Đã bỏ qua câu hỏi",
            Style::default().fg(Color::DarkGray),
        )),
    }
}
