// Settings dialog: roster editor, question bank, AI generation and spin duration.
//
// Layout (inside the dialog border):
//   [roster editor | question list]
//   [topic input]
//   [file path input]
//   duration line
//   generation status line
//   key hints

use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

use classwheel_app::protocol::SettingsView;
use classwheel_core::wheel::SpinDuration;

use super::{centered_rect, plain_markup};
use crate::tui::{GenerationStatus, SettingsFocus, ViewState};

const CURSOR: &str = "▏";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let Some(settings) = &state.settings else {
        return;
    };
    let dialog_area = Rect {
        x: area.x + area.width.saturating_sub(area.width.min(110)) / 2,
        y: area.y + area.height.saturating_sub(area.height.min(36)) / 2,
        width: area.width.min(110),
        height: area.height.min(36),
    };
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " ⚙️ Cài đặt ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let [lists, topic, file, duration, status, hints] = Layout::vertical([
        Constraint::Min(4),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(inner);
    let [roster_area, questions_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(lists);

    let focus = state.editor.focus;
    render_roster_editor(frame, roster_area, state, focus == SettingsFocus::Roster);
    render_questions(frame, questions_area, state, settings, focus == SettingsFocus::Questions);
    render_line_input(
        frame,
        topic,
        " Tạo câu hỏi theo chủ đề (Enter để tạo) ",
        &state.editor.topic,
        focus == SettingsFocus::Topic,
    );
    render_line_input(
        frame,
        file,
        " Tạo từ tài liệu: đường dẫn PDF/TXT (Enter để tạo) ",
        &state.editor.file_path,
        focus == SettingsFocus::File,
    );
    render_duration(frame, duration, settings.spin_duration, focus == SettingsFocus::Duration);
    frame.render_widget(Paragraph::new(status_line(&state.generation, settings.generating)), status);
    frame.render_widget(
        Paragraph::new(Span::styled(
            " Tab: chuyển mục | Ctrl+S: lưu | Esc: đóng không lưu | Ctrl+D: xóa toàn bộ",
            Style::default().fg(Color::DarkGray),
        )),
        hints,
    );

    if state.editor.confirm_clear_all {
        render_confirm_clear_all(frame, dialog_area);
    }
}

fn render_confirm_clear_all(frame: &mut Frame, area: Rect) {
    let dialog_area = centered_rect(52, 4, area);
    frame.render_widget(Clear, dialog_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(Span::styled(
            " Xóa dữ liệu ",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    let text = vec![
        Line::from(" Xóa toàn bộ dữ liệu (Key, Danh sách, Câu hỏi)?"),
        Line::from(vec![
            Span::styled(" y", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(": xóa   "),
            Span::styled("n", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw(": hủy"),
        ]),
    ];
    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, dialog_area);
}

fn focus_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    Block::default().borders(Borders::ALL).border_style(border).title(title)
}

fn render_roster_editor(frame: &mut Frame, area: Rect, state: &ViewState, focused: bool) {
    let text = &state.editor.roster_text;
    let count = text.lines().filter(|l| !l.trim().is_empty()).count();
    let block = focus_block(format!(" Danh sách học sinh ({count}) "), focused);
    let visible = area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line> = text.split('\n').map(|l| Line::from(l.to_string())).collect();
    if focused {
        if let Some(last) = lines.last_mut() {
            last.push_span(Span::styled(CURSOR, Style::default().fg(Color::Yellow)));
        }
    }
    // Keep the line being typed in view.
    let scroll = lines.len().saturating_sub(visible.max(1)) as u16;
    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_questions(
    frame: &mut Frame,
    area: Rect,
    state: &ViewState,
    settings: &SettingsView,
    focused: bool,
) {
    let block = focus_block(format!(" Câu hỏi ({}) ", settings.questions.len()), focused);
    if settings.questions.is_empty() {
        let paragraph = Paragraph::new("  Chưa có câu hỏi. Hãy tạo bằng AI.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }
    let width = area.width.saturating_sub(6) as usize;
    let items: Vec<ListItem> = settings
        .questions
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let text: String = plain_markup(item.question()).chars().take(width).collect();
            ListItem::new(format!("{:>2}. {text}", i + 1))
        })
        .collect();
    let highlight = if focused {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    let list = List::new(items).block(block).highlight_style(highlight);
    let mut list_state = ListState::default().with_selected(Some(state.editor.selected_question));
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_line_input(frame: &mut Frame, area: Rect, title: &str, value: &str, focused: bool) {
    let mut spans = vec![Span::raw(value.to_string())];
    if focused {
        spans.push(Span::styled(CURSOR, Style::default().fg(Color::Yellow)));
    }
    let paragraph = Paragraph::new(Line::from(spans)).block(focus_block(title.to_string(), focused));
    frame.render_widget(paragraph, area);
}

fn render_duration(frame: &mut Frame, area: Rect, current: SpinDuration, focused: bool) {
    let mut spans = vec![Span::styled(
        " Thời gian quay: ",
        if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        },
    )];
    for option in SpinDuration::ALL {
        let style = if option == current {
            Style::default().fg(Color::Black).bg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} ", option.label()), style));
        spans.push(Span::raw(" "));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Progress text for the current generation.
pub fn status_line(status: &GenerationStatus, generating: bool) -> Line<'static> {
    match status {
        GenerationStatus::Streaming { chars } => Line::from(Span::styled(
            format!(" ⏳ Đang soạn câu hỏi... ({chars} ký tự)"),
            Style::default().fg(Color::Yellow),
        )),
        GenerationStatus::Idle if generating => Line::from(Span::styled(
            " ⏳ Đang soạn câu hỏi...",
            Style::default().fg(Color::Yellow),
        )),
        GenerationStatus::Idle => Line::from(""),
        GenerationStatus::Finished { added } => Line::from(Span::styled(
            format!(" ✅ Đã thêm {added} câu hỏi"),
            Style::default().fg(Color::Green),
        )),
        GenerationStatus::Failed {
            message,
            credential_problem,
        } => {
            let mut spans = vec![Span::styled(
                format!(" ❌ {message}"),
                Style::default().fg(Color::Red),
            )];
            if *credential_problem {
                spans.push(Span::styled(
                    "  (Ctrl+K: nhập lại API Key)",
                    Style::default().fg(Color::Yellow),
                ));
            }
            Line::from(spans)
        }
    }
}
