// Terminal UI: view state, input handling and widget rendering.
//
// The TUI owns a `ViewState` that mirrors the parts of the application state it
// draws. The app loop pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps. Audio cues arrive on a
// separate channel and are played by the `AudioPlayer`.

pub mod input;
pub mod layout;
pub mod widgets;

use std::io::Write;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::info;

use classwheel_app::protocol::{
    AppSnapshot, ConfettiDrop, GamePhase, QuizView, SettingsView, UiUpdate, UserCommand,
};
use classwheel_core::notifier::Cue;
use classwheel_core::quiz::QuizPhase;
use classwheel_core::wheel::SpinDuration;

use crate::audio::AudioPlayer;
use layout::{build_layout, AppLayout};

/// Renders the pointer stays highlighted after a slice boundary passes it.
pub const POINTER_FLASH_RENDERS: u8 = 3;

// ---------------------------------------------------------------------------
// Generation status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationStatus {
    #[default]
    Idle,
    Streaming { chars: usize },
    Finished { added: usize },
    Failed {
        message: String,
        credential_problem: bool,
    },
}

// ---------------------------------------------------------------------------
// Settings editor
// ---------------------------------------------------------------------------

/// Which part of the settings dialog receives key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SettingsFocus {
    #[default]
    Roster,
    Topic,
    File,
    Questions,
    Duration,
}

impl SettingsFocus {
    const ORDER: [SettingsFocus; 5] = [
        SettingsFocus::Roster,
        SettingsFocus::Topic,
        SettingsFocus::File,
        SettingsFocus::Questions,
        SettingsFocus::Duration,
    ];

    fn position(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.position() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.position() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Text buffers of the settings dialog. Only the roster text is sent back on
/// save; topic and file path are sent when a generation is requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsEditor {
    pub focus: SettingsFocus,
    pub roster_text: String,
    pub topic: String,
    pub file_path: String,
    pub selected_question: usize,
    /// The "clear all data" confirmation is showing.
    pub confirm_clear_all: bool,
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local mirror of the application state.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub phase: GamePhase,
    pub names: Vec<String>,
    pub rotation: f64,
    /// Slice under the pointer on the latest wheel frame.
    pub segment: Option<usize>,
    pub selected: Option<usize>,
    pub quiz: Option<QuizView>,
    pub question_count: usize,
    pub spin_duration: SpinDuration,
    pub sound_enabled: bool,
    pub credential_prompt: bool,
    pub has_credential: bool,
    pub settings: Option<SettingsView>,
    pub editor: SettingsEditor,
    pub credential_input: String,
    pub generation: GenerationStatus,
    pub confetti: Vec<ConfettiDrop>,
    pub alert: Option<String>,
    pub pointer_flash: u8,
    pub confirm_quit: bool,
}

impl ViewState {
    /// Apply a full snapshot. Local buffers are reset when the settings dialog
    /// or the credential screen opens.
    pub fn apply_snapshot(&mut self, snapshot: AppSnapshot) {
        let settings_opened = self.settings.is_none() && snapshot.settings.is_some();
        let prompt_opened = !self.credential_prompt && snapshot.credential_prompt;

        self.phase = snapshot.phase;
        self.names = snapshot.names;
        self.rotation = snapshot.rotation;
        self.selected = snapshot.selected;
        self.quiz = snapshot.quiz;
        self.question_count = snapshot.question_count;
        self.spin_duration = snapshot.spin_duration;
        self.sound_enabled = snapshot.sound_enabled;
        self.credential_prompt = snapshot.credential_prompt;
        self.has_credential = snapshot.has_credential;
        self.settings = snapshot.settings;

        match &self.settings {
            Some(settings) => {
                if settings_opened {
                    self.editor = SettingsEditor {
                        roster_text: settings.roster_text.clone(),
                        ..SettingsEditor::default()
                    };
                    self.generation = GenerationStatus::Idle;
                }
                let last = settings.questions.len().saturating_sub(1);
                self.editor.selected_question = self.editor.selected_question.min(last);
            }
            None => self.editor = SettingsEditor::default(),
        }
        if prompt_opened {
            self.credential_input.clear();
        }
        if self.phase == GamePhase::Idle && self.selected.is_none() {
            self.segment = None;
        }
    }

    /// Name of the entrant the wheel landed on.
    pub fn selected_name(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// Called once per render tick.
    pub fn on_render_tick(&mut self) {
        self.pointer_flash = self.pointer_flash.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => state.apply_snapshot(*snapshot),
        UiUpdate::WheelFrame {
            rotation,
            segment,
            ticked,
        } => {
            state.rotation = rotation;
            state.segment = Some(segment);
            if ticked {
                state.pointer_flash = POINTER_FLASH_RENDERS;
            }
        }
        UiUpdate::Confetti(drops) => state.confetti = drops,
        UiUpdate::Alert(message) => state.alert = Some(message),
        UiUpdate::GenerationProgress { chars } => {
            state.generation = GenerationStatus::Streaming { chars };
        }
        UiUpdate::GenerationFinished { added } => {
            state.generation = GenerationStatus::Finished { added };
        }
        UiUpdate::GenerationFailed {
            message,
            credential_problem,
        } => {
            state.generation = GenerationStatus::Failed {
                message,
                credential_problem,
            };
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the whole screen: base panels first, then overlays in stacking
/// order.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::wheel::render(frame, layout.wheel, state);
    widgets::roster::render(frame, layout.side_panel, state);
    render_help_bar(frame, &layout, state);

    if state.quiz.is_some() {
        widgets::quiz::render(frame, frame.area(), state);
    } else if state.phase == GamePhase::Deciding {
        widgets::decision::render(frame, frame.area(), state);
    }
    if state.settings.is_some() {
        widgets::settings::render(frame, frame.area(), state);
    }
    if state.credential_prompt {
        widgets::credential::render(frame, frame.area(), state);
    }
    widgets::confetti::render(frame, frame.area(), &state.confetti);
    if let Some(message) = &state.alert {
        widgets::alert::render(frame, frame.area(), message);
    }
    if state.confirm_quit {
        widgets::quit_confirm::render(frame, frame.area());
    }
}

/// Key hints for whatever currently has the keyboard.
pub fn help_text(state: &ViewState) -> &'static str {
    if state.confirm_quit {
        " y: thoát | n: ở lại"
    } else if state.alert.is_some() {
        " Enter: đóng thông báo"
    } else if state.credential_prompt {
        " Enter: lưu API Key | Esc: bỏ qua"
    } else if state.settings.is_some() && state.editor.confirm_clear_all {
        " y: xóa toàn bộ dữ liệu | n: hủy"
    } else if state.settings.is_some() {
        " Tab: chuyển mục | Ctrl+S: lưu | Esc: đóng | Ctrl+K: nhập lại API Key | Ctrl+D: xóa toàn bộ"
    } else {
        match (state.phase, &state.quiz) {
            (GamePhase::Question, Some(quiz)) if quiz.phase == QuizPhase::Unanswered => {
                " A-D / 1-4: trả lời | S: bỏ qua"
            }
            (GamePhase::Question, _) | (GamePhase::Spinning, _) => " m: âm thanh | q: thoát",
            (GamePhase::Deciding, _) => " X: loại khỏi vòng quay | Enter: giữ lại",
            (GamePhase::Idle, _) => {
                " Space: quay | s: cài đặt | m: âm thanh | k: API Key | R: tải lại | q: thoát"
            }
        }
    }
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(state),
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits or the app goes away.
pub async fn run<W: Write>(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
    mut cue_rx: mpsc::Receiver<Cue>,
    mut audio: AudioPlayer<W>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    // Restore the terminal before the default hook prints the panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();
    let mut cues_open = true;

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => {
                        info!("UI channel closed");
                        break;
                    }
                }
            }

            cue = cue_rx.recv(), if cues_open => {
                match cue {
                    Some(cue) => audio.play(cue),
                    None => cues_open = false,
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break;
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }

            _ = render_tick.tick() => {
                view_state.on_render_tick();
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    audio.stop();
    ratatui::restore();
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
