// Messages between the app loop and the front end.

use std::path::PathBuf;

use classwheel_core::quiz::{QuizItem, QuizPhase};
use classwheel_core::wheel::SpinDuration;

// ---------------------------------------------------------------------------
// Commands (front end -> app)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Spin,
    /// Pick option `0..4` of the current question.
    Answer(usize),
    SkipQuestion,
    RemoveWinner,
    KeepWinner,
    ToggleSound,

    OpenSettings,
    CloseSettings,
    /// Commit the draft, with the roster text as edited in the front end.
    SaveSettings { roster_text: String },
    SetSpinDuration(SpinDuration),
    RemoveQuestion(usize),
    ClearQuestions,
    GenerateFromTopic(String),
    GenerateFromFile(PathBuf),

    EnterCredential(String),
    /// Dismiss the key screen without entering a key.
    SkipCredential,
    ClearCredential,
    /// Re-seed roster and questions and reset the wheel. The key is kept.
    ReloadSession,
    /// Everything `ReloadSession` does, and forget the key.
    ClearAllData,

    Quit,
}

// ---------------------------------------------------------------------------
// Updates (app -> front end)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Idle,
    Spinning,
    /// The wheel stopped; the question is pending or on screen.
    Question,
    /// Quiz over; waiting for the remove/keep decision.
    Deciding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizView {
    pub entrant: String,
    pub item: QuizItem,
    pub phase: QuizPhase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettingsView {
    pub roster_text: String,
    pub questions: Vec<QuizItem>,
    pub spin_duration: SpinDuration,
    pub generating: bool,
}

/// Everything the front end needs to redraw, apart from per-frame data.
#[derive(Debug, Clone, PartialEq)]
pub struct AppSnapshot {
    pub phase: GamePhase,
    pub names: Vec<String>,
    pub rotation: f64,
    pub selected: Option<usize>,
    pub quiz: Option<QuizView>,
    pub question_count: usize,
    pub spin_duration: SpinDuration,
    pub sound_enabled: bool,
    pub credential_prompt: bool,
    pub has_credential: bool,
    pub settings: Option<SettingsView>,
}

/// One falling confetti particle, in screen fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfettiDrop {
    pub column: f64,
    pub height: f64,
    pub color: (u8, u8, u8),
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    Snapshot(Box<AppSnapshot>),
    /// Per-frame wheel position while spinning.
    WheelFrame {
        rotation: f64,
        segment: usize,
        /// A slice boundary just passed the pointer.
        ticked: bool,
    },
    /// Current confetti particles; empty once the celebration ends.
    Confetti(Vec<ConfettiDrop>),
    Alert(String),
    GenerationProgress { chars: usize },
    GenerationFinished { added: usize },
    GenerationFailed {
        message: String,
        credential_problem: bool,
    },
}
