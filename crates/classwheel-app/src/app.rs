// Application state and main event loop.
//
// A single task owns all mutable state. It reacts to user commands, LLM
// streaming events and a frame timer that drives the wheel animation, quiz
// timers, the question intro delay and the celebration expiry.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use classwheel_core::celebration::Celebration;
use classwheel_core::config::Config;
use classwheel_core::credentials::{CredentialError, CredentialStore};
use classwheel_core::notifier::Notifier;
use classwheel_core::quiz::{QuizEvent, QuizFlow, QuizOutcome};
use classwheel_core::sanitize::sanitize_records;
use classwheel_core::store::{QuestionBank, Roster, StoreError};
use classwheel_core::wheel::{SpinDuration, SpinFrame, SpinStart, Wheel};
use classwheel_llm::client::LlmClient;
use classwheel_llm::extract::extract_json_array;
use classwheel_llm::failure::{classify_failure, GenerationFailure};
use classwheel_llm::prompt::{document_request, topic_request, GenerationKind, GenerationRequest};
use classwheel_llm::upload::{load_attachment, UploadError};
use classwheel_llm::LlmEvent;

use crate::protocol::{
    AppSnapshot, ConfettiDrop, GamePhase, QuizView, SettingsView, UiUpdate, UserCommand,
};

pub const EMPTY_ROSTER_ALERT: &str = "⚠️ Vui lòng nhập danh sách học sinh!";
pub const EMPTY_WHEEL_ALERT: &str = "Danh sách trống! Hãy thêm tên học sinh trong phần cài đặt.";
pub const SHORT_KEY_ALERT: &str = "⚠️ Vui lòng nhập API Key hợp lệ!";
pub const MISSING_SOURCE_ALERT: &str = "Vui lòng nhập chủ đề hoặc chọn tài liệu.";
pub const BUSY_ALERT: &str = "Đang soạn câu hỏi, vui lòng đợi.";

/// Clock used by the loop. Follows tokio's clock so paused-time tests work.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

// ---------------------------------------------------------------------------
// Settings draft
// ---------------------------------------------------------------------------

/// Copy of the editable settings, committed on save.
#[derive(Debug, Clone)]
pub struct SettingsDraft {
    pub roster_text: String,
    pub questions: QuestionBank,
    pub spin_duration: SpinDuration,
}

/// Why a generation request was not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationRejected {
    /// Invalid input; shown as an alert.
    Alert(String),
    Failure(GenerationFailure),
}

/// What one frame changed.
#[derive(Debug, Default)]
pub struct FrameOutput {
    pub spin: Option<SpinFrame>,
    /// Something in the snapshot changed.
    pub changed: bool,
    pub confetti: Option<Vec<ConfettiDrop>>,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    pub config: Config,
    pub roster: Roster,
    pub bank: QuestionBank,
    pub wheel: Wheel,
    pub spin_duration: SpinDuration,
    pub phase: GamePhase,
    /// Index of the entrant the wheel landed on, until the decision is made.
    pub selected: Option<usize>,
    pub quiz: Option<QuizFlow>,
    pub question_due: Option<Instant>,
    pub celebration: Option<Celebration>,
    pub settings: Option<SettingsDraft>,
    pub credentials: CredentialStore,
    pub credential_prompt: bool,
    pub notifier: Arc<dyn Notifier>,
    pub llm_client: LlmClient,
    /// Sender cloned into spawned generation tasks.
    pub llm_tx: mpsc::Sender<LlmEvent>,
    /// Counter identifying the current generation task. Events carrying any
    /// other value are discarded.
    pub llm_generation: u64,
    pub pending_generation: Option<GenerationKind>,
    pub current_llm_task: Option<JoinHandle<()>>,
    streamed_chars: usize,
    rng: StdRng,
}

impl AppState {
    /// Seed roster and questions from `config` and load the stored API key.
    pub fn new(
        config: Config,
        credentials: CredentialStore,
        notifier: Arc<dyn Notifier>,
        llm_tx: mpsc::Sender<LlmEvent>,
    ) -> Self {
        let api_key = match credentials.load() {
            Ok(key) => key,
            Err(e) => {
                warn!("Failed to load credentials: {e}");
                None
            }
        };
        let llm_client = LlmClient::from_settings(&config.settings.llm, api_key.as_deref());
        notifier.set_enabled(config.settings.voice.enabled);

        AppState {
            roster: Roster::new(config.classroom.names.clone()),
            bank: QuestionBank::new(config.classroom.questions.clone()),
            wheel: Wheel::new(),
            spin_duration: config.settings.wheel.spin_duration,
            phase: GamePhase::Idle,
            selected: None,
            quiz: None,
            question_due: None,
            celebration: None,
            settings: None,
            credentials,
            credential_prompt: !llm_client.is_active(),
            notifier,
            llm_client,
            llm_tx,
            llm_generation: 0,
            pending_generation: None,
            current_llm_task: None,
            streamed_chars: 0,
            rng: StdRng::from_entropy(),
            config,
        }
    }

    /// Replace the LLM client (tests inject scripted backends here).
    pub fn with_llm_client(mut self, client: LlmClient) -> Self {
        self.credential_prompt = !client.is_active();
        self.llm_client = client;
        self
    }

    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn snapshot(&self) -> AppSnapshot {
        AppSnapshot {
            phase: self.phase,
            names: self.roster.names().to_vec(),
            rotation: self.wheel.rotation(),
            selected: self.selected,
            quiz: self.quiz.as_ref().map(|q| QuizView {
                entrant: q.entrant().to_string(),
                item: q.item().clone(),
                phase: q.phase(),
            }),
            question_count: self.bank.len(),
            spin_duration: self.spin_duration,
            sound_enabled: self.notifier.is_enabled(),
            credential_prompt: self.credential_prompt,
            has_credential: self.llm_client.is_active(),
            settings: self.settings.as_ref().map(|d| SettingsView {
                roster_text: d.roster_text.clone(),
                questions: d.questions.items().to_vec(),
                spin_duration: d.spin_duration,
                generating: self.pending_generation.is_some(),
            }),
        }
    }

    // --- Game flow ---

    /// Start a spin. `None` when the request is ignored because the game is
    /// not idle or an overlay is open.
    pub fn start_spin(&mut self, now: Instant) -> Option<SpinStart> {
        if self.phase != GamePhase::Idle || self.settings.is_some() || self.credential_prompt {
            debug!(phase = ?self.phase, "spin ignored");
            return None;
        }
        let result = self.wheel.start_spin(
            self.roster.len(),
            self.spin_duration.as_duration(),
            now,
            &mut self.rng,
        );
        if matches!(result, SpinStart::Started { .. }) {
            self.phase = GamePhase::Spinning;
        }
        Some(result)
    }

    /// Drive every timer to `now`.
    pub fn advance(&mut self, now: Instant) -> FrameOutput {
        let mut out = FrameOutput::default();

        if let Some(frame) = self.wheel.frame(now, self.notifier.as_ref()) {
            if let Some(winner) = frame.winner {
                self.on_spin_finished(winner, now);
                out.changed = true;
            }
            out.spin = Some(frame);
        }

        if self.question_due.is_some_and(|due| now >= due) {
            self.question_due = None;
            self.present_question();
            out.changed = true;
        }

        if let Some(quiz) = self.quiz.as_mut() {
            let feedback = self.config.settings.voice.feedback();
            match quiz.poll(now, self.notifier.as_ref(), &feedback) {
                Some(QuizEvent::Revealed { .. }) => out.changed = true,
                Some(QuizEvent::Resolved(outcome)) => {
                    self.finish_quiz(outcome, now);
                    out.changed = true;
                }
                None => {}
            }
        }

        match self.celebration.as_ref().map(|c| c.is_expired(now)) {
            Some(true) => {
                self.celebration = None;
                out.confetti = Some(Vec::new());
            }
            Some(false) => out.confetti = Some(self.confetti_drops(now)),
            None => {}
        }

        out
    }

    fn on_spin_finished(&mut self, winner: usize, now: Instant) {
        self.phase = GamePhase::Question;
        self.selected = Some(winner);
        let name = self.roster.get(winner).unwrap_or_default();
        info!(winner, name, "wheel stopped");
        self.notifier
            .speak(&self.config.settings.voice.invitation(name));
        self.question_due = Some(now + self.config.settings.quiz.intro_delay());
    }

    fn present_question(&mut self) {
        if self.phase != GamePhase::Question {
            return;
        }
        let Some(name) = self.selected.and_then(|i| self.roster.get(i)) else {
            self.phase = GamePhase::Deciding;
            return;
        };
        match self.bank.pick_random(&mut self.rng) {
            Some(item) => {
                self.quiz = Some(QuizFlow::present(
                    name,
                    item.clone(),
                    self.config.settings.quiz.timing(),
                ));
            }
            None => {
                info!("question bank empty, skipping quiz");
                self.phase = GamePhase::Deciding;
            }
        }
    }

    fn finish_quiz(&mut self, outcome: QuizOutcome, now: Instant) {
        self.quiz = None;
        self.phase = GamePhase::Deciding;
        if outcome == (QuizOutcome::Answered { correct: true }) {
            let quiz = &self.config.settings.quiz;
            self.celebration = Some(Celebration::launch(
                quiz.confetti_count,
                quiz.celebration(),
                now,
                &mut self.rng,
            ));
        }
        info!(?outcome, "quiz finished");
    }

    fn confetti_drops(&self, now: Instant) -> Vec<ConfettiDrop> {
        let Some(celebration) = &self.celebration else {
            return Vec::new();
        };
        let elapsed = celebration.elapsed(now);
        celebration
            .particles()
            .iter()
            .filter_map(|p| {
                p.height_at(elapsed).map(|height| ConfettiDrop {
                    column: p.column,
                    height,
                    color: p.color,
                })
            })
            .collect()
    }

    pub fn answer(&mut self, index: usize, now: Instant) -> bool {
        match self.quiz.as_mut() {
            Some(quiz) => quiz.select(index, now),
            None => false,
        }
    }

    pub fn skip_question(&mut self, now: Instant) -> bool {
        let skipped = self.quiz.as_mut().is_some_and(|quiz| quiz.skip());
        if skipped {
            self.finish_quiz(QuizOutcome::Skipped, now);
        }
        skipped
    }

    /// Close the round, removing the selected entrant when `remove` is set.
    /// Returns the removed name.
    pub fn decide(&mut self, remove: bool) -> Option<String> {
        if self.phase != GamePhase::Deciding {
            return None;
        }
        let removed = match (remove, self.selected) {
            (true, Some(index)) => match self.roster.remove(index) {
                Ok(name) => Some(name),
                Err(e) => {
                    warn!("Failed to remove entrant: {e}");
                    None
                }
            },
            _ => None,
        };
        self.selected = None;
        self.phase = GamePhase::Idle;
        removed
    }

    pub fn toggle_sound(&mut self) -> bool {
        let enabled = !self.notifier.is_enabled();
        self.notifier.set_enabled(enabled);
        info!(enabled, "sound toggled");
        enabled
    }

    // --- Settings ---

    pub fn open_settings(&mut self) -> bool {
        if self.phase != GamePhase::Idle || self.settings.is_some() {
            return false;
        }
        self.settings = Some(SettingsDraft {
            roster_text: self.roster.to_text(),
            questions: self.bank.clone(),
            spin_duration: self.spin_duration,
        });
        true
    }

    /// Commit the draft. An empty roster leaves everything untouched and the
    /// draft open.
    pub fn save_settings(&mut self, roster_text: &str) -> Result<usize, StoreError> {
        let Some(draft) = self.settings.as_mut() else {
            return Ok(self.roster.len());
        };
        let count = self.roster.replace_from_text(roster_text)?;
        self.bank = std::mem::take(&mut draft.questions);
        self.spin_duration = draft.spin_duration;
        self.settings = None;
        self.cancel_llm_task();
        info!(names = count, questions = self.bank.len(), "settings saved");
        Ok(count)
    }

    pub fn close_settings(&mut self) {
        if self.settings.take().is_some() {
            self.cancel_llm_task();
        }
    }

    pub fn set_draft_duration(&mut self, duration: SpinDuration) {
        if let Some(draft) = self.settings.as_mut() {
            draft.spin_duration = duration;
        }
    }

    pub fn remove_draft_question(&mut self, index: usize) {
        if let Some(draft) = self.settings.as_mut() {
            draft.questions.remove(index);
        }
    }

    pub fn clear_draft_questions(&mut self) {
        if let Some(draft) = self.settings.as_mut() {
            draft.questions.clear();
        }
    }

    // --- Generation ---

    pub fn topic_generation(&self, topic: &str) -> Result<GenerationRequest, GenerationRejected> {
        self.check_generation_allowed()?;
        if topic.trim().is_empty() {
            return Err(GenerationRejected::Alert(MISSING_SOURCE_ALERT.to_string()));
        }
        self.check_credential()?;
        let llm = &self.config.settings.llm;
        Ok(topic_request(
            topic,
            llm.topic_question_count,
            &llm.language,
            llm.topic_temperature,
        ))
    }

    pub fn document_generation(&self, path: &Path) -> Result<GenerationRequest, GenerationRejected> {
        self.check_generation_allowed()?;
        let llm = &self.config.settings.llm;
        let attachment = load_attachment(path, llm.max_upload_bytes).map_err(|e| {
            GenerationRejected::Alert(match e {
                UploadError::TooLarge { max, .. } => {
                    format!("⚠️ File quá lớn (Tối đa {}MB)", max / (1024 * 1024))
                }
                UploadError::NotFound { path } => format!("Không tìm thấy tệp: {}", path.display()),
                other => other.to_string(),
            })
        })?;
        self.check_credential()?;
        Ok(document_request(&attachment, llm.document_temperature))
    }

    fn check_generation_allowed(&self) -> Result<(), GenerationRejected> {
        if self.settings.is_none() {
            return Err(GenerationRejected::Alert(
                "Mở phần cài đặt để soạn câu hỏi.".to_string(),
            ));
        }
        if self.pending_generation.is_some() {
            return Err(GenerationRejected::Alert(BUSY_ALERT.to_string()));
        }
        Ok(())
    }

    fn check_credential(&self) -> Result<(), GenerationRejected> {
        if self.llm_client.is_active() {
            Ok(())
        } else {
            Err(GenerationRejected::Failure(GenerationFailure::MissingCredential))
        }
    }

    /// Spawn a streaming task for `request`. Returns its generation number.
    pub fn begin_generation(&mut self, request: GenerationRequest) -> u64 {
        self.cancel_llm_task();
        let generation = self.llm_generation;
        self.pending_generation = Some(request.kind);
        self.streamed_chars = 0;

        let client = self.llm_client.clone();
        let tx = self.llm_tx.clone();
        let kind = request.kind;
        let handle = tokio::spawn(async move {
            if let Err(e) = client.stream_generation(&request, tx, generation).await {
                warn!("Generation task failed: {}", e);
            }
        });
        self.current_llm_task = Some(handle);
        info!(?kind, generation, "question generation started");
        generation
    }

    /// Parse model output into the draft bank. Topic results are prepended,
    /// document results replace the bank.
    pub fn apply_generated(
        &mut self,
        kind: GenerationKind,
        text: &str,
    ) -> Result<usize, GenerationFailure> {
        let items = sanitize_records(&extract_json_array(text));
        if items.is_empty() {
            return Err(GenerationFailure::BadFormat);
        }
        let Some(draft) = self.settings.as_mut() else {
            warn!("generated questions arrived with settings closed, dropping");
            return Ok(0);
        };
        let added = items.len();
        match kind {
            GenerationKind::Topic => {
                draft.questions.prepend(items);
            }
            GenerationKind::Document => draft.questions.replace(items),
        }
        Ok(added)
    }

    /// Abort the in-flight task and invalidate its events.
    pub fn cancel_llm_task(&mut self) {
        if let Some(handle) = self.current_llm_task.take() {
            handle.abort();
        }
        self.llm_generation += 1;
        self.pending_generation = None;
    }

    // --- Credential ---

    pub fn enter_credential(&mut self, key: &str) -> Result<(), CredentialError> {
        let key = self.credentials.save(key)?;
        self.llm_client = LlmClient::from_settings(&self.config.settings.llm, Some(&key));
        self.credential_prompt = false;
        Ok(())
    }

    pub fn skip_credential(&mut self) {
        self.credential_prompt = false;
    }

    pub fn clear_credential(&mut self) {
        if let Err(e) = self.credentials.clear() {
            warn!("Failed to clear credentials: {e}");
        }
        self.cancel_llm_task();
        self.llm_client = LlmClient::Disabled;
        self.credential_prompt = true;
        self.settings = None;
    }

    /// Back to the configured roster and questions with a fresh wheel. The
    /// stored key survives.
    pub fn reload_session(&mut self) {
        self.cancel_llm_task();
        self.settings = None;
        self.roster = Roster::new(self.config.classroom.names.clone());
        self.bank = QuestionBank::new(self.config.classroom.questions.clone());
        self.wheel.reset();
        self.spin_duration = self.config.settings.wheel.spin_duration;
        self.phase = GamePhase::Idle;
        self.selected = None;
        self.quiz = None;
        self.question_due = None;
        self.celebration = None;
        info!("session reloaded");
    }

    /// Forget the key and reload the session.
    pub fn clear_all_data(&mut self) {
        self.clear_credential();
        self.reload_session();
        info!("all data cleared");
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on user commands, LLM streaming events and the frame timer using
/// `tokio::select!`, and pushes UI updates through `ui_tx`.
pub async fn run(
    mut llm_rx: mpsc::Receiver<LlmEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    let mut llm_open = true;
    let mut frames = tokio::time::interval(state.config.settings.wheel.frame_interval());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    send_snapshot(&state, &ui_tx).await;

    loop {
        tokio::select! {
            // --- LLM events (only poll when channel is open) ---
            llm_event = llm_rx.recv(), if llm_open => {
                match llm_event {
                    Some(event) => handle_llm_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("LLM channel closed");
                        llm_open = false;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Animation and timers ---
            _ = frames.tick() => {
                let out = state.advance(now());
                if let Some(frame) = out.spin {
                    let _ = ui_tx
                        .send(UiUpdate::WheelFrame {
                            rotation: frame.rotation,
                            segment: frame.segment,
                            ticked: frame.ticked,
                        })
                        .await;
                }
                if out.changed {
                    send_snapshot(&state, &ui_tx).await;
                }
                if let Some(drops) = out.confetti {
                    let _ = ui_tx.send(UiUpdate::Confetti(drops)).await;
                }
            }
        }
    }

    state.cancel_llm_task();
    info!("Application event loop exiting");
    Ok(())
}

async fn send_snapshot(state: &AppState, ui_tx: &mpsc::Sender<UiUpdate>) {
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.snapshot())))
        .await;
}

async fn alert(ui_tx: &mpsc::Sender<UiUpdate>, message: impl Into<String>) {
    let _ = ui_tx.send(UiUpdate::Alert(message.into())).await;
}

async fn report_failure(ui_tx: &mpsc::Sender<UiUpdate>, failure: &GenerationFailure) {
    warn!(%failure, "question generation failed");
    let _ = ui_tx
        .send(UiUpdate::GenerationFailed {
            message: failure.user_message(),
            credential_problem: failure.is_credential_problem(),
        })
        .await;
}

/// Apply one streaming event, discarding those from stale generations.
async fn handle_llm_event(state: &mut AppState, event: LlmEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    if event.generation() != state.llm_generation {
        debug!(
            "Discarding stale LLM event (event gen: {}, current gen: {})",
            event.generation(),
            state.llm_generation
        );
        return;
    }
    let Some(kind) = state.pending_generation else {
        debug!("LLM event with no pending generation, ignoring");
        return;
    };

    match event {
        LlmEvent::Token { text, .. } => {
            state.streamed_chars += text.chars().count();
            let _ = ui_tx
                .send(UiUpdate::GenerationProgress {
                    chars: state.streamed_chars,
                })
                .await;
        }
        LlmEvent::Complete { full_text, .. } => {
            state.pending_generation = None;
            state.current_llm_task = None;
            match state.apply_generated(kind, &full_text) {
                Ok(added) => {
                    info!(added, ?kind, "questions generated");
                    let _ = ui_tx.send(UiUpdate::GenerationFinished { added }).await;
                }
                Err(failure) => report_failure(ui_tx, &failure).await,
            }
            send_snapshot(state, ui_tx).await;
        }
        LlmEvent::Error { message, .. } => {
            state.pending_generation = None;
            state.current_llm_task = None;
            report_failure(ui_tx, &classify_failure(&message)).await;
            send_snapshot(state, ui_tx).await;
        }
    }
}

async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Spin => match state.start_spin(now()) {
            Some(SpinStart::Started { .. }) => send_snapshot(state, ui_tx).await,
            Some(SpinStart::EmptyRoster) => alert(ui_tx, EMPTY_WHEEL_ALERT).await,
            Some(SpinStart::AlreadySpinning) | None => {}
        },
        UserCommand::Answer(index) => {
            if state.answer(index, now()) {
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::SkipQuestion => {
            if state.skip_question(now()) {
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::RemoveWinner | UserCommand::KeepWinner => {
            let remove = matches!(cmd, UserCommand::RemoveWinner);
            if state.phase == GamePhase::Deciding {
                state.decide(remove);
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::ToggleSound => {
            state.toggle_sound();
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::OpenSettings => {
            if state.open_settings() {
                send_snapshot(state, ui_tx).await;
            }
        }
        UserCommand::CloseSettings => {
            state.close_settings();
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::SaveSettings { roster_text } => match state.save_settings(&roster_text) {
            Ok(_) => send_snapshot(state, ui_tx).await,
            Err(_) => alert(ui_tx, EMPTY_ROSTER_ALERT).await,
        },
        UserCommand::SetSpinDuration(duration) => {
            state.set_draft_duration(duration);
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::RemoveQuestion(index) => {
            state.remove_draft_question(index);
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::ClearQuestions => {
            state.clear_draft_questions();
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::GenerateFromTopic(topic) => {
            let request = state.topic_generation(&topic);
            start_generation(state, request, ui_tx).await;
        }
        UserCommand::GenerateFromFile(path) => {
            let request = state.document_generation(&path);
            start_generation(state, request, ui_tx).await;
        }
        UserCommand::EnterCredential(key) => match state.enter_credential(&key) {
            Ok(()) => send_snapshot(state, ui_tx).await,
            Err(CredentialError::TooShort { .. }) => alert(ui_tx, SHORT_KEY_ALERT).await,
            Err(e) => alert(ui_tx, e.to_string()).await,
        },
        UserCommand::SkipCredential => {
            state.skip_credential();
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::ClearCredential => {
            state.clear_credential();
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::ReloadSession => {
            state.reload_session();
            let _ = ui_tx.send(UiUpdate::Confetti(Vec::new())).await;
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::ClearAllData => {
            state.clear_all_data();
            let _ = ui_tx.send(UiUpdate::Confetti(Vec::new())).await;
            send_snapshot(state, ui_tx).await;
        }
        UserCommand::Quit => {
            // Handled in the main loop, but included for exhaustiveness.
        }
    }
}

async fn start_generation(
    state: &mut AppState,
    request: Result<GenerationRequest, GenerationRejected>,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match request {
        Ok(request) => {
            state.begin_generation(request);
            send_snapshot(state, ui_tx).await;
        }
        Err(GenerationRejected::Alert(message)) => alert(ui_tx, message).await,
        Err(GenerationRejected::Failure(failure)) => report_failure(ui_tx, &failure).await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use async_trait::async_trait;
    use classwheel_core::config::{
        Classroom, LlmConfig, QuizConfig, Settings, VoiceConfig, WheelConfig,
    };
    use classwheel_core::notifier::{Cue, RecordingNotifier};
    use classwheel_core::quiz::{QuizItem, QuizPhase};
    use classwheel_llm::client::GenerationBackend;

    fn item(text: &str, correct: usize) -> QuizItem {
        QuizItem::new(
            text,
            ["A1".to_string(), "B1".to_string(), "C1".to_string(), "D1".to_string()],
            correct,
        )
    }

    fn inline_config(names: &[&str], questions: Vec<QuizItem>, dir: &Path) -> Config {
        Config {
            settings: Settings {
                wheel: WheelConfig {
                    spin_duration: SpinDuration::Short,
                    frame_interval_ms: 16,
                },
                quiz: QuizConfig {
                    intro_delay_ms: 1000,
                    reveal_delay_ms: 800,
                    resolve_delay_ms: 2500,
                    celebration_ms: 3000,
                    confetti_count: 50,
                },
                voice: VoiceConfig {
                    enabled: true,
                    command: Vec::new(),
                    invite: "Xin mời bạn {name}".into(),
                    correct: "đúng".into(),
                    wrong: "sai".into(),
                },
                llm: LlmConfig {
                    model: "gemini-test".into(),
                    base_url: "http://127.0.0.1:1".into(),
                    topic_temperature: 0.4,
                    document_temperature: 0.05,
                    topic_question_count: 15,
                    language: "tiếng Việt".into(),
                    max_upload_bytes: 1024,
                },
            },
            classroom: Classroom {
                names: names.iter().map(|n| n.to_string()).collect(),
                questions,
            },
            config_dir: dir.to_path_buf(),
        }
    }

    struct Fixture {
        state: AppState,
        notifier: Arc<RecordingNotifier>,
        dir: PathBuf,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    fn fixture(name: &str, names: &[&str], questions: Vec<QuizItem>) -> Fixture {
        let dir = std::env::temp_dir().join(format!("classwheel_app_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let config = inline_config(names, questions, &dir);
        let notifier = Arc::new(RecordingNotifier::new());
        let (llm_tx, _llm_rx) = mpsc::channel(16);
        let state = AppState::new(
            config.clone(),
            CredentialStore::new(config.credentials_path()),
            notifier.clone(),
            llm_tx,
        )
        .with_rng_seed(7);
        Fixture {
            state,
            notifier,
            dir,
        }
    }

    /// Backend that replies with fixed text.
    struct Scripted(String);

    #[async_trait]
    impl GenerationBackend for Scripted {
        async fn stream_generation(
            &self,
            _request: &GenerationRequest,
            tx: mpsc::Sender<LlmEvent>,
            generation: u64,
        ) -> anyhow::Result<()> {
            let _ = tx
                .send(LlmEvent::Complete {
                    full_text: self.0.clone(),
                    generation,
                })
                .await;
            Ok(())
        }
    }

    /// Spin to completion and return the time the wheel stopped.
    fn spin_to_stop(state: &mut AppState, t0: Instant) -> Instant {
        assert!(matches!(state.start_spin(t0), Some(SpinStart::Started { .. })));
        let stop = t0 + SpinDuration::Short.as_duration();
        let mut t = t0;
        while t < stop {
            t += Duration::from_millis(16);
            state.advance(t.min(stop));
        }
        stop
    }

    #[test]
    fn starts_idle_with_seeded_lists_and_key_prompt() {
        let f = fixture("seeded", &["An", "Bình"], vec![item("q", 0)]);
        let snap = f.state.snapshot();
        assert_eq!(snap.phase, GamePhase::Idle);
        assert_eq!(snap.names, vec!["An", "Bình"]);
        assert_eq!(snap.question_count, 1);
        assert!(snap.credential_prompt);
        assert!(!snap.has_credential);
        assert!(snap.sound_enabled);
    }

    #[test]
    fn spin_is_ignored_behind_credential_prompt() {
        let mut f = fixture("prompt_blocks", &["An"], vec![]);
        assert_eq!(f.state.start_spin(Instant::now()), None);
        f.state.skip_credential();
        assert!(matches!(
            f.state.start_spin(Instant::now()),
            Some(SpinStart::Started { .. })
        ));
    }

    #[test]
    fn empty_roster_spin_is_rejected() {
        let mut f = fixture("empty_roster", &[], vec![]);
        f.state.skip_credential();
        assert_eq!(f.state.start_spin(Instant::now()), Some(SpinStart::EmptyRoster));
        assert_eq!(f.state.phase, GamePhase::Idle);
    }

    #[test]
    fn second_spin_request_is_ignored() {
        let mut f = fixture("double_spin", &["An", "Bình"], vec![]);
        f.state.skip_credential();
        let t0 = Instant::now();
        f.state.start_spin(t0);
        let target = f.state.wheel.target_rotation();
        assert_eq!(f.state.start_spin(t0 + Duration::from_millis(100)), None);
        assert_eq!(f.state.wheel.target_rotation(), target);
        assert_eq!(f.state.phase, GamePhase::Spinning);
    }

    #[test]
    fn stop_invites_winner_then_presents_question() {
        let mut f = fixture("invite", &["An", "Bình", "Chi"], vec![item("q", 1)]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());

        assert_eq!(f.state.phase, GamePhase::Question);
        let winner = f.state.selected.expect("winner selected");
        let name = f.state.roster.get(winner).unwrap().to_string();
        assert!(f.notifier.cues().contains(&Cue::Win));
        assert!(f
            .notifier
            .cues()
            .contains(&Cue::Speak(format!("Xin mời bạn {name}"))));
        assert!(f.state.quiz.is_none());

        f.state.advance(stop + Duration::from_millis(999));
        assert!(f.state.quiz.is_none());
        let out = f.state.advance(stop + Duration::from_millis(1000));
        assert!(out.changed);
        let quiz = f.state.quiz.as_ref().expect("question shown");
        assert_eq!(quiz.entrant(), name);
    }

    #[test]
    fn correct_answer_celebrates_then_clears() {
        let mut f = fixture("correct", &["An", "Bình"], vec![item("q", 2)]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());
        let shown = stop + Duration::from_secs(1);
        f.state.advance(shown);

        assert!(f.state.answer(2, shown));
        assert!(!f.state.answer(1, shown));
        let revealed = shown + Duration::from_millis(800);
        f.state.advance(revealed);
        assert_eq!(
            f.state.quiz.as_ref().map(|q| q.phase()),
            Some(QuizPhase::Revealed {
                selected: 2,
                correct: true
            })
        );
        assert!(f.notifier.cues().contains(&Cue::Correct));

        let resolved = revealed + Duration::from_millis(2500);
        let out = f.state.advance(resolved);
        assert_eq!(f.state.phase, GamePhase::Deciding);
        assert!(f.state.celebration.is_some());
        assert_eq!(out.confetti.map(|d| d.len()), Some(50));

        let out = f.state.advance(resolved + Duration::from_secs(3));
        assert!(f.state.celebration.is_none());
        assert_eq!(out.confetti, Some(Vec::new()));
    }

    #[test]
    fn wrong_answer_has_no_celebration() {
        let mut f = fixture("wrong", &["An", "Bình"], vec![item("q", 2)]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());
        let shown = stop + Duration::from_secs(1);
        f.state.advance(shown);
        f.state.answer(0, shown);
        f.state.advance(shown + Duration::from_millis(800));
        f.state.advance(shown + Duration::from_millis(3300));

        assert_eq!(f.state.phase, GamePhase::Deciding);
        assert!(f.state.celebration.is_none());
        assert!(f.notifier.cues().contains(&Cue::Speak("sai".into())));
    }

    #[test]
    fn skip_goes_to_decision_without_feedback() {
        let mut f = fixture("skip", &["An"], vec![item("q", 0)]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());
        f.state.advance(stop + Duration::from_secs(1));
        f.notifier.clear();

        assert!(f.state.skip_question(stop + Duration::from_secs(2)));
        assert_eq!(f.state.phase, GamePhase::Deciding);
        assert!(f.state.celebration.is_none());
        assert!(f.notifier.cues().is_empty());
    }

    #[test]
    fn empty_bank_skips_straight_to_decision() {
        let mut f = fixture("empty_bank", &["An", "Bình"], vec![]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());
        f.state.advance(stop + Duration::from_secs(1));
        assert!(f.state.quiz.is_none());
        assert_eq!(f.state.phase, GamePhase::Deciding);
    }

    #[test]
    fn remove_winner_drops_the_name() {
        let mut f = fixture("remove", &["An", "Bình", "Chi"], vec![]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());
        f.state.advance(stop + Duration::from_secs(1));
        let winner = f.state.selected.unwrap();
        let name = f.state.roster.get(winner).unwrap().to_string();

        assert_eq!(f.state.decide(true), Some(name.clone()));
        assert_eq!(f.state.roster.len(), 2);
        assert!(!f.state.roster.names().contains(&name));
        assert_eq!(f.state.phase, GamePhase::Idle);
        assert_eq!(f.state.selected, None);
    }

    #[test]
    fn keep_winner_retains_the_name() {
        let mut f = fixture("keep", &["An", "Bình"], vec![]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());
        f.state.advance(stop + Duration::from_secs(1));

        assert_eq!(f.state.decide(false), None);
        assert_eq!(f.state.roster.len(), 2);
        assert_eq!(f.state.phase, GamePhase::Idle);
        assert_eq!(f.state.selected, None);
    }

    #[test]
    fn rotation_persists_across_rounds() {
        let mut f = fixture("persist", &["An", "Bình"], vec![]);
        f.state.skip_credential();
        let stop = spin_to_stop(&mut f.state, Instant::now());
        let after_first = f.state.wheel.rotation();
        f.state.advance(stop + Duration::from_secs(1));
        f.state.decide(false);
        spin_to_stop(&mut f.state, stop + Duration::from_secs(2));
        assert!(f.state.wheel.rotation() >= after_first + 1800.0);
    }

    #[test]
    fn toggle_sound_mutes_cues() {
        let mut f = fixture("mute", &["An"], vec![]);
        assert!(!f.state.toggle_sound());
        f.state.skip_credential();
        spin_to_stop(&mut f.state, Instant::now());
        assert!(f.notifier.cues().is_empty());
        assert!(!f.state.snapshot().sound_enabled);
    }

    #[test]
    fn settings_only_open_while_idle() {
        let mut f = fixture("settings_idle", &["An"], vec![]);
        f.state.skip_credential();
        f.state.start_spin(Instant::now());
        assert!(!f.state.open_settings());
    }

    #[test]
    fn save_settings_with_empty_roster_changes_nothing() {
        let mut f = fixture("save_empty", &["An", "Bình"], vec![item("q", 0)]);
        f.state.open_settings();
        f.state.clear_draft_questions();

        assert_eq!(f.state.save_settings("  \n \n"), Err(StoreError::EmptyRoster));
        assert_eq!(f.state.roster.len(), 2);
        assert_eq!(f.state.bank.len(), 1);
        assert!(f.state.settings.is_some());
    }

    #[test]
    fn save_settings_commits_draft() {
        let mut f = fixture("save_ok", &["An"], vec![item("q0", 0), item("q1", 0)]);
        f.state.open_settings();
        f.state.remove_draft_question(0);
        f.state.set_draft_duration(SpinDuration::Long);

        assert_eq!(f.state.save_settings("Dũng\n\n Giang \n"), Ok(2));
        assert_eq!(f.state.roster.names(), ["Dũng", "Giang"]);
        assert_eq!(f.state.bank.len(), 1);
        assert_eq!(f.state.bank.items()[0].question(), "q1");
        assert_eq!(f.state.spin_duration, SpinDuration::Long);
        assert!(f.state.settings.is_none());
    }

    #[test]
    fn close_settings_discards_draft() {
        let mut f = fixture("close", &["An"], vec![item("q0", 0)]);
        f.state.open_settings();
        f.state.clear_draft_questions();
        f.state.close_settings();
        assert_eq!(f.state.bank.len(), 1);
    }

    #[test]
    fn topic_generation_requires_topic_and_key() {
        let mut f = fixture("topic_checks", &["An"], vec![]);
        f.state.open_settings();
        assert_eq!(
            f.state.topic_generation("   "),
            Err(GenerationRejected::Alert(MISSING_SOURCE_ALERT.to_string()))
        );
        assert_eq!(
            f.state.topic_generation("Este"),
            Err(GenerationRejected::Failure(GenerationFailure::MissingCredential))
        );
    }

    #[test]
    fn oversized_document_is_rejected_before_any_request() {
        let mut f = fixture("too_large", &["An"], vec![]);
        f.state.open_settings();
        let path = f.dir.join("big.pdf");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        match f.state.document_generation(&path) {
            Err(GenerationRejected::Alert(message)) => assert!(message.contains("File quá lớn")),
            other => panic!("expected alert, got {other:?}"),
        }
        assert!(f.state.pending_generation.is_none());
    }

    #[test]
    fn topic_results_are_prepended_and_documents_replace() {
        let mut f = fixture("apply", &["An"], vec![item("old", 0)]);
        f.state.open_settings();
        let text = r#"[{"q":"new","options":["1","2","3","4"],"correct":1}]"#;

        assert_eq!(f.state.apply_generated(GenerationKind::Topic, text), Ok(1));
        let draft = &f.state.settings.as_ref().unwrap().questions;
        let texts: Vec<&str> = draft.items().iter().map(|q| q.question()).collect();
        assert_eq!(texts, vec!["new", "old"]);

        assert_eq!(f.state.apply_generated(GenerationKind::Document, text), Ok(1));
        assert_eq!(f.state.settings.as_ref().unwrap().questions.len(), 1);
    }

    #[test]
    fn unusable_output_is_bad_format_and_leaves_draft() {
        let mut f = fixture("bad_format", &["An"], vec![item("old", 0)]);
        f.state.open_settings();
        assert_eq!(
            f.state.apply_generated(GenerationKind::Topic, "Xin lỗi, tôi không thể."),
            Err(GenerationFailure::BadFormat)
        );
        assert_eq!(f.state.settings.as_ref().unwrap().questions.len(), 1);
    }

    #[tokio::test]
    async fn stale_generation_events_are_discarded() {
        let mut f = fixture("stale", &["An"], vec![]);
        f.state.llm_client = LlmClient::Active(Arc::new(Scripted("[]".into())));
        f.state.open_settings();
        let request = f.state.topic_generation("Este").unwrap();
        let generation = f.state.begin_generation(request);
        let (ui_tx, mut ui_rx) = mpsc::channel(16);

        let stale = LlmEvent::Complete {
            full_text: r#"[{"q":"late"}]"#.into(),
            generation: generation - 1,
        };
        handle_llm_event(&mut f.state, stale, &ui_tx).await;
        assert!(ui_rx.try_recv().is_err());
        assert_eq!(f.state.pending_generation, Some(GenerationKind::Topic));
        assert!(f.state.settings.as_ref().unwrap().questions.is_empty());
    }

    #[tokio::test]
    async fn error_event_reports_classified_failure() {
        let mut f = fixture("error_event", &["An"], vec![]);
        f.state.open_settings();
        f.state.pending_generation = Some(GenerationKind::Topic);
        let (ui_tx, mut ui_rx) = mpsc::channel(16);
        let event = LlmEvent::Error {
            message: "API returned status 429 Too Many Requests".into(),
            generation: f.state.llm_generation,
        };
        handle_llm_event(&mut f.state, event, &ui_tx).await;

        match ui_rx.recv().await {
            Some(UiUpdate::GenerationFailed {
                credential_problem, ..
            }) => assert!(credential_problem),
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
        assert!(f.state.pending_generation.is_none());
    }

    #[test]
    fn short_key_is_rejected() {
        let mut f = fixture("short_key", &["An"], vec![]);
        assert!(matches!(
            f.state.enter_credential("abc"),
            Err(CredentialError::TooShort { .. })
        ));
        assert!(f.state.credential_prompt);
    }

    #[test]
    fn valid_key_activates_client_and_persists() {
        let mut f = fixture("valid_key", &["An"], vec![]);
        f.state.enter_credential("AIza-0123456789-abcdefgh").unwrap();
        assert!(f.state.llm_client.is_active());
        assert!(!f.state.credential_prompt);
        assert_eq!(
            f.state.credentials.load().unwrap().as_deref(),
            Some("AIza-0123456789-abcdefgh")
        );

        f.state.clear_credential();
        assert!(!f.state.llm_client.is_active());
        assert!(f.state.credential_prompt);
        assert!(f.state.credentials.load().unwrap().is_none());
    }

    fn play_round_and_remove(f: &mut Fixture) {
        let stop = spin_to_stop(&mut f.state, Instant::now());
        f.state.advance(stop + Duration::from_secs(1));
        f.state.skip_question(stop + Duration::from_secs(1));
        f.state.decide(true);
    }

    #[test]
    fn reload_session_reseeds_and_keeps_key() {
        let mut f = fixture("reload", &["An", "Bình"], vec![item("q", 0)]);
        f.state.enter_credential("AIza-0123456789-abcdefgh").unwrap();
        play_round_and_remove(&mut f);
        assert_eq!(f.state.roster.len(), 1);

        f.state.reload_session();
        assert_eq!(f.state.roster.len(), 2);
        assert_eq!(f.state.bank.len(), 1);
        assert_eq!(f.state.wheel.rotation(), 0.0);
        assert_eq!(f.state.phase, GamePhase::Idle);
        assert!(f.state.llm_client.is_active());
        assert!(!f.state.credential_prompt);
        assert_eq!(
            f.state.credentials.load().unwrap().as_deref(),
            Some("AIza-0123456789-abcdefgh")
        );
    }

    #[test]
    fn clear_all_data_reseeds_and_forgets_key() {
        let mut f = fixture("clear_all", &["An", "Bình"], vec![item("q", 0)]);
        f.state.enter_credential("AIza-0123456789-abcdefgh").unwrap();
        play_round_and_remove(&mut f);
        assert!(f.state.open_settings());

        f.state.clear_all_data();
        assert_eq!(f.state.roster.len(), 2);
        assert_eq!(f.state.bank.len(), 1);
        assert!(f.state.settings.is_none());
        assert!(!f.state.llm_client.is_active());
        assert!(f.state.credential_prompt);
        assert!(f.state.credentials.load().unwrap().is_none());
    }
}
