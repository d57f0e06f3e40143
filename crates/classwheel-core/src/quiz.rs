// Quiz items and the per-presentation answer state machine.
//
//   Unanswered --select--> Locked --reveal_delay--> Revealed --resolve_delay--> Resolved
//        \________________________skip_________________________________________/
//
// A presentation accepts exactly one answer. Timers are checked by `poll`,
// which the caller drives from its frame loop.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::notifier::Notifier;

pub const OPTION_COUNT: usize = 4;
pub const OPTION_LABELS: [char; OPTION_COUNT] = ['A', 'B', 'C', 'D'];

/// Highest valid correct-answer index.
pub const MAX_CORRECT_INDEX: usize = OPTION_COUNT - 1;

// ---------------------------------------------------------------------------
// QuizItem
// ---------------------------------------------------------------------------

/// A multiple-choice question with exactly four options.
///
/// The correct index is clamped into `[0, 3]` by every constructor, including
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "QuizItemRecord")]
pub struct QuizItem {
    #[serde(rename = "q")]
    question: String,
    options: [String; OPTION_COUNT],
    correct: usize,
}

#[derive(Deserialize)]
struct QuizItemRecord {
    q: String,
    options: [String; OPTION_COUNT],
    #[serde(default)]
    correct: usize,
}

impl From<QuizItemRecord> for QuizItem {
    fn from(record: QuizItemRecord) -> Self {
        QuizItem::new(record.q, record.options, record.correct)
    }
}

impl QuizItem {
    pub fn new(question: impl Into<String>, options: [String; OPTION_COUNT], correct: usize) -> Self {
        Self {
            question: question.into(),
            options,
            correct: correct.min(MAX_CORRECT_INDEX),
        }
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String; OPTION_COUNT] {
        &self.options
    }

    pub fn correct(&self) -> usize {
        self.correct
    }

    pub fn is_correct(&self, index: usize) -> bool {
        index == self.correct
    }
}

// ---------------------------------------------------------------------------
// Timing and phrases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizTiming {
    /// Pause between locking an answer and revealing the verdict.
    pub reveal_delay: Duration,
    /// Pause between the verdict and handing the outcome back.
    pub resolve_delay: Duration,
}

impl Default for QuizTiming {
    fn default() -> Self {
        Self {
            reveal_delay: Duration::from_millis(800),
            resolve_delay: Duration::from_millis(2500),
        }
    }
}

/// Spoken feedback after the verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackPhrases {
    pub correct: String,
    pub wrong: String,
}

impl Default for FeedbackPhrases {
    fn default() -> Self {
        Self {
            correct: "Chúc mừng bạn đã trả lời chính xác".to_string(),
            wrong: "Rất tiếc bạn đã trả lời sai".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Phases and events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizOutcome {
    Answered { correct: bool },
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Unanswered,
    Locked { selected: usize },
    Revealed { selected: usize, correct: bool },
    Resolved(QuizOutcome),
}

/// A timer-driven transition reported by `QuizFlow::poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    Revealed { selected: usize, correct: bool },
    Resolved(QuizOutcome),
}

// ---------------------------------------------------------------------------
// QuizFlow
// ---------------------------------------------------------------------------

/// One presentation of one question to one entrant.
#[derive(Debug, Clone)]
pub struct QuizFlow {
    entrant: String,
    item: QuizItem,
    phase: QuizPhase,
    deadline: Option<Instant>,
    timing: QuizTiming,
}

impl QuizFlow {
    pub fn present(entrant: impl Into<String>, item: QuizItem, timing: QuizTiming) -> Self {
        let entrant = entrant.into();
        info!(entrant = %entrant, "question presented");
        Self {
            entrant,
            item,
            phase: QuizPhase::Unanswered,
            deadline: None,
            timing,
        }
    }

    pub fn entrant(&self) -> &str {
        &self.entrant
    }

    pub fn item(&self) -> &QuizItem {
        &self.item
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<QuizOutcome> {
        match self.phase {
            QuizPhase::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Lock in an answer. Only the first valid selection counts.
    pub fn select(&mut self, index: usize, now: Instant) -> bool {
        if self.phase != QuizPhase::Unanswered || index >= OPTION_COUNT {
            debug!(index, phase = ?self.phase, "selection ignored");
            return false;
        }
        self.phase = QuizPhase::Locked { selected: index };
        self.deadline = Some(now + self.timing.reveal_delay);
        true
    }

    /// Abandon the question without a verdict. Only allowed before answering.
    pub fn skip(&mut self) -> bool {
        if self.phase != QuizPhase::Unanswered {
            return false;
        }
        info!(entrant = %self.entrant, "question skipped");
        self.phase = QuizPhase::Resolved(QuizOutcome::Skipped);
        self.deadline = None;
        true
    }

    /// Fire at most one due timer transition.
    pub fn poll(
        &mut self,
        now: Instant,
        notifier: &dyn Notifier,
        phrases: &FeedbackPhrases,
    ) -> Option<QuizEvent> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }

        match self.phase {
            QuizPhase::Locked { selected } => {
                let correct = self.item.is_correct(selected);
                if correct {
                    notifier.correct();
                    notifier.speak(&phrases.correct);
                } else {
                    notifier.wrong();
                    notifier.speak(&phrases.wrong);
                }
                info!(entrant = %self.entrant, selected, correct, "answer revealed");
                self.phase = QuizPhase::Revealed { selected, correct };
                self.deadline = Some(now + self.timing.resolve_delay);
                Some(QuizEvent::Revealed { selected, correct })
            }
            QuizPhase::Revealed { correct, .. } => {
                let outcome = QuizOutcome::Answered { correct };
                self.phase = QuizPhase::Resolved(outcome);
                self.deadline = None;
                Some(QuizEvent::Resolved(outcome))
            }
            QuizPhase::Unanswered | QuizPhase::Resolved(_) => {
                self.deadline = None;
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
