// Audio/speech notifier capability.
//
// The wheel and the quiz flow never talk to a sound device directly. They call
// a `Notifier`, which may be silent (headless runs, tests), recording (tests),
// or a real adapter owned by the front end. Every implementation must treat
// all calls as no-ops while disabled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

// ---------------------------------------------------------------------------
// Cue
// ---------------------------------------------------------------------------

/// One fire-and-forget notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cue {
    /// Short ratchet click when a slice boundary passes the pointer.
    Tick,
    /// Fanfare when the wheel stops.
    Win,
    /// Success tone after a correct answer.
    Correct,
    /// Failure tone after a wrong answer.
    Wrong,
    /// Text to be spoken aloud.
    Speak(String),
}

// ---------------------------------------------------------------------------
// Notifier trait
// ---------------------------------------------------------------------------

pub trait Notifier: Send + Sync {
    fn tick(&self);
    fn win(&self);
    fn correct(&self);
    fn wrong(&self);
    fn speak(&self, text: &str);
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
}

// ---------------------------------------------------------------------------
// SilentNotifier
// ---------------------------------------------------------------------------

/// Notifier that never makes a sound.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn tick(&self) {}
    fn win(&self) {}
    fn correct(&self) {}
    fn wrong(&self) {}
    fn speak(&self, _text: &str) {}
    fn set_enabled(&self, _enabled: bool) {}
    fn is_enabled(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// CueNotifier
// ---------------------------------------------------------------------------

/// Notifier that turns each call into a `Cue` and hands it to a sink closure.
///
/// The enabled flag is checked before the sink runs, so front ends only ever
/// implement "deliver this cue" and get muting for free.
pub struct CueNotifier<F>
where
    F: Fn(Cue) + Send + Sync,
{
    sink: F,
    enabled: AtomicBool,
}

impl<F> CueNotifier<F>
where
    F: Fn(Cue) + Send + Sync,
{
    pub fn new(sink: F, enabled: bool) -> Self {
        Self {
            sink,
            enabled: AtomicBool::new(enabled),
        }
    }

    fn emit(&self, cue: Cue) {
        if self.enabled.load(Ordering::Relaxed) {
            (self.sink)(cue);
        }
    }
}

impl<F> Notifier for CueNotifier<F>
where
    F: Fn(Cue) + Send + Sync,
{
    fn tick(&self) {
        self.emit(Cue::Tick);
    }

    fn win(&self) {
        self.emit(Cue::Win);
    }

    fn correct(&self) {
        self.emit(Cue::Correct);
    }

    fn wrong(&self) {
        self.emit(Cue::Wrong);
    }

    fn speak(&self, text: &str) {
        self.emit(Cue::Speak(text.to_string()));
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// RecordingNotifier
// ---------------------------------------------------------------------------

/// Notifier that stores every delivered cue. Used by headless tests to assert
/// on audio side effects.
#[derive(Debug)]
pub struct RecordingNotifier {
    cues: Mutex<Vec<Cue>>,
    enabled: AtomicBool,
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self {
            cues: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        }
    }
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all cues delivered so far.
    pub fn cues(&self) -> Vec<Cue> {
        match self.cues.lock() {
            Ok(cues) => cues.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, cue: &Cue) -> usize {
        self.cues().iter().filter(|c| *c == cue).count()
    }

    pub fn clear(&self) {
        if let Ok(mut cues) = self.cues.lock() {
            cues.clear();
        }
    }

    fn record(&self, cue: Cue) {
        if !self.enabled.load(Ordering::Relaxed) {
            return;
        }
        if let Ok(mut cues) = self.cues.lock() {
            cues.push(cue);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn tick(&self) {
        self.record(Cue::Tick);
    }

    fn win(&self) {
        self.record(Cue::Win);
    }

    fn correct(&self) {
        self.record(Cue::Correct);
    }

    fn wrong(&self) {
        self.record(Cue::Wrong);
    }

    fn speak(&self, text: &str) {
        self.record(Cue::Speak(text.to_string()));
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn cue_notifier_forwards_when_enabled() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let notifier = CueNotifier::new(move |cue| sink_seen.lock().unwrap().push(cue), true);

        notifier.tick();
        notifier.speak("hello");

        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![Cue::Tick, Cue::Speak("hello".to_string())]);
    }

    #[test]
    fn muted_cue_notifier_is_a_no_op() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let notifier = CueNotifier::new(move |cue| sink_seen.lock().unwrap().push(cue), true);

        notifier.set_enabled(false);
        notifier.tick();
        notifier.win();
        notifier.correct();
        notifier.wrong();
        notifier.speak("ignored");

        assert!(!notifier.is_enabled());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn re_enabling_resumes_delivery() {
        let notifier = RecordingNotifier::new();
        notifier.set_enabled(false);
        notifier.win();
        notifier.set_enabled(true);
        notifier.win();
        assert_eq!(notifier.cues(), vec![Cue::Win]);
    }

    #[test]
    fn recording_notifier_counts_cues() {
        let notifier = RecordingNotifier::new();
        notifier.tick();
        notifier.tick();
        notifier.correct();
        assert_eq!(notifier.count(&Cue::Tick), 2);
        assert_eq!(notifier.count(&Cue::Correct), 1);
        notifier.clear();
        assert!(notifier.cues().is_empty());
    }

    #[test]
    fn silent_notifier_reports_disabled() {
        let notifier = SilentNotifier;
        notifier.set_enabled(true);
        notifier.tick();
        assert!(!notifier.is_enabled());
    }
}
