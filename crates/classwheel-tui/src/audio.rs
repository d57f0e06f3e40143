// Terminal audio adapter.
//
// Cues raised by the wheel and the quiz arrive here from the app task over a
// bounded channel. Tones become terminal bells; speech is handed to an
// external program (for example `espeak-ng -v vi`) configured in
// `[voice].command`.

use std::io::Write;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use classwheel_core::notifier::{Cue, CueNotifier};

/// A notifier that queues every cue on `tx`. Cues are dropped when the queue
/// is full, never blocking the caller.
pub fn channel_notifier(
    tx: mpsc::Sender<Cue>,
    enabled: bool,
) -> CueNotifier<impl Fn(Cue) + Send + Sync + 'static> {
    CueNotifier::new(
        move |cue| {
            if let Err(e) = tx.try_send(cue) {
                debug!("cue dropped: {e}");
            }
        },
        enabled,
    )
}

/// Number of bells rung for a tone cue.
pub fn bell_count(cue: &Cue) -> usize {
    match cue {
        Cue::Tick | Cue::Correct => 1,
        Cue::Win => 2,
        Cue::Wrong => 3,
        Cue::Speak(_) => 0,
    }
}

pub struct AudioPlayer<W: Write> {
    out: W,
    speech_command: Vec<String>,
    speaking: Option<Child>,
}

impl<W: Write> AudioPlayer<W> {
    pub fn new(out: W, speech_command: Vec<String>) -> Self {
        Self {
            out,
            speech_command,
            speaking: None,
        }
    }

    pub fn play(&mut self, cue: Cue) {
        match cue {
            Cue::Speak(text) => self.speak(&text),
            tone => self.ring(bell_count(&tone)),
        }
    }

    fn ring(&mut self, count: usize) {
        let bells = vec![0x07u8; count];
        if let Err(e) = self.out.write_all(&bells).and_then(|_| self.out.flush()) {
            warn!("failed to ring bell: {e}");
        }
    }

    /// Speak `text`, cutting off whatever is still being said.
    fn speak(&mut self, text: &str) {
        let speech_command = self.speech_command.clone();
        let Some((program, args)) = speech_command.split_first() else {
            debug!(text, "no speech command configured");
            return;
        };
        self.stop();

        let spawned = Command::new(program)
            .args(args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();
        match spawned {
            Ok(child) => self.speaking = Some(child),
            Err(e) => warn!(program = %program, "failed to start speech command: {e}"),
        }
    }

    pub fn stop(&mut self) {
        if let Some(mut child) = self.speaking.take() {
            let _ = child.start_kill();
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classwheel_core::notifier::Notifier;

    #[test]
    fn tones_ring_the_bell() {
        let mut player = AudioPlayer::new(Vec::new(), Vec::new());
        player.play(Cue::Tick);
        player.play(Cue::Win);
        player.play(Cue::Wrong);
        assert_eq!(player.out, vec![0x07; 6]);
    }

    #[test]
    fn speech_without_command_is_silent() {
        let mut player = AudioPlayer::new(Vec::new(), Vec::new());
        player.play(Cue::Speak("Xin mời bạn An".into()));
        assert!(player.out.is_empty());
        assert!(!player.is_speaking());
    }

    #[test]
    fn channel_notifier_forwards_until_muted() {
        let (tx, mut rx) = mpsc::channel(8);
        let notifier = channel_notifier(tx, true);
        notifier.win();
        notifier.speak("Chính xác");
        notifier.set_enabled(false);
        notifier.tick();

        assert_eq!(rx.try_recv().ok(), Some(Cue::Win));
        assert_eq!(rx.try_recv().ok(), Some(Cue::Speak("Chính xác".into())));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn full_queue_drops_cues() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = channel_notifier(tx, true);
        notifier.tick();
        notifier.tick();
        assert_eq!(rx.try_recv().ok(), Some(Cue::Tick));
        assert!(rx.try_recv().is_err());
    }
}
