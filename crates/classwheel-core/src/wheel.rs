// Selection engine: spin animation state, rotation-to-slice mapping, winner.
//
// The wheel is partitioned into `n` equal slices laid out clockwise from local
// angle 0 (east). A fixed pointer sits at 270 degrees (top). A spin sweeps the
// wheel forward by at least five full turns along an ease-out quartic curve;
// the slice under the pointer when the curve reaches 1 is the winner.
//
// The engine is frame driven: the caller invokes `Wheel::frame` once per
// rendered frame with the current instant. It never sleeps or schedules.

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::notifier::Notifier;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Pointer position in the wheel's local frame (0 = east, clockwise on screen).
pub const POINTER_ANGLE: f64 = 270.0;

/// Minimum sweep of a spin: five full rotations.
pub const MIN_SWEEP: f64 = 1800.0;

/// Random extra sweep added on top of `MIN_SWEEP`, sampled from `[0, 360)`.
pub const SWEEP_JITTER: f64 = 360.0;

/// Labels longer than this are shortened for display.
pub const LABEL_MAX_CHARS: usize = 15;
const LABEL_KEEP_CHARS: usize = 13;

/// Slice colours, cycled by slice index.
pub const PALETTE: [(u8, u8, u8); 8] = [
    (0xFF, 0x52, 0x52),
    (0xFF, 0xCA, 0x28),
    (0x42, 0xA5, 0xF5),
    (0x66, 0xBB, 0x6A),
    (0xEC, 0x40, 0x7A),
    (0xAB, 0x47, 0xBC),
    (0xFF, 0xA7, 0x26),
    (0x26, 0xC6, 0xDA),
];

// ---------------------------------------------------------------------------
// SpinDuration
// ---------------------------------------------------------------------------

/// How long one spin animation lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinDuration {
    Short,
    #[default]
    Medium,
    Long,
}

impl SpinDuration {
    pub const ALL: [SpinDuration; 3] = [SpinDuration::Short, SpinDuration::Medium, SpinDuration::Long];

    pub fn as_duration(self) -> Duration {
        match self {
            SpinDuration::Short => Duration::from_millis(1000),
            SpinDuration::Medium => Duration::from_millis(3000),
            SpinDuration::Long => Duration::from_millis(5000),
        }
    }

    /// The next choice in the `Short -> Medium -> Long -> Short` cycle.
    pub fn next(self) -> Self {
        match self {
            SpinDuration::Short => SpinDuration::Medium,
            SpinDuration::Medium => SpinDuration::Long,
            SpinDuration::Long => SpinDuration::Short,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpinDuration::Short => "short (1s)",
            SpinDuration::Medium => "medium (3s)",
            SpinDuration::Long => "long (5s)",
        }
    }
}

// ---------------------------------------------------------------------------
// Pure geometry
// ---------------------------------------------------------------------------

/// Ease-out quartic: `1 - (1 - p)^4`, with `p` clamped into `[0, 1]`.
pub fn ease_out_quart(progress: f64) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(4)
}

/// Angular width of one slice in degrees, or `None` for an empty wheel.
pub fn slice_width(entrants: usize) -> Option<f64> {
    if entrants == 0 {
        None
    } else {
        Some(360.0 / entrants as f64)
    }
}

/// Index of the slice under the pointer for a given cumulative rotation.
///
/// A pure function of `(rotation mod 360, entrants)`. Both tick detection and
/// the final winner go through here so they can never disagree.
pub fn winning_index(rotation: f64, entrants: usize) -> Option<usize> {
    let width = slice_width(entrants)?;
    let degrees = rotation.rem_euclid(360.0);
    let angle_at_pointer = (POINTER_ANGLE - degrees + 360.0) % 360.0;
    Some((angle_at_pointer / width).floor() as usize % entrants)
}

/// Start angle (screen-clockwise degrees) of slice `index` after rotation.
pub fn slice_start_angle(index: usize, entrants: usize, rotation: f64) -> Option<f64> {
    let width = slice_width(entrants)?;
    Some((index as f64 * width + rotation).rem_euclid(360.0))
}

/// Shorten a display name to fit on a slice.
pub fn truncate_label(name: &str) -> String {
    if name.chars().count() > LABEL_MAX_CHARS {
        let kept: String = name.chars().take(LABEL_KEEP_CHARS).collect();
        format!("{kept}...")
    } else {
        name.to_string()
    }
}

/// Colour of a slice and whether its label should be drawn dark.
pub fn slice_color(index: usize) -> ((u8, u8, u8), bool) {
    let color = PALETTE[index % PALETTE.len()];
    // The yellow slice is the only one light enough to need dark text.
    let dark_text = color == PALETTE[1];
    (color, dark_text)
}

// ---------------------------------------------------------------------------
// Spin results
// ---------------------------------------------------------------------------

/// Outcome of a spin request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpinStart {
    Started { sweep: f64 },
    /// A spin is already in flight; nothing changed.
    AlreadySpinning,
    /// There is nothing to pick from.
    EmptyRoster,
}

/// What one animation frame produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinFrame {
    /// Absolute rotation in degrees after this frame.
    pub rotation: f64,
    /// Linear time progress in `[0, 1]`.
    pub progress: f64,
    /// Slice currently under the pointer.
    pub segment: usize,
    /// A slice boundary crossed the pointer since the previous frame.
    pub ticked: bool,
    /// Set on the final frame only.
    pub winner: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct ActiveSpin {
    start_rotation: f64,
    sweep: f64,
    started_at: Instant,
    duration: Duration,
    entrants: usize,
}

// ---------------------------------------------------------------------------
// Wheel
// ---------------------------------------------------------------------------

/// Owned spin state: cumulative rotation, the active spin (if any), and the
/// slice seen on the previous frame.
#[derive(Debug, Clone, Default)]
pub struct Wheel {
    rotation: f64,
    active: Option<ActiveSpin>,
    last_segment: Option<usize>,
}

impl Wheel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative rotation in degrees. Only ever grows between resets.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn is_spinning(&self) -> bool {
        self.active.is_some()
    }

    pub fn last_segment(&self) -> Option<usize> {
        self.last_segment
    }

    /// Rotation the active spin will come to rest at.
    pub fn target_rotation(&self) -> Option<f64> {
        self.active.map(|spin| spin.start_rotation + spin.sweep)
    }

    /// Start a spin with a random sweep of `1800 + [0, 360)` degrees.
    pub fn start_spin<R: Rng>(
        &mut self,
        entrants: usize,
        duration: Duration,
        now: Instant,
        rng: &mut R,
    ) -> SpinStart {
        if self.is_spinning() {
            return SpinStart::AlreadySpinning;
        }
        if entrants == 0 {
            return SpinStart::EmptyRoster;
        }
        let sweep = MIN_SWEEP + rng.gen_range(0.0..SWEEP_JITTER);
        self.start_spin_with_sweep(entrants, duration, now, sweep)
    }

    /// Start a spin with a caller-chosen sweep.
    pub fn start_spin_with_sweep(
        &mut self,
        entrants: usize,
        duration: Duration,
        now: Instant,
        sweep: f64,
    ) -> SpinStart {
        if self.is_spinning() {
            debug!("spin rejected: already spinning");
            return SpinStart::AlreadySpinning;
        }
        if entrants == 0 {
            debug!("spin rejected: empty roster");
            return SpinStart::EmptyRoster;
        }

        self.active = Some(ActiveSpin {
            start_rotation: self.rotation,
            sweep,
            started_at: now,
            duration,
            entrants,
        });
        self.last_segment = None;

        info!(
            entrants,
            sweep,
            duration_ms = duration.as_millis() as u64,
            "spin started"
        );
        SpinStart::Started { sweep }
    }

    /// Advance the active spin to `now`.
    ///
    /// Calls `notifier.tick()` when the pointer slice changed since the
    /// previous frame of this spin (never on the first frame), and
    /// `notifier.win()` on the final frame. Returns `None` when idle.
    pub fn frame(&mut self, now: Instant, notifier: &dyn Notifier) -> Option<SpinFrame> {
        let spin = self.active?;

        let elapsed = now.saturating_duration_since(spin.started_at);
        let progress = if spin.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / spin.duration.as_secs_f64()).min(1.0)
        };

        self.rotation = spin.start_rotation + spin.sweep * ease_out_quart(progress);

        let segment = winning_index(self.rotation, spin.entrants)?;
        let ticked = matches!(self.last_segment, Some(previous) if previous != segment);
        if ticked {
            notifier.tick();
        }
        self.last_segment = Some(segment);

        let winner = if progress >= 1.0 {
            self.active = None;
            notifier.win();
            info!(winner = segment, rotation = self.rotation, "spin finished");
            Some(segment)
        } else {
            None
        };

        Some(SpinFrame {
            rotation: self.rotation,
            progress,
            segment,
            ticked,
            winner,
        })
    }

    /// Back to a motionless wheel at rotation 0.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
