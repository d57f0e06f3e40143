// Confetti burst shown after a correct answer.

use std::time::{Duration, Instant};

use rand::Rng;

pub const CONFETTI_COLORS: [(u8, u8, u8); 5] = [
    (0xFF, 0x00, 0x00),
    (0x00, 0xFF, 0x00),
    (0x00, 0x00, 0xFF),
    (0xFF, 0xFF, 0x00),
    (0x00, 0xFF, 0xFF),
];

const MIN_FALL_SECS: f64 = 1.0;
const FALL_JITTER_SECS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    /// Horizontal position as a fraction of the screen width, `[0, 1)`.
    pub column: f64,
    pub color: (u8, u8, u8),
    /// Time to fall from the top edge to the bottom edge.
    pub fall: Duration,
}

impl Particle {
    /// Vertical position as a fraction of the screen height, or `None` once the
    /// particle has left the screen.
    pub fn height_at(&self, elapsed: Duration) -> Option<f64> {
        let fall = self.fall.as_secs_f64();
        if fall <= 0.0 {
            return None;
        }
        let y = elapsed.as_secs_f64() / fall;
        (y < 1.0).then_some(y)
    }
}

#[derive(Debug, Clone)]
pub struct Celebration {
    particles: Vec<Particle>,
    started_at: Instant,
    lifetime: Duration,
}

impl Celebration {
    pub fn launch<R: Rng>(count: usize, lifetime: Duration, now: Instant, rng: &mut R) -> Self {
        let particles = (0..count)
            .map(|_| Particle {
                column: rng.gen_range(0.0..1.0),
                color: CONFETTI_COLORS[rng.gen_range(0..CONFETTI_COLORS.len())],
                fall: Duration::from_secs_f64(MIN_FALL_SECS + rng.gen_range(0.0..FALL_JITTER_SECS)),
            })
            .collect();
        Self {
            particles,
            started_at: now,
            lifetime,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.lifetime
    }
}
