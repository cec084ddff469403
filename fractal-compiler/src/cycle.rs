//! Crossfade state between the previous and the current formula.

use std::f32::consts::PI;

use crate::config::CycleConfig;
use crate::formula::Formula;

const MIX_EPSILON: f32 = 1e-7;

/// Eases `x` in [0, 1] with a half cosine.
pub fn cos_smooth(x: f32) -> f32 {
    ((x - 1.0) * PI).cos() * 0.5 + 0.5
}

/// The per-sketch formula cycle.
///
/// `last` is interpolation source A, `current` is source B. The elapsed-time
/// accumulator drives the mix; once it passes 1.0 the cycle is due for a new
/// formula. Only [`accept`](Self::accept), [`keep`](Self::keep) and
/// [`finish_frame`](Self::finish_frame) mutate it.
#[derive(Debug, Clone)]
pub struct FractalCycle {
    last: Formula,
    current: Formula,
    elapsed: f32,
    speed: f32,
    max_step: f32,
    generation_frame: bool,
    skip_advance: bool,
    generations: u64,
}

impl FractalCycle {
    pub fn new(last: Formula, current: Formula, config: &CycleConfig) -> Self {
        Self {
            last,
            current,
            elapsed: 0.0,
            speed: config.speed,
            max_step: config.max_step,
            generation_frame: false,
            skip_advance: false,
            generations: 0,
        }
    }

    pub fn from_config(config: &CycleConfig) -> Self {
        Self::new(
            Formula::new(config.initial_last.clone()),
            Formula::new(config.initial_current.clone()),
            config,
        )
    }

    pub fn last(&self) -> &Formula {
        &self.last
    }

    pub fn current(&self) -> &Formula {
        &self.current
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Number of cycle boundaries passed so far.
    pub fn generations(&self) -> u64 {
        self.generations
    }

    /// Blend from `last` (0) to `current` (1), kept strictly inside (0, 1).
    pub fn mix(&self) -> f32 {
        cos_smooth(cos_smooth(self.elapsed.min(1.0))).clamp(MIX_EPSILON, 1.0 - MIX_EPSILON)
    }

    /// True once the crossfade has run its course.
    pub fn is_due(&self) -> bool {
        self.elapsed > 1.0
    }

    /// Promote `candidate` to current; the old current becomes the fade source.
    pub fn accept(&mut self, candidate: Formula) {
        self.last = std::mem::replace(&mut self.current, candidate);
        self.restart();
    }

    /// End a cycle without a new formula: fade from the current formula to itself.
    pub fn keep(&mut self) {
        self.last = self.current.clone();
        self.restart();
    }

    fn restart(&mut self) {
        self.elapsed = 0.0;
        self.generation_frame = true;
        self.generations += 1;
    }

    /// Advance the clock by a frame delta in seconds.
    ///
    /// Deltas are clamped to `max_step`. The frame following a generation
    /// frame contributes nothing, since its delta includes the search stall.
    pub fn finish_frame(&mut self, dt: f32) {
        if !self.skip_advance {
            self.elapsed += dt.clamp(0.0, self.max_step) * self.speed;
        }
        self.skip_advance = self.generation_frame;
        self.generation_frame = false;
    }
}
