//! Sine oscillator for harmonic partial banks.
//!
//! The Drone, Generative, and Khs engines are built on banks of these:
//! one phase accumulator per partial, retuned by the macro schedulers
//! through smoothed frequency targets.

use core::f32::consts::PI;
use libm::sinf;

/// Phase-accumulator sine oscillator.
#[derive(Debug, Clone)]
pub struct SineOsc {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
}

impl SineOsc {
    /// Create at the given frequency in Hz.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
        }
    }

    /// Retune. Phase is preserved, so a swept frequency never clicks.
    #[inline]
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Offset the phase, in [0, 1) cycles.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    /// Generate the next sample in [-1, 1].
    #[inline]
    pub fn next(&mut self) -> f32 {
        let value = sinf(2.0 * PI * self.phase);
        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}
