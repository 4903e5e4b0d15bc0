//! Low-frequency oscillator for slow parameter drift.
//!
//! The ambient engines run their LFOs far below the usual modulation
//! range — hundredths of a hertz — so a whole drift cycle takes minutes.
//! Phase accumulation keeps the output alias-free at any rate.

use core::f32::consts::PI;
use libm::sinf;

/// LFO waveform type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LfoWaveform {
    #[default]
    Sine,
    Triangle,
    Saw,
}

/// Phase-accumulator LFO producing values in [-1, 1].
#[derive(Debug, Clone)]
pub struct Lfo {
    phase: f32,
    phase_inc: f32,
    sample_rate: f32,
    waveform: LfoWaveform,
}

impl Lfo {
    /// Create with the given sample rate and frequency in Hz.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        Self {
            phase: 0.0,
            phase_inc: freq_hz / sample_rate,
            sample_rate,
            waveform: LfoWaveform::Sine,
        }
    }

    /// Set frequency in Hz.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.phase_inc = freq_hz / self.sample_rate;
    }

    /// Set waveform.
    pub fn set_waveform(&mut self, waveform: LfoWaveform) {
        self.waveform = waveform;
    }

    /// Offset the phase, in [0, 1) cycles. Used to decorrelate the drift
    /// of otherwise identical voices.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    /// Generate the next value in [-1, 1].
    #[inline]
    pub fn next(&mut self) -> f32 {
        let value = match self.waveform {
            LfoWaveform::Sine => sinf(2.0 * PI * self.phase),
            LfoWaveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
            LfoWaveform::Saw => 2.0 * self.phase - 1.0,
        };

        self.phase += self.phase_inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_bounded() {
        for wf in [LfoWaveform::Sine, LfoWaveform::Triangle, LfoWaveform::Saw] {
            let mut lfo = Lfo::new(48000.0, 3.7);
            lfo.set_waveform(wf);
            for _ in 0..48000 {
                let v = lfo.next();
                assert!((-1.0..=1.0).contains(&v), "{wf:?} out of range: {v}");
            }
        }
    }

    #[test]
    fn sine_completes_cycle() {
        // 1 Hz at 48 kHz: after 48000 samples the phase is back at the start.
        let mut lfo = Lfo::new(48000.0, 1.0);
        let first = lfo.next();
        for _ in 0..47999 {
            lfo.next();
        }
        let wrapped = lfo.next();
        assert!((first - wrapped).abs() < 1e-3);
    }

    #[test]
    fn phase_offset_shifts_output() {
        let mut a = Lfo::new(48000.0, 0.5);
        let mut b = Lfo::new(48000.0, 0.5);
        b.set_phase(0.25);
        assert!((a.next() - b.next()).abs() > 0.5);
    }
}
