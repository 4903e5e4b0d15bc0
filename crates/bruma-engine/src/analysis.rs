//! Output metering and band-energy diagnostics.
//!
//! Two small meters feed the contract and diagnostics surfaces:
//!
//! - [`OutputMeter`]: smoothed RMS of the time-domain signal, converted
//!   to dBFS with a −120 dB floor for numerical silence. The director's
//!   watchdog reads one of these on the master bus.
//! - [`BandMeter`]: a four-band bandpass filter bank (low / mid / high /
//!   air) accumulating energy between diagnostics ticks — the "spectral
//!   bucketing" every engine reports, without an FFT in sight.

use bruma_core::{Biquad, OnePole, linear_to_db};

/// dBFS floor reported for numerical silence.
pub const SILENCE_FLOOR_DB: f32 = -120.0;

/// Smoothed RMS level meter.
#[derive(Debug, Clone)]
pub struct OutputMeter {
    smoother: OnePole,
}

impl OutputMeter {
    /// Create with ~10 Hz ballistics: fast enough for a 120 ms watchdog
    /// cadence, slow enough to ignore single-sample transients.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            smoother: OnePole::new(sample_rate, 10.0),
        }
    }

    /// Feed one sample.
    #[inline]
    pub fn feed(&mut self, sample: f32) {
        self.smoother.process(sample * sample);
    }

    /// Current level in dBFS, floored at [`SILENCE_FLOOR_DB`].
    pub fn level_db(&self) -> f32 {
        let mean_square = self.smoother.value().max(0.0);
        linear_to_db(mean_square.sqrt()).max(SILENCE_FLOOR_DB)
    }

    /// Reset to silence.
    pub fn reset(&mut self) {
        self.smoother.reset();
    }
}

/// The four diagnostic bands, as (name, center Hz, Q).
const BANDS: [(&str, f32, f32); 4] = [
    ("low", 120.0, 0.8),
    ("mid", 700.0, 0.8),
    ("high", 3000.0, 0.8),
    ("air", 9000.0, 0.8),
];

/// Four-band energy bucketing meter.
///
/// Energy accumulates between [`BandMeter::read_and_reset`] calls, which
/// the diagnostics ticker invokes every ~120 ms.
#[derive(Debug, Clone)]
pub struct BandMeter {
    filters: [Biquad; 4],
    energy: [f32; 4],
    samples: u32,
}

impl BandMeter {
    /// Create for the given sample rate.
    pub fn new(sample_rate: f32) -> Self {
        let filters = BANDS.map(|(_, freq, q)| Biquad::bandpass(freq, q, sample_rate));
        Self {
            filters,
            energy: [0.0; 4],
            samples: 0,
        }
    }

    /// Feed one sample through all four bands.
    #[inline]
    pub fn feed(&mut self, sample: f32) {
        for (filter, energy) in self.filters.iter_mut().zip(self.energy.iter_mut()) {
            let banded = filter.process(sample);
            *energy += banded * banded;
        }
        self.samples += 1;
    }

    /// Mean band levels in dB since the last read, then reset the
    /// accumulators (filter state is kept — the bands run continuously).
    pub fn read_and_reset(&mut self) -> [f32; 4] {
        let n = self.samples.max(1) as f32;
        let levels = self
            .energy
            .map(|e| linear_to_db((e / n).sqrt()).max(SILENCE_FLOOR_DB));
        self.energy = [0.0; 4];
        self.samples = 0;
        levels
    }
}
