//! Brickwall lookahead limiter for the master bus.
//!
//! The director feeds every mixed block through one of these so that no
//! engine combination — crossfade overlap included — can push the output
//! past the ceiling. Input is delayed by the lookahead window; the
//! un-delayed signal feeds a peak detector, so gain reduction lands
//! before the peak does (instant attack for free). Release is a one-pole
//! exponential back toward unity.
//!
//! Stereo is linked: gain is computed from `max(|L|, |R|)` and applied to
//! both channels, so limiting never shifts the stereo image.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::math::db_to_linear;
use libm::expf;

/// Lookahead window in milliseconds. Fixed; it also sets the latency.
const LOOKAHEAD_MS: f32 = 5.0;

/// Brickwall lookahead limiter with linked stereo detection.
#[derive(Debug, Clone)]
pub struct Limiter {
    sample_rate: f32,
    threshold: f32,
    ceiling: f32,
    release_coeff: f32,
    lookahead: usize,
    delay_l: Vec<f32>,
    delay_r: Vec<f32>,
    delay_pos: usize,
    gain: f32,
}

impl Limiter {
    /// Create with defaults suitable for a master bus: −6 dB threshold,
    /// −0.3 dB ceiling, 100 ms release.
    pub fn new(sample_rate: f32) -> Self {
        let lookahead = ((LOOKAHEAD_MS / 1000.0 * sample_rate) as usize).max(1);
        let mut limiter = Self {
            sample_rate,
            threshold: db_to_linear(-6.0),
            ceiling: db_to_linear(-0.3),
            release_coeff: 0.0,
            lookahead,
            delay_l: vec![0.0; lookahead],
            delay_r: vec![0.0; lookahead],
            delay_pos: 0,
            gain: 1.0,
        };
        limiter.set_release_ms(100.0);
        limiter
    }

    /// Set the threshold in dB (level above which gain reduction begins).
    pub fn set_threshold_db(&mut self, db: f32) {
        self.threshold = db_to_linear(db.clamp(-30.0, 0.0));
    }

    /// Set the hard output ceiling in dB.
    pub fn set_ceiling_db(&mut self, db: f32) {
        self.ceiling = db_to_linear(db.clamp(-30.0, 0.0));
    }

    /// Set the exponential release time in milliseconds.
    pub fn set_release_ms(&mut self, ms: f32) {
        let samples = (ms.clamp(10.0, 500.0) / 1000.0 * self.sample_rate).max(1.0);
        self.release_coeff = expf(-1.0 / samples);
    }

    /// Latency introduced by the lookahead buffer, in samples.
    pub fn latency_samples(&self) -> usize {
        self.lookahead
    }

    /// Process one stereo frame.
    #[inline]
    pub fn process_stereo(&mut self, left: f32, right: f32) -> (f32, f32) {
        let delayed_l = self.delay_l[self.delay_pos];
        let delayed_r = self.delay_r[self.delay_pos];
        self.delay_l[self.delay_pos] = left;
        self.delay_r[self.delay_pos] = right;
        self.delay_pos += 1;
        if self.delay_pos == self.lookahead {
            self.delay_pos = 0;
        }

        // Linked peak over the whole lookahead window.
        let mut peak = 0.0f32;
        for i in 0..self.lookahead {
            let p = self.delay_l[i].abs().max(self.delay_r[i].abs());
            if p > peak {
                peak = p;
            }
        }

        let target = if peak > self.threshold {
            self.threshold / peak
        } else {
            1.0
        };

        // Instant attack (lookahead absorbs the transient), exponential release.
        if target < self.gain {
            self.gain = target;
        } else {
            self.gain = self.release_coeff * self.gain + (1.0 - self.release_coeff) * target;
        }

        let make_up = self.ceiling / self.threshold;
        let out_l = (delayed_l * self.gain * make_up).clamp(-self.ceiling, self.ceiling);
        let out_r = (delayed_r * self.gain * make_up).clamp(-self.ceiling, self.ceiling);
        (out_l, out_r)
    }

    /// Process a stereo block in place.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        for i in 0..left.len().min(right.len()) {
            let (l, r) = self.process_stereo(left[i], right[i]);
            left[i] = l;
            right[i] = r;
        }
    }

    /// Clear delay buffers and gain state.
    pub fn reset(&mut self) {
        self.delay_l.fill(0.0);
        self.delay_r.fill(0.0);
        self.delay_pos = 0;
        self.gain = 1.0;
    }
}
