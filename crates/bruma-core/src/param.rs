//! Parameter smoothing for click-free control changes.
//!
//! Every parameter the control plane touches — filter cutoffs, partial
//! gains, crossfade levels — must never jump stepwise, or the jump is
//! audible as a click or zipper. Two smoothing flavors cover bruma's needs:
//!
//! - [`SmoothedParam`]: exponential (one-pole) approach, used by the macro
//!   sequencers where a natural RC-style settle is wanted.
//! - [`LinearSmoothedParam`]: constant-rate ramp with an exact arrival
//!   time, used for engine crossfades and Khs moment transitions where
//!   the transition length is part of the composition.

use libm::expf;

/// A parameter with exponential (one-pole) smoothing.
///
/// `advance()` is called once per sample in the render path; `set_target`
/// is called from control ticks. The value approaches the target with time
/// constant `smoothing_time_ms` and is effectively settled after ~5 time
/// constants.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    sample_rate: f32,
    smoothing_time_ms: f32,
}

impl SmoothedParam {
    /// Create with full configuration.
    pub fn new(initial: f32, sample_rate: f32, smoothing_time_ms: f32) -> Self {
        let mut param = Self {
            current: initial,
            target: initial,
            coeff: 1.0,
            sample_rate,
            smoothing_time_ms,
        };
        param.recalculate_coeff();
        param
    }

    /// Set the value the parameter smooths toward.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Snap to a value with no smoothing. Used at engine start so the
    /// first rendered block begins from the intended state.
    #[inline]
    pub fn set_immediate(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Change the smoothing time constant.
    pub fn set_smoothing_time_ms(&mut self, time_ms: f32) {
        self.smoothing_time_ms = time_ms;
        self.recalculate_coeff();
    }

    /// Advance one sample and return the smoothed value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    /// Current smoothed value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the parameter has effectively reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() < 1e-6
    }

    /// `coeff = 1 - exp(-1 / (tau * sample_rate))` where tau is the time
    /// constant in seconds. Zero time means instant response.
    fn recalculate_coeff(&mut self) {
        if self.smoothing_time_ms <= 0.0 || self.sample_rate <= 0.0 {
            self.coeff = 1.0;
        } else {
            let samples = self.smoothing_time_ms / 1000.0 * self.sample_rate;
            self.coeff = 1.0 - expf(-1.0 / samples);
        }
    }
}

/// A parameter with linear smoothing and an exact arrival time.
///
/// Unlike the exponential variant, a linear ramp reaches its target in
/// exactly `transition_time_ms`, which makes overlapping crossfade ramps
/// sum to unity when their durations match.
#[derive(Debug, Clone)]
pub struct LinearSmoothedParam {
    current: f32,
    target: f32,
    increment: f32,
    samples_remaining: u32,
    sample_rate: f32,
    transition_time_ms: f32,
}

impl LinearSmoothedParam {
    /// Create with full configuration.
    pub fn new(initial: f32, sample_rate: f32, transition_time_ms: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
            sample_rate,
            transition_time_ms,
        }
    }

    /// Set the target; the ramp restarts from the current value.
    pub fn set_target(&mut self, target: f32) {
        if (target - self.target).abs() < 1e-9 && self.is_settled() {
            return;
        }
        self.target = target;

        let samples = (self.transition_time_ms / 1000.0 * self.sample_rate) as u32;
        if samples == 0 {
            self.current = target;
            self.increment = 0.0;
            self.samples_remaining = 0;
        } else {
            self.increment = (target - self.current) / samples as f32;
            self.samples_remaining = samples;
        }
    }

    /// Snap to a value with no ramp.
    pub fn set_immediate(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }

    /// Change the ramp duration. Affects subsequent `set_target` calls,
    /// not a ramp already in flight.
    pub fn set_transition_time_ms(&mut self, time_ms: f32) {
        self.transition_time_ms = time_ms;
    }

    /// Advance one sample and return the ramped value.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.increment;
            self.samples_remaining -= 1;
            if self.samples_remaining == 0 {
                self.current = self.target; // snap to exact target
            }
        }
        self.current
    }

    /// Current value without advancing.
    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    /// Target value.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Whether the ramp has completed.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_converges() {
        let mut param = SmoothedParam::new(0.0, 48000.0, 10.0);
        param.set_target(1.0);
        for _ in 0..(48000 / 10) {
            param.advance();
        }
        assert!((param.get() - 1.0).abs() < 0.01, "got {}", param.get());
    }

    #[test]
    fn exponential_instant_with_zero_time() {
        let mut param = SmoothedParam::new(1.0, 48000.0, 0.0);
        param.set_target(0.25);
        assert!((param.advance() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn linear_arrives_exactly() {
        let mut param = LinearSmoothedParam::new(0.0, 48000.0, 10.0);
        param.set_target(1.0);
        let samples = (48000.0 * 0.010) as usize;
        for _ in 0..samples {
            param.advance();
        }
        assert_eq!(param.get(), 1.0);
        assert!(param.is_settled());
    }

    #[test]
    fn linear_is_halfway_at_half_time() {
        let mut param = LinearSmoothedParam::new(0.0, 48000.0, 10.0);
        param.set_target(1.0);
        for _ in 0..(48000.0 * 0.005) as usize {
            param.advance();
        }
        assert!((param.get() - 0.5).abs() < 0.01, "got {}", param.get());
    }

    #[test]
    fn opposed_linear_ramps_sum_to_unity() {
        // The crossfade invariant: a 0→1 and a 1→0 ramp of equal duration
        // sum to 1 at every sample.
        let mut up = LinearSmoothedParam::new(0.0, 48000.0, 250.0);
        let mut down = LinearSmoothedParam::new(1.0, 48000.0, 250.0);
        up.set_target(1.0);
        down.set_target(0.0);
        for _ in 0..(48000 / 2) {
            let sum = up.advance() + down.advance();
            assert!((sum - 1.0).abs() < 1e-4, "sum drifted to {sum}");
        }
    }
}
