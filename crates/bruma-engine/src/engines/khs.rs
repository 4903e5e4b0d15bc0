//! Khs mode: a long-form composition sequenced in "moments".
//!
//! Twelve moments cycle endlessly. Each is a macro-timescale parameter
//! regime derived deterministically from its index — spectral bias,
//! density, stereo width, partial count, noise floor — so the cycle has
//! a legible shape, while dwell and transition lengths are drawn fresh
//! every pass so no two traversals are alike. Entering a moment ramps
//! every partial's gain, pitch and pan linearly over the transition; the
//! ramp length is part of the composition, hence linear smoothing with
//! an exact arrival rather than exponential settle.

use bruma_core::{Biquad, LinearSmoothedParam, PinkNoise, SineOsc, flush_denormal};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::clock::Ticker;
use crate::config::EngineConfig;
use crate::contract::{Contract, Diagnostics, FallbackReason, ModeDetail};
use crate::engines::common::EngineShared;
use crate::mode::{Mode, ModeEngine};
use crate::params::ParamMap;

/// Number of moments in the cycle.
pub const MOMENT_COUNT: usize = 12;

/// Number of harmonic partials in the field.
const PARTIAL_COUNT: usize = 16;

/// Fundamental of the partial field, Hz.
const FUNDAMENTAL_HZ: f32 = 55.0;

/// Where a moment concentrates its spectral energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralBias {
    Low,
    Mid,
    High,
}

/// One entry of the moment cycle. Everything here is a pure function of
/// the index; only dwell and transition are drawn at entry time.
#[derive(Debug, Clone, Copy)]
pub struct Moment {
    pub bias: SpectralBias,
    /// Density level in 1..=4.
    pub density: u8,
    /// Stereo width fraction in [0, 1].
    pub width: f32,
    /// How many partials sound, in 1..=PARTIAL_COUNT.
    pub active_partials: usize,
    /// Noise bed level (linear).
    pub noise_floor: f32,
}

/// Build the moment for a cycle index.
pub fn moment_at(index: usize) -> Moment {
    let index = index % MOMENT_COUNT;
    let bias = match index % 3 {
        0 => SpectralBias::Low,
        1 => SpectralBias::Mid,
        _ => SpectralBias::High,
    };
    let density = (index % 4) as u8 + 1;
    Moment {
        bias,
        density,
        width: 0.25 + 0.06 * index as f32,
        active_partials: 2 + usize::from(density) * 3 + index / 4,
        noise_floor: 0.004 + 0.002 * (index % 5) as f32,
    }
}

struct Partial {
    osc: SineOsc,
    gain: LinearSmoothedParam,
    pitch: LinearSmoothedParam,
    pan: LinearSmoothedParam,
}

/// Moment-sequenced engine.
pub struct KhsEngine {
    shared: EngineShared,
    sample_rate: f32,
    partials: Vec<Partial>,
    shaper: Biquad,
    cutoff: LinearSmoothedParam,
    noise: PinkNoise,
    noise_gain: LinearSmoothedParam,
    advance_ticker: Ticker,
    index: usize,
    moment_end: f64,
    moment_min: f64,
    moment_max: f64,
    transition_min: f64,
    transition_max: f64,
    rng: StdRng,
}

impl KhsEngine {
    /// Create the engine at moment zero.
    pub fn new(config: &EngineConfig, sample_rate: f32, seed: u64) -> Self {
        let cfg = &config.khs;
        let partials = (0..PARTIAL_COUNT)
            .map(|i| {
                let hz = FUNDAMENTAL_HZ * (i + 1) as f32;
                Partial {
                    osc: SineOsc::new(sample_rate, hz),
                    gain: LinearSmoothedParam::new(0.0, sample_rate, 1000.0),
                    pitch: LinearSmoothedParam::new(hz, sample_rate, 1000.0),
                    pan: LinearSmoothedParam::new(0.0, sample_rate, 1000.0),
                }
            })
            .collect();
        Self {
            shared: EngineShared::new(config, sample_rate, seed as u32 ^ 0x7be9),
            sample_rate,
            partials,
            shaper: Biquad::lowpass(1600.0, 0.707, sample_rate),
            cutoff: LinearSmoothedParam::new(1600.0, sample_rate, 1000.0),
            noise: PinkNoise::new(seed as u32 ^ 0x1c55),
            noise_gain: LinearSmoothedParam::new(0.0, sample_rate, 1000.0),
            advance_ticker: Ticker::new(1.0, 0.0),
            index: 0,
            moment_end: f64::MAX,
            moment_min: cfg.moment_min_secs,
            moment_max: cfg.moment_max_secs,
            transition_min: cfg.transition_min_secs,
            transition_max: cfg.transition_max_secs,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn draw_range(&mut self, min: f64, max: f64) -> f64 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Enter the moment at `self.index`: draw this pass's dwell and
    /// transition, then ramp the whole field toward the moment's regime.
    fn enter_moment(&mut self, now: f64) {
        let moment = moment_at(self.index);
        let duration = self.draw_range(self.moment_min, self.moment_max);
        let transition = self.draw_range(self.transition_min, self.transition_max);
        self.moment_end = now + duration;
        debug!(
            index = self.index + 1,
            ?moment.bias,
            duration,
            transition,
            "entering moment"
        );

        let transition_ms = (transition * 1000.0) as f32;
        let (band_lo, band_hi) = match moment.bias {
            SpectralBias::Low => (0, 6),
            SpectralBias::Mid => (4, 11),
            SpectralBias::High => (9, PARTIAL_COUNT),
        };
        let active = moment.active_partials.min(PARTIAL_COUNT);
        let level = 0.22 / active.max(1) as f32;

        for (i, partial) in self.partials.iter_mut().enumerate() {
            partial.gain.set_transition_time_ms(transition_ms);
            partial.pitch.set_transition_time_ms(transition_ms);
            partial.pan.set_transition_time_ms(transition_ms);

            let in_band = i >= band_lo && i < band_hi;
            let sounding = in_band && (i - band_lo) < active;
            let gain = if sounding {
                level * self.rng.gen_range(0.5..1.0)
            } else if i < active {
                // out-of-band partials linger faintly at higher densities
                level * 0.15 * f32::from(moment.density) / 4.0
            } else {
                0.0
            };
            partial.gain.set_target(gain);

            let base = FUNDAMENTAL_HZ * (i + 1) as f32;
            let detune = self.rng.gen_range(-0.004..0.004);
            partial.pitch.set_target(base * (1.0 + detune));

            let pan = self.rng.gen_range(-1.0..1.0f32) * moment.width;
            partial.pan.set_target(pan);
        }

        self.cutoff.set_transition_time_ms(transition_ms);
        let cutoff = match moment.bias {
            SpectralBias::Low => 700.0,
            SpectralBias::Mid => 1800.0,
            SpectralBias::High => 5200.0,
        };
        self.cutoff.set_target(cutoff);

        self.noise_gain.set_transition_time_ms(transition_ms);
        self.noise_gain.set_target(moment.noise_floor);
    }
}

impl ModeEngine for KhsEngine {
    fn mode(&self) -> Mode {
        Mode::Khs
    }

    fn start(&mut self, now: f64) {
        if !self.shared.mark_started() {
            return;
        }
        debug!(mode = %Mode::Khs, "engine started");
        self.index = 0;
        self.enter_moment(now);
    }

    fn stop(&mut self) {
        self.shared.mark_stopped();
        self.moment_end = f64::MAX;
    }

    fn set_params(&mut self, params: &ParamMap) {
        // moment dwell bounds are the audible surface of this engine
        if let Some(min) = params.get_clamped("moment_min_secs", 5.0, 600.0) {
            self.moment_min = f64::from(min);
            self.moment_max = self.moment_max.max(self.moment_min);
        }
        if let Some(max) = params.get_clamped("moment_max_secs", 5.0, 900.0) {
            self.moment_max = f64::from(max).max(self.moment_min);
        }
    }

    fn ensure_fallback(&mut self, reason: FallbackReason) {
        self.shared.ensure_fallback(Mode::Khs, reason);
    }

    fn control_tick(&mut self, now: f64) {
        self.shared.control_tick(now);
        if !self.shared.is_started() {
            return;
        }
        // a coarse 1 Hz poll is plenty for minutes-long moments
        if self.advance_ticker.fire(now) && now >= self.moment_end {
            self.index = (self.index + 1) % MOMENT_COUNT;
            self.enter_moment(now);
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], _now: f64) {
        let cutoff = self.cutoff.get().clamp(200.0, self.sample_rate * 0.45);
        self.shaper.set_lowpass(cutoff, 0.707, self.sample_rate);

        let started = self.shared.is_started();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut out_l = 0.0f32;
            let mut out_r = 0.0f32;
            if started {
                for partial in &mut self.partials {
                    partial.osc.set_frequency(partial.pitch.advance());
                    let sample = partial.osc.next() * partial.gain.advance();
                    let pan = partial.pan.advance();
                    out_l += sample * (1.0 - pan) * 0.5;
                    out_r += sample * (1.0 + pan) * 0.5;
                }
                let bed = self.noise.next() * self.noise_gain.advance();
                out_l += bed;
                out_r += bed;
                self.cutoff.advance();
                let mono = 0.5 * (out_l + out_r);
                let shaped = flush_denormal(self.shaper.process(mono));
                // blend shaped center with the panned field
                out_l = 0.5 * out_l + 0.5 * shaped;
                out_r = 0.5 * out_r + 0.5 * shaped;
            }
            *l += out_l + self.shared.bed_sample();
            *r += out_r + self.shared.bed_sample();
        }
        self.shared.observe_block(left, right);
    }

    fn contract(&self) -> Contract {
        self.shared.contract()
    }

    fn diagnostics(&self) -> Diagnostics {
        self.shared.diagnostics(ModeDetail::Khs {
            moment_index: (self.index + 1) as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KhsConfig;
    use crate::contract::OutputState;

    fn fast_config() -> EngineConfig {
        EngineConfig {
            khs: KhsConfig {
                moment_min_secs: 1.0,
                moment_max_secs: 1.0,
                transition_min_secs: 0.2,
                transition_max_secs: 0.2,
            },
            ..EngineConfig::default()
        }
    }

    fn moment_index(engine: &KhsEngine) -> u8 {
        match engine.diagnostics().detail {
            ModeDetail::Khs { moment_index } => moment_index,
            other => panic!("wrong detail: {other:?}"),
        }
    }

    #[test]
    fn moment_table_is_index_derived() {
        for i in 0..MOMENT_COUNT {
            let m = moment_at(i);
            assert!((1..=4).contains(&m.density), "density {}", m.density);
            assert!(m.active_partials >= 1 && m.active_partials <= PARTIAL_COUNT);
            assert!(m.width > 0.0 && m.width <= 1.0);
        }
        assert_eq!(moment_at(0).bias, SpectralBias::Low);
        assert_eq!(moment_at(1).bias, SpectralBias::Mid);
        assert_eq!(moment_at(2).bias, SpectralBias::High);
        assert_eq!(moment_at(12).density, moment_at(0).density);
    }

    #[test]
    fn index_cycles_through_all_twelve() {
        let mut engine = KhsEngine::new(&fast_config(), 48000.0, 8);
        engine.start(0.0);
        let mut seen = [false; MOMENT_COUNT];
        let mut now = 0.0;
        // 30 simulated seconds of 1 s moments covers the cycle and a wrap
        while now < 30.0 {
            engine.control_tick(now);
            let index = moment_index(&engine);
            assert!((1..=12).contains(&index), "index {index}");
            seen[usize::from(index) - 1] = true;
            now += 0.25;
        }
        assert!(seen.iter().all(|&s| s), "unvisited moments: {seen:?}");
    }

    #[test]
    fn index_is_one_based_from_the_start() {
        let mut engine = KhsEngine::new(&EngineConfig::default(), 48000.0, 8);
        assert_eq!(moment_index(&engine), 1);
        engine.start(0.0);
        assert_eq!(moment_index(&engine), 1);
    }

    #[test]
    fn long_moments_do_not_advance_early() {
        let mut engine = KhsEngine::new(&EngineConfig::default(), 48000.0, 8);
        engine.start(0.0);
        let mut now = 0.0;
        while now < 50.0 {
            engine.control_tick(now);
            now += 0.5;
        }
        // default dwell is at least 60 s
        assert_eq!(moment_index(&engine), 1);
    }

    #[test]
    fn field_becomes_audible() {
        let mut engine = KhsEngine::new(&EngineConfig::default(), 48000.0, 8);
        engine.start(0.0);
        let mut left = vec![0.0f32; 256];
        let mut right = vec![0.0f32; 256];
        let mut now = 0.0;
        for _ in 0..500 {
            engine.control_tick(now);
            left.fill(0.0);
            right.fill(0.0);
            engine.render(&mut left, &mut right, now);
            now += 256.0 / 48000.0;
        }
        assert_eq!(engine.contract().output_state, OutputState::Active);
    }
}
