//! Oracle mode: a hexagram-biased probabilistic drone.
//!
//! Six lines are cast, each the sum of three fair draws from {2, 3}, so
//! a line lands in {6, 7, 8, 9} with P(6)=P(9)=1/8 and P(7)=P(8)=3/8.
//! The hexagram is pure data: it never gates audio directly, it only
//! biases which way the macro ticker nudges the partial field. A new
//! hexagram is cast on a long randomized period.

use bruma_core::{Biquad, SineOsc, SmoothedParam, flush_denormal};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::clock::RandomTicker;
use crate::config::EngineConfig;
use crate::contract::{Contract, Diagnostics, FallbackReason, ModeDetail};
use crate::engines::common::EngineShared;
use crate::mode::{Mode, ModeEngine};
use crate::params::ParamMap;

/// Cast one hexagram line: three draws from {2, 3}.
pub fn cast_line<R: Rng>(rng: &mut R) -> u8 {
    (0..3).map(|_| if rng.gen_bool(0.5) { 3u8 } else { 2 }).sum()
}

/// Cast a full six-line hexagram.
pub fn cast_hexagram<R: Rng>(rng: &mut R) -> [u8; 6] {
    [(); 6].map(|()| cast_line(rng))
}

struct Partial {
    osc: SineOsc,
    gain: SmoothedParam,
    base_hz: f32,
}

/// Probabilistic oracle engine.
pub struct OracleEngine {
    shared: EngineShared,
    partials: Vec<Partial>,
    tone: Biquad,
    cutoff: SmoothedParam,
    lines: [u8; 6],
    recast_ticker: RandomTicker,
    macro_ticker: RandomTicker,
    rng: StdRng,
    sample_rate: f32,
}

impl OracleEngine {
    /// Create the engine with a first hexagram already cast.
    pub fn new(config: &EngineConfig, sample_rate: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let base = 66.0f32;
        let partials = (0..6)
            .map(|i| {
                let hz = base * (i + 1) as f32;
                Partial {
                    osc: SineOsc::new(sample_rate, hz),
                    gain: SmoothedParam::new(0.0, sample_rate, 1500.0),
                    base_hz: hz,
                }
            })
            .collect();
        let recast_ticker = RandomTicker::new(45.0, 120.0, 0.0, &mut rng);
        let macro_ticker = RandomTicker::new(0.1, 0.45, 0.0, &mut rng);
        let lines = cast_hexagram(&mut rng);
        Self {
            shared: EngineShared::new(config, sample_rate, seed as u32 ^ 0x6b1d),
            partials,
            tone: Biquad::lowpass(1200.0, 0.707, sample_rate),
            cutoff: SmoothedParam::new(1200.0, sample_rate, 4000.0),
            lines,
            recast_ticker,
            macro_ticker,
            rng,
            sample_rate,
        }
    }

    /// Nudge one partial, biased by its hexagram line. Yang lines (7, 9)
    /// pull their partial up; yin lines (6, 8) let it sink. Old lines
    /// (6, 9) push harder, matching their rarity.
    fn step_macro(&mut self) {
        let i = self.rng.gen_range(0..self.partials.len());
        let line = self.lines[i];
        let yang = line == 7 || line == 9;
        let old = line == 6 || line == 9;
        let ceiling = if yang { 0.14 } else { 0.05 };
        let weight = if old { 1.0 } else { 0.6 };
        let target = self.rng.gen_range(0.0..ceiling) * weight;
        self.partials[i].gain.set_target(target + 0.02);

        if self.rng.gen_bool(0.2) {
            // brightness follows the count of yang lines
            let yang_count = self.lines.iter().filter(|&&l| l == 7 || l == 9).count();
            let target = 500.0 + 400.0 * yang_count as f32;
            self.cutoff.set_target(target);
        }
    }
}

impl ModeEngine for OracleEngine {
    fn mode(&self) -> Mode {
        Mode::Oracle
    }

    fn start(&mut self, _now: f64) {
        if !self.shared.mark_started() {
            return;
        }
        debug!(mode = %Mode::Oracle, lines = ?self.lines, "engine started");
        for partial in &mut self.partials {
            partial.gain.set_target(0.06);
        }
    }

    fn stop(&mut self) {
        self.shared.mark_stopped();
    }

    fn set_params(&mut self, params: &ParamMap) {
        if let Some(base) = params.get_clamped("base_hz", 30.0, 220.0) {
            for (i, partial) in self.partials.iter_mut().enumerate() {
                partial.base_hz = base * (i + 1) as f32;
                partial.osc.set_frequency(partial.base_hz);
            }
        }
    }

    fn ensure_fallback(&mut self, reason: FallbackReason) {
        self.shared.ensure_fallback(Mode::Oracle, reason);
    }

    fn control_tick(&mut self, now: f64) {
        self.shared.control_tick(now);
        if !self.shared.is_started() {
            return;
        }
        if self.recast_ticker.fire(now, &mut self.rng) {
            self.lines = cast_hexagram(&mut self.rng);
            debug!(lines = ?self.lines, "hexagram recast");
        }
        if self.macro_ticker.fire(now, &mut self.rng) {
            self.step_macro();
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], _now: f64) {
        let cutoff = self.cutoff.get().clamp(200.0, self.sample_rate * 0.45);
        self.tone.set_lowpass(cutoff, 0.707, self.sample_rate);

        let started = self.shared.is_started();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut mix = 0.0f32;
            if started {
                for partial in &mut self.partials {
                    mix += partial.osc.next() * partial.gain.advance();
                }
                self.cutoff.advance();
            }
            let out = flush_denormal(self.tone.process(mix));
            *l += out + self.shared.bed_sample();
            *r += out + self.shared.bed_sample();
        }
        self.shared.observe_block(left, right);
    }

    fn contract(&self) -> Contract {
        self.shared.contract()
    }

    fn diagnostics(&self) -> Diagnostics {
        self.shared.diagnostics(ModeDetail::Oracle { lines: self.lines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::OutputState;

    #[test]
    fn lines_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10_000 {
            let line = cast_line(&mut rng);
            assert!((6..=9).contains(&line), "line {line}");
        }
    }

    #[test]
    fn line_distribution_matches_fair_coins() {
        let mut rng = StdRng::seed_from_u64(1234);
        let n = 80_000;
        let mut counts = [0u32; 4];
        for _ in 0..n {
            counts[(cast_line(&mut rng) - 6) as usize] += 1;
        }
        let p: Vec<f64> = counts.iter().map(|&c| f64::from(c) / f64::from(n)).collect();
        // P(6)=P(9)=1/8, P(7)=P(8)=3/8
        assert!((p[0] - 0.125).abs() < 0.01, "P(6)={}", p[0]);
        assert!((p[1] - 0.375).abs() < 0.01, "P(7)={}", p[1]);
        assert!((p[2] - 0.375).abs() < 0.01, "P(8)={}", p[2]);
        assert!((p[3] - 0.125).abs() < 0.01, "P(9)={}", p[3]);
    }

    #[test]
    fn hexagram_has_six_lines() {
        let mut rng = StdRng::seed_from_u64(5);
        let lines = cast_hexagram(&mut rng);
        assert!(lines.iter().all(|l| (6..=9).contains(l)));
    }

    #[test]
    fn engine_is_audible_and_exposes_lines() {
        let mut engine = OracleEngine::new(&EngineConfig::default(), 48000.0, 31);
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
        match engine.diagnostics().detail {
            ModeDetail::Oracle { lines } => {
                assert!(lines.iter().all(|l| (6..=9).contains(l)));
            }
            other => panic!("wrong detail: {other:?}"),
        }
    }
}
