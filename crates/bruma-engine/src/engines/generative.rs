//! Generative mode: a 1-D cellular automaton gating oscillator columns.
//!
//! A binary row evolves under a Wolfram rule (30 and 110 are the usual
//! choices) on a toroidal boundary, stepped every 150 ms. Each column
//! owns one oscillator whose gain tracks its cell through a short
//! smoothed ramp, so the row's churn reads as shifting chords rather
//! than clicks.

use bruma_core::{SineOsc, SmoothedParam};
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

/// One-dimensional binary cellular automaton with toroidal wrap.
#[derive(Debug, Clone)]
pub struct Automaton {
    cells: Vec<bool>,
    rule: u8,
    invert: bool,
}

impl Automaton {
    /// Create with a single live cell at `seed_column`.
    pub fn single_cell(columns: usize, rule: u8, seed_column: usize) -> Self {
        let columns = columns.max(3);
        let mut cells = vec![false; columns];
        cells[seed_column % columns] = true;
        Self {
            cells,
            rule,
            invert: false,
        }
    }

    /// Create with a random row (at least one live cell).
    pub fn random<R: Rng>(columns: usize, rule: u8, rng: &mut R) -> Self {
        let columns = columns.max(3);
        let mut cells: Vec<bool> = (0..columns).map(|_| rng.gen_bool(0.35)).collect();
        if cells.iter().all(|&c| !c) {
            cells[columns / 2] = true;
        }
        Self {
            cells,
            rule,
            invert: false,
        }
    }

    /// Invert cell reads without touching the stored row.
    pub fn set_invert(&mut self, invert: bool) {
        self.invert = invert;
    }

    /// Swap the update rule; the row carries over.
    pub fn set_rule(&mut self, rule: u8) {
        self.rule = rule;
    }

    /// The current Wolfram rule number.
    pub fn rule(&self) -> u8 {
        self.rule
    }

    /// Advance one generation.
    pub fn step(&mut self) {
        let n = self.cells.len();
        let prev = self.cells.clone();
        for i in 0..n {
            let left = prev[(i + n - 1) % n];
            let center = prev[i];
            let right = prev[(i + 1) % n];
            let pattern = (u8::from(left) << 2) | (u8::from(center) << 1) | u8::from(right);
            self.cells[i] = (self.rule >> pattern) & 1 == 1;
        }
        // a dead toroidal row stays dead under rules 30/110; reseed
        if self.cells.iter().all(|&c| !c) {
            let mid = n / 2;
            self.cells[mid] = true;
        }
    }

    /// Cell state after the optional inversion.
    pub fn cell(&self, column: usize) -> bool {
        self.cells[column % self.cells.len()] != self.invert
    }

    /// Row width in cells.
    pub fn columns(&self) -> usize {
        self.cells.len()
    }

    /// Live cells after the optional inversion.
    pub fn population(&self) -> usize {
        (0..self.cells.len()).filter(|&i| self.cell(i)).count()
    }
}

struct Column {
    osc: SineOsc,
    gain: SmoothedParam,
    pan: f32,
}

/// Cellular-automaton synthesis engine.
pub struct GenerativeEngine {
    shared: EngineShared,
    automaton: Automaton,
    columns: Vec<Column>,
    step_ticker: Ticker,
    level: f32,
}

impl GenerativeEngine {
    /// Create the engine with a randomly seeded automaton row.
    pub fn new(config: &EngineConfig, sample_rate: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let cfg = &config.generative;
        let mut automaton = Automaton::random(cfg.columns, cfg.rule, &mut rng);
        automaton.set_invert(cfg.invert);
        let n = automaton.columns();
        let columns = (0..n)
            .map(|i| {
                // harmonic series over the base keeps the chord consonant
                let freq = cfg.base_hz * (1.0 + i as f32 * 0.5);
                let pan = (i as f32 / (n - 1).max(1) as f32) * 1.4 - 0.7;
                Column {
                    osc: SineOsc::new(sample_rate, freq),
                    gain: SmoothedParam::new(0.0, sample_rate, 80.0),
                    pan,
                }
            })
            .collect();
        Self {
            shared: EngineShared::new(config, sample_rate, seed as u32 ^ 0x19c3),
            automaton,
            columns,
            step_ticker: Ticker::new(cfg.step_secs, 0.0),
            level: 0.8 / n as f32,
        }
    }

    fn apply_row(&mut self) {
        for (i, column) in self.columns.iter_mut().enumerate() {
            let target = if self.automaton.cell(i) { self.level } else { 0.0 };
            column.gain.set_target(target);
        }
    }
}

impl ModeEngine for GenerativeEngine {
    fn mode(&self) -> Mode {
        Mode::Generative
    }

    fn start(&mut self, _now: f64) {
        if !self.shared.mark_started() {
            return;
        }
        debug!(mode = %Mode::Generative, rule = self.automaton.rule(), "engine started");
        self.apply_row();
    }

    fn stop(&mut self) {
        self.shared.mark_stopped();
    }

    fn set_params(&mut self, params: &ParamMap) {
        if let Some(rule) = params.get_clamped("rule", 0.0, 255.0) {
            let rule = rule as u8;
            if rule == 30 || rule == 110 {
                self.automaton.set_rule(rule);
            }
        }
        if let Some(invert) = params.get_clamped("invert", 0.0, 1.0) {
            self.automaton.set_invert(invert >= 0.5);
        }
    }

    fn ensure_fallback(&mut self, reason: FallbackReason) {
        self.shared.ensure_fallback(Mode::Generative, reason);
    }

    fn control_tick(&mut self, now: f64) {
        self.shared.control_tick(now);
        if self.shared.is_started() && self.step_ticker.fire(now) {
            self.automaton.step();
            self.apply_row();
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], _now: f64) {
        let started = self.shared.is_started();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut out_l = 0.0f32;
            let mut out_r = 0.0f32;
            if started {
                for column in &mut self.columns {
                    let sample = column.osc.next() * column.gain.advance();
                    out_l += sample * (1.0 - column.pan) * 0.5;
                    out_r += sample * (1.0 + column.pan) * 0.5;
                }
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
        self.shared.diagnostics(ModeDetail::Generative {
            rule: self.automaton.rule(),
            population: self.automaton.population() as u8,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::OutputState;

    #[test]
    fn rule_110_canonical_step() {
        // single cell at column 7 of 14; one rule-110 step lights 6 and 7
        let mut ca = Automaton::single_cell(14, 110, 7);
        ca.step();
        let live: Vec<usize> = (0..14).filter(|&i| ca.cell(i)).collect();
        assert_eq!(live, vec![6, 7]);
    }

    #[test]
    fn rule_30_spreads_both_ways() {
        let mut ca = Automaton::single_cell(14, 30, 7);
        ca.step();
        let live: Vec<usize> = (0..14).filter(|&i| ca.cell(i)).collect();
        assert_eq!(live, vec![6, 7, 8]);
    }

    #[test]
    fn toroidal_wrap_crosses_the_edge() {
        let mut ca = Automaton::single_cell(8, 30, 0);
        ca.step();
        // rule 30 lights both neighbors; the left one wraps to the end
        assert!(ca.cell(7));
        assert!(ca.cell(1));
    }

    #[test]
    fn inversion_flips_reads() {
        let mut ca = Automaton::single_cell(8, 110, 3);
        assert!(ca.cell(3));
        ca.set_invert(true);
        assert!(!ca.cell(3));
        assert!(ca.cell(0));
        assert_eq!(ca.population(), 7);
    }

    #[test]
    fn dead_row_reseeds() {
        // rule 0 kills everything; reseed keeps the engine alive
        let mut ca = Automaton::single_cell(8, 0, 4);
        ca.step();
        assert!(ca.population() >= 1);
    }

    #[test]
    fn engine_becomes_audible() {
        let mut engine = GenerativeEngine::new(&EngineConfig::default(), 48000.0, 13);
        engine.start(0.0);
        let mut left = vec![0.0f32; 256];
        let mut right = vec![0.0f32; 256];
        let mut now = 0.0;
        for _ in 0..400 {
            engine.control_tick(now);
            left.fill(0.0);
            right.fill(0.0);
            engine.render(&mut left, &mut right, now);
            now += 256.0 / 48000.0;
        }
        assert_eq!(engine.contract().output_state, OutputState::Active);
        let diag = engine.diagnostics();
        assert!(matches!(
            diag.detail,
            ModeDetail::Generative { rule: 110, .. }
        ));
    }
}
