//! Environ mode: noise excitation through resonant room modes.
//!
//! A white source drives a bank of narrow bandpass filters tuned to
//! room-mode-like frequencies; the macro ticker shifts emphasis between
//! modes. An optional external ambience bed can be attached; if its
//! stream stops delivering, the bed gain ramps to zero and the engine
//! carries on — bed failure never propagates.

use bruma_core::{Biquad, SmoothedParam, WhiteNoise, flush_denormal};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::capture::CaptureSource;
use crate::clock::RandomTicker;
use crate::config::EngineConfig;
use crate::contract::{Contract, Diagnostics, FallbackReason, ModeDetail};
use crate::engines::common::EngineShared;
use crate::mode::{Mode, ModeEngine};
use crate::params::ParamMap;

/// Room-mode center frequencies, Hz. Loosely the axial modes of a
/// mid-sized room, spread enough to avoid beating.
const MODE_HZ: [f32; 6] = [48.0, 91.0, 140.0, 233.0, 377.0, 610.0];

/// Blocks of empty reads before the external bed is written off.
const BED_FAILURE_BLOCKS: u32 = 20;

/// Makeup gain after the narrow bandpass bank; the 0 dB-peak filters
/// pass only a sliver of the excitation energy.
const BANK_GAIN: f32 = 4.0;

struct RoomMode {
    filter: Biquad,
    gain: SmoothedParam,
    pan: f32,
}

/// Room-resonance engine.
pub struct EnvironEngine {
    shared: EngineShared,
    excitation: WhiteNoise,
    modes: Vec<RoomMode>,
    bed_source: Option<Box<dyn CaptureSource>>,
    bed_gain: SmoothedParam,
    bed_scratch: Vec<f32>,
    bed_empty_blocks: u32,
    bed_failed: bool,
    macro_ticker: RandomTicker,
    rng: StdRng,
    excitation_level: f32,
}

impl EnvironEngine {
    /// Create the engine with its resonant mode bank.
    pub fn new(config: &EngineConfig, sample_rate: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let modes = MODE_HZ
            .iter()
            .enumerate()
            .map(|(i, &hz)| RoomMode {
                filter: Biquad::bandpass(hz, 14.0, sample_rate),
                gain: SmoothedParam::new(0.0, sample_rate, 1200.0),
                pan: [-0.5, 0.3, -0.2, 0.6, -0.7, 0.1][i],
            })
            .collect();
        let macro_ticker = RandomTicker::new(0.1, 0.45, 0.0, &mut rng);
        Self {
            shared: EngineShared::new(config, sample_rate, seed as u32 ^ 0x2e41),
            excitation: WhiteNoise::new(seed as u32 ^ 0x77aa),
            modes,
            bed_source: None,
            bed_gain: SmoothedParam::new(0.0, sample_rate, 1500.0),
            bed_scratch: Vec::new(),
            bed_empty_blocks: 0,
            bed_failed: false,
            macro_ticker,
            rng,
            excitation_level: 0.6,
        }
    }

    /// Attach an external ambience bed. Its failures stay internal.
    pub fn set_bed_source(&mut self, source: Box<dyn CaptureSource>) {
        self.bed_source = Some(source);
    }

    fn step_macro(&mut self) {
        let moves = if self.rng.gen_bool(0.25) { 2 } else { 1 };
        for _ in 0..moves {
            let i = self.rng.gen_range(0..self.modes.len());
            // one mode surges while the draw keeps the rest sparse
            let target = if self.rng.gen_bool(0.4) {
                self.rng.gen_range(0.5..1.0)
            } else {
                self.rng.gen_range(0.0..0.25)
            };
            self.modes[i].gain.set_target(target);
        }
    }

    fn pull_bed(&mut self, frames: usize) {
        self.bed_scratch.clear();
        self.bed_scratch.resize(frames, 0.0);
        let Some(source) = self.bed_source.as_mut() else {
            return;
        };
        if self.bed_failed {
            return;
        }
        let delivered = source.read(&mut self.bed_scratch);
        if delivered == 0 {
            self.bed_empty_blocks += 1;
            if self.bed_empty_blocks >= BED_FAILURE_BLOCKS {
                debug!("ambience bed stopped delivering, ramping out");
                self.bed_failed = true;
                self.bed_gain.set_target(0.0);
            }
        } else {
            self.bed_empty_blocks = 0;
        }
    }
}

impl ModeEngine for EnvironEngine {
    fn mode(&self) -> Mode {
        Mode::Environ
    }

    fn start(&mut self, _now: f64) {
        if !self.shared.mark_started() {
            return;
        }
        debug!(mode = %Mode::Environ, "engine started");
        for (i, mode) in self.modes.iter_mut().enumerate() {
            mode.gain.set_target(if i < 3 { 0.7 } else { 0.2 });
        }
        if let Some(source) = self.bed_source.as_mut() {
            match source.request() {
                crate::capture::CapturePermission::Granted => {
                    self.bed_gain.set_target(0.3);
                }
                crate::capture::CapturePermission::Denied => {
                    self.bed_failed = true;
                }
            }
        }
    }

    fn stop(&mut self) {
        self.shared.mark_stopped();
    }

    fn set_params(&mut self, params: &ParamMap) {
        if let Some(level) = params.get_clamped("excitation", 0.0, 1.0) {
            self.excitation_level = level;
        }
        if let Some(level) = params.get_clamped("bed_level", 0.0, 1.0) {
            if !self.bed_failed {
                self.bed_gain.set_target(level);
            }
        }
    }

    fn ensure_fallback(&mut self, reason: FallbackReason) {
        self.shared.ensure_fallback(Mode::Environ, reason);
    }

    fn control_tick(&mut self, now: f64) {
        self.shared.control_tick(now);
        if self.shared.is_started() && self.macro_ticker.fire(now, &mut self.rng) {
            self.step_macro();
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], _now: f64) {
        let started = self.shared.is_started();
        if started {
            self.pull_bed(left.len());
        }
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let mut out_l = 0.0f32;
            let mut out_r = 0.0f32;
            if started {
                let noise = self.excitation.next() * self.excitation_level;
                for mode in &mut self.modes {
                    let resonated =
                        flush_denormal(mode.filter.process(noise)) * mode.gain.advance() * BANK_GAIN;
                    out_l += resonated * (1.0 - mode.pan) * 0.5;
                    out_r += resonated * (1.0 + mode.pan) * 0.5;
                }
                let bed = self.bed_scratch.get(i).copied().unwrap_or(0.0)
                    * self.bed_gain.advance();
                out_l += bed;
                out_r += bed;
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
        self.shared.diagnostics(ModeDetail::None)
    }
}
