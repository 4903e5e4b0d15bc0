//! Drone mode: detuned oscillator pairs under slow filter drift.

use bruma_core::{Biquad, Lfo, SineOsc, SmoothedParam, flush_denormal};
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

/// Base frequencies of the four voice pairs, Hz. A low stack of close
/// intervals; detune does the rest.
const VOICE_HZ: [f32; 4] = [55.0, 82.5, 110.0, 164.8];

/// Per-voice gain ceiling keeping the summed bank well under full scale.
const VOICE_LEVEL: f32 = 0.11;

struct Voice {
    a: SineOsc,
    b: SineOsc,
    gain: SmoothedParam,
    detune_hz: SmoothedParam,
    base_hz: f32,
    pan: f32,
}

/// Ambient drone engine.
pub struct DroneEngine {
    shared: EngineShared,
    voices: Vec<Voice>,
    lowpass_l: Biquad,
    lowpass_r: Biquad,
    cutoff: SmoothedParam,
    drift: Lfo,
    macro_ticker: RandomTicker,
    rng: StdRng,
    sample_rate: f32,
    brightness: f32,
}

impl DroneEngine {
    /// Create the engine with detuned voices drawn from `seed`.
    pub fn new(config: &EngineConfig, sample_rate: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let voices = VOICE_HZ
            .iter()
            .enumerate()
            .map(|(i, &hz)| Voice {
                a: SineOsc::new(sample_rate, hz),
                b: SineOsc::new(sample_rate, hz + 0.7),
                gain: SmoothedParam::new(0.0, sample_rate, 900.0),
                detune_hz: SmoothedParam::new(0.7, sample_rate, 2000.0),
                base_hz: hz,
                pan: [-0.6, 0.4, -0.2, 0.7][i],
            })
            .collect();
        let cutoff_hz = 900.0;
        let macro_ticker = RandomTicker::new(0.1, 0.45, 0.0, &mut rng);
        Self {
            shared: EngineShared::new(config, sample_rate, seed as u32 ^ 0x5f3a),
            voices,
            lowpass_l: Biquad::lowpass(cutoff_hz, 0.707, sample_rate),
            lowpass_r: Biquad::lowpass(cutoff_hz, 0.707, sample_rate),
            cutoff: SmoothedParam::new(cutoff_hz, sample_rate, 3000.0),
            drift: Lfo::new(sample_rate, 0.05),
            macro_ticker,
            rng,
            sample_rate,
            brightness: 0.5,
        }
    }

    fn step_macro(&mut self) {
        // one or two smoothed parameter moves per tick
        let moves = if self.rng.gen_bool(0.3) { 2 } else { 1 };
        for _ in 0..moves {
            match self.rng.gen_range(0..3u8) {
                0 => {
                    let i = self.rng.gen_range(0..self.voices.len());
                    let target = self.rng.gen_range(0.2..1.0) * VOICE_LEVEL;
                    self.voices[i].gain.set_target(target);
                }
                1 => {
                    let i = self.rng.gen_range(0..self.voices.len());
                    let detune = self.rng.gen_range(0.2..2.4);
                    self.voices[i].detune_hz.set_target(detune);
                }
                _ => {
                    let span = 400.0 + self.brightness * 2200.0;
                    let target = self.rng.gen_range(0.5..1.0) * span + 250.0;
                    self.cutoff.set_target(target);
                }
            }
        }
    }
}

impl ModeEngine for DroneEngine {
    fn mode(&self) -> Mode {
        Mode::Drone
    }

    fn start(&mut self, _now: f64) {
        if !self.shared.mark_started() {
            return;
        }
        debug!(mode = %Mode::Drone, "engine started");
        for voice in &mut self.voices {
            voice.gain.set_target(VOICE_LEVEL * 0.7);
        }
    }

    fn stop(&mut self) {
        self.shared.mark_stopped();
    }

    fn set_params(&mut self, params: &ParamMap) {
        if let Some(brightness) = params.get_clamped("brightness", 0.0, 1.0) {
            self.brightness = brightness;
        }
        if let Some(rate) = params.get_clamped("drift_rate", 0.01, 0.5) {
            self.drift.set_frequency(rate);
        }
    }

    fn ensure_fallback(&mut self, reason: FallbackReason) {
        self.shared.ensure_fallback(Mode::Drone, reason);
    }

    fn control_tick(&mut self, now: f64) {
        self.shared.control_tick(now);
        if self.shared.is_started() && self.macro_ticker.fire(now, &mut self.rng) {
            self.step_macro();
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], _now: f64) {
        // filter retune once per block from the smoothed cutoff
        let cutoff = self.cutoff.get().clamp(60.0, self.sample_rate * 0.45);
        self.lowpass_l.set_lowpass(cutoff, 0.707, self.sample_rate);
        self.lowpass_r.set_lowpass(cutoff, 0.707, self.sample_rate);

        let started = self.shared.is_started();
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let mut dry_l = 0.0f32;
            let mut dry_r = 0.0f32;
            if started {
                let shimmer = 1.0 + 0.08 * self.drift.next();
                for voice in &mut self.voices {
                    let detune = voice.detune_hz.advance();
                    voice.b.set_frequency(voice.base_hz + detune);
                    let sample = (voice.a.next() + voice.b.next()) * voice.gain.advance();
                    let pan = voice.pan;
                    dry_l += sample * (1.0 - pan).sqrt() * 0.5 * shimmer;
                    dry_r += sample * (1.0 + pan).sqrt() * 0.5 * shimmer;
                }
                self.cutoff.advance();
            }
            let out_l = flush_denormal(self.lowpass_l.process(dry_l)) + self.shared.bed_sample();
            let out_r = flush_denormal(self.lowpass_r.process(dry_r)) + self.shared.bed_sample();
            *l += out_l;
            *r += out_r;
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
