//! Memory mode: granular playback of a live capture ring.
//!
//! A ring buffer holds the last few seconds of input. When capture is
//! granted the microphone writes it; on denial a pink-noise writer fills
//! it at the same rate, so the buffer is never stale and the engine
//! degrades without a seam. Grains read at a fixed distance behind the
//! write head — the head advances under them, so a constant age plays
//! the captured material forward.
//!
//! Three schedules shape the texture:
//! - the grain scheduler (25 ms tick, 80 ms lookahead) emits grain
//!   onsets at a rate blended from input loudness and user density,
//!   clamped to [3, 32] grains/s;
//! - ghost windows (rare, minutes apart, 1.5-3.5 s long) spike the rate
//!   and the recency bias so recent material audibly "surfaces";
//! - a macro sequencer steps a tone filter through a fixed
//!   cutoff/resonance table every 60-300 s, while a four-voice resonator
//!   bank rotates fundamentals every 4 s and feeds back into the ring.

use std::collections::VecDeque;

use bruma_core::{
    Biquad, PinkNoise, RingBuffer, SmoothedParam, flush_denormal, grain_window,
};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::debug;

use crate::analysis::OutputMeter;
use crate::capture::{CapturePermission, CaptureSource, DeniedCapture};
use crate::clock::{RandomTicker, Ticker};
use crate::config::EngineConfig;
use crate::contract::{Contract, Diagnostics, FallbackReason, ModeDetail};
use crate::engines::common::EngineShared;
use crate::mode::{Mode, ModeEngine};
use crate::params::ParamMap;

/// Grain scheduler tick interval, seconds.
const SCHED_TICK_SECS: f64 = 0.025;

/// Scheduling lookahead, seconds. Every onset inside the window is
/// committed before the window closes.
const SCHED_LOOKAHEAD_SECS: f64 = 0.08;

/// Grain rate bounds, grains per second.
const RATE_MIN: f32 = 3.0;
const RATE_MAX: f32 = 32.0;

/// Fixed macro table of (cutoff Hz, resonance Q) pairs.
const TONE_TABLE: [(f32, f32); 8] = [
    (800.0, 0.9),
    (1500.0, 1.4),
    (400.0, 0.7),
    (2500.0, 2.0),
    (1100.0, 1.0),
    (600.0, 1.2),
    (3200.0, 0.8),
    (1800.0, 1.6),
];

/// Fundamental rotation for the resonator bank, Hz.
const RESONATOR_HZ: [f32; 4] = [55.0, 73.42, 98.0, 65.41];

struct Grain {
    /// Read distance behind the write head, in samples. Constant for the
    /// grain's life: the head moves, so playback runs forward.
    age: usize,
    pos: usize,
    len: usize,
    gain: f32,
    pan: f32,
}

struct PendingGrain {
    start: f64,
    grain: Grain,
}

struct Resonator {
    filter: Biquad,
    freq: SmoothedParam,
}

/// Granular memory engine.
pub struct MemoryEngine {
    shared: EngineShared,
    sample_rate: f32,

    ring: RingBuffer,
    capture: Box<dyn CaptureSource>,
    capture_granted: bool,
    capture_scratch: Vec<f32>,
    noise_writer: PinkNoise,
    noise_gain: SmoothedParam,
    input_meter: OutputMeter,

    sched_ticker: Ticker,
    next_grain_time: f64,
    target_rate: f32,
    user_density: f32,
    grain_secs: f32,
    max_grains: usize,
    pending: VecDeque<PendingGrain>,
    active: Vec<Grain>,

    ghost_until: f64,
    next_ghost: f64,
    clock: f64,

    tone_l: Biquad,
    tone_r: Biquad,
    cutoff: SmoothedParam,
    resonance: SmoothedParam,
    tone_index: usize,
    tone_ticker: RandomTicker,

    resonators: Vec<Resonator>,
    resonator_ticker: Ticker,
    resonator_step: usize,
    feedback_gain: SmoothedParam,
    last_resonant: f32,

    rng: StdRng,
}

impl MemoryEngine {
    /// Create the engine with capture denied until a source is attached.
    pub fn new(config: &EngineConfig, sample_rate: f32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let cfg = &config.memory;
        let capacity = (sample_rate * cfg.ring_secs).max(1.0) as usize;
        let resonators = RESONATOR_HZ
            .iter()
            .map(|&hz| Resonator {
                filter: Biquad::bandpass(hz, 30.0, sample_rate),
                freq: SmoothedParam::new(hz, sample_rate, 2500.0),
            })
            .collect();
        let (cutoff0, q0) = TONE_TABLE[0];
        // first ghost arrives 5-10 minutes in
        let next_ghost = rng.gen_range(300.0..600.0);
        Self {
            shared: EngineShared::new(config, sample_rate, seed as u32 ^ 0x4d73),
            sample_rate,
            ring: RingBuffer::new(capacity),
            capture: Box::new(DeniedCapture),
            capture_granted: false,
            capture_scratch: Vec::new(),
            noise_writer: PinkNoise::new(seed as u32 ^ 0x31f7),
            noise_gain: SmoothedParam::new(0.25, sample_rate, 1200.0),
            input_meter: OutputMeter::new(sample_rate),
            sched_ticker: Ticker::due_now(SCHED_TICK_SECS, 0.0),
            next_grain_time: 0.0,
            target_rate: RATE_MIN,
            user_density: 0.5,
            grain_secs: cfg.grain_secs,
            max_grains: cfg.max_grains,
            pending: VecDeque::new(),
            active: Vec::new(),
            ghost_until: -1.0,
            next_ghost,
            clock: 0.0,
            tone_l: Biquad::lowpass(cutoff0, q0, sample_rate),
            tone_r: Biquad::lowpass(cutoff0, q0, sample_rate),
            cutoff: SmoothedParam::new(cutoff0, sample_rate, 8000.0),
            resonance: SmoothedParam::new(q0, sample_rate, 8000.0),
            tone_index: 0,
            tone_ticker: RandomTicker::new(60.0, 300.0, 0.0, &mut rng),
            resonators,
            resonator_ticker: Ticker::new(4.0, 0.0),
            resonator_step: 0,
            feedback_gain: SmoothedParam::new(cfg.feedback, sample_rate, 2000.0),
            last_resonant: 0.0,
            rng,
        }
    }

    /// Attach the live capture source before `start()`.
    pub fn set_capture_source(&mut self, source: Box<dyn CaptureSource>) {
        self.capture = source;
    }

    fn ghost_active(&self, now: f64) -> bool {
        now < self.ghost_until
    }

    /// Blend the grain rate from input loudness and user density, with a
    /// flat bonus while a ghost window is open.
    fn update_rate(&mut self, now: f64) {
        let loud_db = self.input_meter.level_db().clamp(-60.0, 0.0);
        let loudness_rate = RATE_MIN + (loud_db + 60.0) / 60.0 * (RATE_MAX - RATE_MIN);
        let density_rate = RATE_MIN + self.user_density * (RATE_MAX - RATE_MIN);
        let ghost_bonus = if self.ghost_active(now) { 8.0 } else { 0.0 };
        self.target_rate =
            (0.6 * loudness_rate + 0.4 * density_rate + ghost_bonus).clamp(RATE_MIN, RATE_MAX);
    }

    /// Pick a read age for a new grain, in samples. Recent history
    /// (0.1-1.2 s ago) is favored; ghost windows make it dominate.
    fn draw_age(&mut self, now: f64) -> usize {
        let recency_weight = if self.ghost_active(now) { 0.85 } else { 0.35 };
        let captured = self.ring.captured().max(1);
        let recent_min = (self.sample_rate * 0.1) as usize;
        let recent_max = ((self.sample_rate * 1.2) as usize).min(captured.saturating_sub(1));
        if self.rng.gen_bool(recency_weight) && recent_max > recent_min {
            self.rng.gen_range(recent_min..recent_max)
        } else {
            self.rng.gen_range(0..captured)
        }
    }

    /// Commit every onset that falls inside the lookahead window.
    fn schedule_grains(&mut self, now: f64) {
        self.update_rate(now);
        if self.next_grain_time < now {
            // clock ran past the schedule (first tick, or a long stall)
            self.next_grain_time = now;
        }
        let horizon = now + SCHED_LOOKAHEAD_SECS;
        while self.next_grain_time < horizon {
            let len = (self.grain_secs * self.sample_rate) as usize;
            let len = (len as f32 * self.rng.gen_range(0.7..1.3)) as usize;
            let grain = Grain {
                age: self.draw_age(now),
                pos: 0,
                len: len.max(64),
                gain: self.rng.gen_range(0.35..0.7),
                pan: self.rng.gen_range(-0.8..0.8),
            };
            self.pending.push_back(PendingGrain {
                start: self.next_grain_time,
                grain,
            });
            let period = f64::from(1.0 / self.target_rate);
            self.next_grain_time += period * self.rng.gen_range(0.7..1.3);
        }
    }

    fn advance_ghosts(&mut self, now: f64) {
        if now >= self.next_ghost {
            let length = self.rng.gen_range(1.5..3.5);
            self.ghost_until = now + length;
            // later ghosts spread 5-15 minutes apart
            self.next_ghost = now + self.rng.gen_range(300.0..900.0);
            debug!(length, "ghost window opened");
        }
    }

    fn step_tone(&mut self) {
        self.tone_index = (self.tone_index + 1) % TONE_TABLE.len();
        let (cutoff, q) = TONE_TABLE[self.tone_index];
        self.cutoff.set_target(cutoff);
        self.resonance.set_target(q);
        debug!(cutoff, q, "tone table step");
    }

    fn rotate_resonators(&mut self) {
        self.resonator_step = (self.resonator_step + 1) % RESONATOR_HZ.len();
        for (i, resonator) in self.resonators.iter_mut().enumerate() {
            let fundamental = RESONATOR_HZ[(self.resonator_step + i) % RESONATOR_HZ.len()];
            resonator.freq.set_target(fundamental * (i + 1) as f32);
        }
    }

    /// Next sample to write into the ring: capture when granted, the
    /// substitute noise writer otherwise. Either way the input meter
    /// sees it, so loudness-driven rate works in both regimes.
    fn writer_sample(&mut self, frame: usize) -> f32 {
        let sample = if self.capture_granted {
            self.capture_scratch.get(frame).copied().unwrap_or(0.0)
        } else {
            self.noise_writer.next() * self.noise_gain.advance()
        };
        self.input_meter.feed(sample);
        sample
    }
}

impl ModeEngine for MemoryEngine {
    fn mode(&self) -> Mode {
        Mode::Memory
    }

    fn start(&mut self, now: f64) {
        if !self.shared.mark_started() {
            return;
        }
        match self.capture.request() {
            CapturePermission::Granted => {
                self.capture_granted = true;
                debug!(mode = %Mode::Memory, "engine started with live capture");
            }
            CapturePermission::Denied => {
                self.capture_granted = false;
                debug!(mode = %Mode::Memory, "capture denied, noise writer engaged");
                self.ensure_fallback(FallbackReason::CaptureDenied);
            }
        }
        self.next_grain_time = now;
        self.next_ghost += now;
    }

    fn stop(&mut self) {
        self.shared.mark_stopped();
        self.pending.clear();
        self.active.clear();
        self.ring.clear();
    }

    fn set_params(&mut self, params: &ParamMap) {
        if let Some(density) = params.get_clamped("density", 0.0, 1.0) {
            self.user_density = density;
        }
        if let Some(dur) = params.get_clamped("grain_dur", 0.05, 1.0) {
            self.grain_secs = dur;
        }
        if let Some(feedback) = params.get_clamped("feedback", 0.0, 0.9) {
            if !self.shared.fallback_active() {
                self.feedback_gain.set_target(feedback);
            }
        }
    }

    fn ensure_fallback(&mut self, reason: FallbackReason) {
        if self.shared.ensure_fallback(Mode::Memory, reason) {
            // lean on the internal writer and the resonant feedback path
            self.noise_gain.set_target(0.5);
            self.feedback_gain.set_target(0.3);
        }
    }

    fn control_tick(&mut self, now: f64) {
        self.shared.control_tick(now);
        if !self.shared.is_started() {
            return;
        }
        self.clock = now;
        self.advance_ghosts(now);
        if self.sched_ticker.fire(now) {
            self.schedule_grains(now);
        }
        if self.tone_ticker.fire(now, &mut self.rng) {
            self.step_tone();
        }
        if self.resonator_ticker.fire(now) {
            self.rotate_resonators();
        }
    }

    fn render(&mut self, left: &mut [f32], right: &mut [f32], now: f64) {
        let started = self.shared.is_started();
        if started && self.capture_granted {
            self.capture_scratch.clear();
            self.capture_scratch.resize(left.len(), 0.0);
            let delivered = self.capture.read(&mut self.capture_scratch);
            if delivered < self.capture_scratch.len() {
                self.capture_scratch[delivered..].fill(0.0);
            }
        }

        // per-block filter retunes from the smoothed macro parameters
        let cutoff = self.cutoff.get().clamp(100.0, self.sample_rate * 0.45);
        let q = self.resonance.get().clamp(0.4, 6.0);
        self.tone_l.set_lowpass(cutoff, q, self.sample_rate);
        self.tone_r.set_lowpass(cutoff, q, self.sample_rate);
        for resonator in &mut self.resonators {
            let freq = resonator.freq.get().clamp(30.0, self.sample_rate * 0.4);
            resonator.filter.set_bandpass(freq, 30.0, self.sample_rate);
        }

        let dt = f64::from(1.0 / self.sample_rate);
        for (frame, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            if started {
                let t = now + frame as f64 * dt;

                let feedback = self.last_resonant * self.feedback_gain.advance();
                let written = self.writer_sample(frame) + feedback;
                self.ring.push(flush_denormal(written));

                while self.pending.front().is_some_and(|p| p.start <= t) {
                    if let Some(pending) = self.pending.pop_front() {
                        if self.active.len() < self.max_grains {
                            self.active.push(pending.grain);
                        }
                    }
                }

                let mut grain_l = 0.0f32;
                let mut grain_r = 0.0f32;
                for grain in &mut self.active {
                    let sample = self.ring.read_ago(grain.age)
                        * grain_window(grain.pos, grain.len)
                        * grain.gain;
                    grain_l += sample * (1.0 - grain.pan) * 0.5;
                    grain_r += sample * (1.0 + grain.pan) * 0.5;
                    grain.pos += 1;
                }
                self.active.retain(|g| g.pos < g.len);

                let mono = 0.5 * (grain_l + grain_r);
                let mut resonant = 0.0f32;
                for resonator in &mut self.resonators {
                    resonant += flush_denormal(resonator.filter.process(mono));
                }
                resonant *= 0.5;
                self.last_resonant = resonant;
                for resonator in &mut self.resonators {
                    resonator.freq.advance();
                }
                self.cutoff.advance();
                self.resonance.advance();

                let out_l = flush_denormal(self.tone_l.process(grain_l + resonant));
                let out_r = flush_denormal(self.tone_r.process(grain_r + resonant));
                *l += out_l;
                *r += out_r;
            }
            *l += self.shared.bed_sample();
            *r += self.shared.bed_sample();
        }
        self.shared.observe_block(left, right);
    }

    fn contract(&self) -> Contract {
        self.shared.contract()
    }

    fn diagnostics(&self) -> Diagnostics {
        self.shared.diagnostics(ModeDetail::Memory {
            target_rate: self.target_rate,
            ghost_active: self.clock < self.ghost_until,
            captured: self.ring.captured(),
        })
    }
}
