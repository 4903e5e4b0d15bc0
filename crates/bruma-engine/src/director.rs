//! The director: one active engine, click-free switches, and the
//! sound-contract watchdog.
//!
//! The director is block-driven. `process_block` advances the virtual
//! clock from the sample counter, runs the control plane, renders the
//! active engine plus any still-fading predecessors into scratch
//! buffers, mixes them under per-sample crossfade gains, lays the master
//! pink-noise floor underneath, and brickwall-limits the sum. Nothing
//! here touches wall-clock time, so a test harness that just calls
//! `process_block` in a loop reproduces every schedule exactly.
//!
//! Switching is deliberately asymmetric: the incoming engine ramps 0→1
//! over its own randomized 0.2-0.6 s window while the outgoing engine
//! ramps 1→0 over a separately randomized window, so no two transitions
//! sound identical. The outgoing engine keeps rendering until its fade
//! settles plus a safety margin; only then is it stopped and dropped.

use bruma_core::{LinearSmoothedParam, Limiter, PinkNoise, db_to_linear};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::analysis::OutputMeter;
use crate::capture::CaptureSource;
use crate::clock::Ticker;
use crate::config::{DirectorConfig, EngineConfig};
use crate::contract::{Contract, Diagnostics, FallbackReason};
use crate::engines::memory::MemoryEngine;
use crate::mode::{Mode, ModeEngine, build_engine};
use crate::params::ParamMap;

/// Builds a capture source per Memory engine instance.
pub type CaptureFactory = Box<dyn Fn() -> Box<dyn CaptureSource> + Send>;

struct ActiveSlot {
    engine: Box<dyn ModeEngine>,
    fade: LinearSmoothedParam,
    started_at: f64,
}

struct RetiringSlot {
    engine: Box<dyn ModeEngine>,
    fade: LinearSmoothedParam,
    dispose_at: f64,
}

/// Immutable view of the director's state.
#[derive(Debug, Clone, Serialize)]
pub struct DirectorSnapshot {
    /// Virtual clock, seconds since session start.
    pub clock_secs: f64,
    /// Master bus level post-limiter, dBFS.
    pub master_level_db: f32,
    /// Currently active mode, if any.
    pub active_mode: Option<Mode>,
    /// The active engine's contract ([`Contract::silent`] when idle).
    pub contract: Contract,
    /// The active engine's full diagnostics.
    pub diagnostics: Option<Diagnostics>,
    /// Engines still fading out.
    pub retiring: usize,
}

/// Top-level orchestrator.
pub struct Director {
    config: DirectorConfig,
    engine_config: EngineConfig,
    sample_rate: f32,
    sample_clock: u64,

    active: Option<ActiveSlot>,
    retiring: Vec<RetiringSlot>,
    scratch_l: Vec<f32>,
    scratch_r: Vec<f32>,

    floor_noise: PinkNoise,
    floor_gain: f32,
    limiter: Limiter,
    master_meter: OutputMeter,

    watchdog: Ticker,
    last_audible: f64,

    capture_factory: Option<CaptureFactory>,
    rng: StdRng,
    seed: u64,
    switches: u64,
}

impl Director {
    /// Create a director with no active engine.
    pub fn new(
        config: DirectorConfig,
        engine_config: EngineConfig,
        sample_rate: f32,
        seed: u64,
    ) -> Self {
        let mut limiter = Limiter::new(sample_rate);
        limiter.set_threshold_db(config.master_threshold_db);
        limiter.set_ceiling_db(config.master_ceiling_db);
        Self {
            floor_gain: db_to_linear(config.noise_floor_db),
            watchdog: Ticker::new(config.watchdog_interval_secs, 0.0),
            config,
            engine_config,
            sample_rate,
            sample_clock: 0,
            active: None,
            retiring: Vec::new(),
            scratch_l: Vec::new(),
            scratch_r: Vec::new(),
            floor_noise: PinkNoise::new(seed as u32 ^ 0xace1),
            limiter,
            master_meter: OutputMeter::new(sample_rate),
            last_audible: 0.0,
            capture_factory: None,
            rng: StdRng::seed_from_u64(seed),
            seed,
            switches: 0,
        }
    }

    /// Attach a factory for live capture sources; each Memory engine
    /// built after this gets a fresh source.
    pub fn set_capture_factory(&mut self, factory: CaptureFactory) {
        self.capture_factory = Some(factory);
    }

    /// Virtual clock in seconds.
    pub fn now(&self) -> f64 {
        self.sample_clock as f64 / f64::from(self.sample_rate)
    }

    /// The sample rate the director renders at.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Mode of the engine currently in front, if any.
    pub fn active_mode(&self) -> Option<Mode> {
        self.active.as_ref().map(|slot| slot.engine.mode())
    }

    /// Switch to `mode`. No-op if it is already active. Fire-and-forget:
    /// the crossfade and the predecessor's disposal happen inside
    /// subsequent `process_block` calls.
    pub fn switch_to(&mut self, mode: Mode) {
        if self.active_mode() == Some(mode) {
            debug!(%mode, "switch ignored, already active");
            return;
        }
        let now = self.now();
        self.switches += 1;
        let engine_seed = self
            .seed
            .wrapping_add(self.switches.wrapping_mul(0x9e37_79b9_7f4a_7c15));

        let mut engine = self.build(mode, engine_seed);
        engine.start(now);

        let fade_in_secs = self.draw_fade();
        let mut fade = LinearSmoothedParam::new(0.0, self.sample_rate, fade_in_secs * 1000.0);
        fade.set_target(1.0);
        info!(%mode, fade_in_secs, "mode switch");

        if let Some(mut old) = self.active.take() {
            let fade_out_secs = self.draw_fade();
            old.fade.set_transition_time_ms(fade_out_secs * 1000.0);
            old.fade.set_target(0.0);
            self.retiring.push(RetiringSlot {
                engine: old.engine,
                fade: old.fade,
                dispose_at: now + f64::from(fade_out_secs) + self.config.retire_margin_secs,
            });
        }

        self.active = Some(ActiveSlot {
            engine,
            fade,
            started_at: now,
        });
        self.last_audible = now;
    }

    /// Route a parameter update to the active engine. Updates addressed
    /// to any other mode are dropped, so a retiring engine can never
    /// receive control messages.
    pub fn set_mode_params(&mut self, mode: Mode, params: &ParamMap) {
        match self.active.as_mut() {
            Some(slot) if slot.engine.mode() == mode => slot.engine.set_params(params),
            _ => debug!(%mode, "params dropped, mode not active"),
        }
    }

    /// Render one stereo block. Buffers are overwritten.
    pub fn process_block(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        let now = self.now();
        left[..frames].fill(0.0);
        right[..frames].fill(0.0);

        self.control_plane(now);

        self.scratch_l.clear();
        self.scratch_l.resize(frames, 0.0);
        self.scratch_r.clear();
        self.scratch_r.resize(frames, 0.0);

        if let Some(slot) = self.active.as_mut() {
            slot.engine
                .render(&mut self.scratch_l, &mut self.scratch_r, now);
            for i in 0..frames {
                let gain = slot.fade.advance();
                left[i] += self.scratch_l[i] * gain;
                right[i] += self.scratch_r[i] * gain;
            }
        }

        for slot in &mut self.retiring {
            self.scratch_l.fill(0.0);
            self.scratch_r.fill(0.0);
            slot.engine
                .render(&mut self.scratch_l, &mut self.scratch_r, now);
            for i in 0..frames {
                let gain = slot.fade.advance();
                left[i] += self.scratch_l[i] * gain;
                right[i] += self.scratch_r[i] * gain;
            }
        }

        // retire engines whose fade window plus margin has passed
        let mut disposed = self.retiring.len();
        self.retiring.retain_mut(|slot| {
            if now >= slot.dispose_at {
                slot.engine.stop();
                false
            } else {
                true
            }
        });
        disposed -= self.retiring.len();
        if disposed > 0 {
            debug!(disposed, "retired engines disposed");
        }

        for i in 0..frames {
            let floor = self.floor_noise.next() * self.floor_gain;
            left[i] += floor;
            right[i] += floor;
        }

        self.limiter.process_block(&mut left[..frames], &mut right[..frames]);

        for i in 0..frames {
            self.master_meter.feed(0.5 * (left[i] + right[i]));
        }

        self.sample_clock += frames as u64;
    }

    /// Current snapshot; plain data, rebuilt on every call.
    pub fn snapshot(&self) -> DirectorSnapshot {
        DirectorSnapshot {
            clock_secs: self.now(),
            master_level_db: self.master_meter.level_db(),
            active_mode: self.active_mode(),
            contract: self
                .active
                .as_ref()
                .map_or_else(Contract::silent, |slot| slot.engine.contract()),
            diagnostics: self.active.as_ref().map(|slot| slot.engine.diagnostics()),
            retiring: self.retiring.len(),
        }
    }

    fn control_plane(&mut self, now: f64) {
        if let Some(slot) = self.active.as_mut() {
            slot.engine.control_tick(now);
        }
        for slot in &mut self.retiring {
            slot.engine.control_tick(now);
        }
        if self.watchdog.fire(now) {
            self.check_contract(now);
        }
    }

    /// The sound contract: an engine that has run past the grace period
    /// and been inaudible throughout it must self-heal.
    fn check_contract(&mut self, now: f64) {
        let level = self.master_meter.level_db();
        if level > self.config.silence_threshold_db {
            self.last_audible = now;
            return;
        }
        let Some(slot) = self.active.as_mut() else {
            return;
        };
        let age = now - slot.started_at;
        let silent_for = now - self.last_audible;
        if age >= self.config.silence_grace_secs
            && silent_for >= self.config.silence_grace_secs
            && !slot.engine.contract().fallback_active
        {
            warn!(
                mode = %slot.engine.mode(),
                level,
                silent_for,
                "sound contract broken, forcing fallback"
            );
            slot.engine.ensure_fallback(FallbackReason::Silence);
        }
    }

    fn draw_fade(&mut self) -> f32 {
        let min = self.config.fade_min_secs;
        let max = self.config.fade_max_secs;
        if max > min {
            self.rng.gen_range(min..max) as f32
        } else {
            min as f32
        }
    }

    fn build(&mut self, mode: Mode, engine_seed: u64) -> Box<dyn ModeEngine> {
        if mode == Mode::Memory {
            if let Some(factory) = self.capture_factory.as_ref() {
                let mut memory =
                    MemoryEngine::new(&self.engine_config, self.sample_rate, engine_seed);
                memory.set_capture_source(factory());
                return Box::new(memory);
            }
        }
        build_engine(mode, &self.engine_config, self.sample_rate, engine_seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Diagnostics, ModeDetail, OutputState};

    const SR: f32 = 48000.0;
    const BLOCK: usize = 256;

    fn director() -> Director {
        Director::new(DirectorConfig::default(), EngineConfig::default(), SR, 7)
    }

    fn run_secs(director: &mut Director, secs: f64) {
        let mut left = [0.0f32; BLOCK];
        let mut right = [0.0f32; BLOCK];
        let blocks = (secs * f64::from(SR) / BLOCK as f64) as usize;
        for _ in 0..blocks {
            director.process_block(&mut left, &mut right);
        }
    }

    /// An engine that renders nothing and never falls back on its own;
    /// only the watchdog can save it.
    struct MuteEngine {
        fallback: Option<FallbackReason>,
    }

    impl ModeEngine for MuteEngine {
        fn mode(&self) -> Mode {
            Mode::Drone
        }
        fn start(&mut self, _now: f64) {}
        fn stop(&mut self) {}
        fn set_params(&mut self, _params: &ParamMap) {}
        fn ensure_fallback(&mut self, reason: FallbackReason) {
            self.fallback.get_or_insert(reason);
        }
        fn control_tick(&mut self, _now: f64) {}
        fn render(&mut self, _left: &mut [f32], _right: &mut [f32], _now: f64) {}
        fn contract(&self) -> Contract {
            Contract {
                output_level_db: -120.0,
                output_state: OutputState::Silent,
                fallback_active: self.fallback.is_some(),
                fallback_reason: self.fallback,
            }
        }
        fn diagnostics(&self) -> Diagnostics {
            Diagnostics {
                contract: self.contract(),
                bands_db: [-120.0; 4],
                detail: ModeDetail::None,
            }
        }
    }

    fn install_mute(director: &mut Director) {
        let now = director.now();
        let mut fade = LinearSmoothedParam::new(0.0, SR, 300.0);
        fade.set_target(1.0);
        director.active = Some(ActiveSlot {
            engine: Box::new(MuteEngine { fallback: None }),
            fade,
            started_at: now,
        });
        director.last_audible = now;
    }

    #[test]
    fn idle_director_renders_the_noise_floor() {
        let mut d = director();
        run_secs(&mut d, 1.0);
        let snap = d.snapshot();
        assert!(snap.active_mode.is_none());
        // floor is present but far below audibility
        assert!(snap.master_level_db > -120.0);
        assert!(snap.master_level_db < -60.0);
    }

    #[test]
    fn switch_is_idempotent() {
        let mut d = director();
        d.switch_to(Mode::Drone);
        run_secs(&mut d, 0.2);
        d.switch_to(Mode::Drone);
        assert_eq!(d.snapshot().retiring, 0);
    }

    #[test]
    fn predecessor_fades_then_disposes() {
        let mut d = director();
        d.switch_to(Mode::Drone);
        run_secs(&mut d, 1.0);
        d.switch_to(Mode::Generative);
        assert_eq!(d.snapshot().retiring, 1);
        // longest fade 0.6 s plus margin; a second is comfortably past it
        run_secs(&mut d, 1.0);
        assert_eq!(d.snapshot().retiring, 0);
        assert_eq!(d.active_mode(), Some(Mode::Generative));
    }

    #[test]
    fn master_stays_under_the_ceiling_through_a_switch() {
        let mut d = director();
        d.switch_to(Mode::Drone);
        run_secs(&mut d, 1.0);
        d.switch_to(Mode::Khs);
        let ceiling = db_to_linear(DirectorConfig::default().master_ceiling_db) + 1e-4;
        let mut left = [0.0f32; BLOCK];
        let mut right = [0.0f32; BLOCK];
        for _ in 0..400 {
            d.process_block(&mut left, &mut right);
            for &x in left.iter().chain(right.iter()) {
                assert!(x.abs() <= ceiling, "sample {x} over ceiling");
            }
        }
    }

    #[test]
    fn equal_fade_windows_sum_to_unity() {
        let config = DirectorConfig {
            fade_min_secs: 0.4,
            fade_max_secs: 0.4,
            ..DirectorConfig::default()
        };
        let mut d = Director::new(config, EngineConfig::default(), SR, 7);
        d.switch_to(Mode::Drone);
        run_secs(&mut d, 1.0);
        d.switch_to(Mode::Generative);

        let mut left = [0.0f32; BLOCK];
        let mut right = [0.0f32; BLOCK];
        while !d.retiring.is_empty() {
            d.process_block(&mut left, &mut right);
            let Some(active) = d.active.as_ref() else {
                break;
            };
            let Some(retiring) = d.retiring.first() else {
                break;
            };
            let sum = active.fade.get() + retiring.fade.get();
            assert!((sum - 1.0).abs() < 1e-3, "gains sum to {sum}");
        }
    }

    #[test]
    fn watchdog_heals_a_mute_engine() {
        let mut d = director();
        install_mute(&mut d);
        run_secs(&mut d, 2.5);
        assert!(!d.snapshot().contract.fallback_active, "too early");
        run_secs(&mut d, 1.0);
        let contract = d.snapshot().contract;
        assert!(contract.fallback_active, "watchdog never fired");
        assert_eq!(contract.fallback_reason, Some(FallbackReason::Silence));
    }

    #[test]
    fn audible_engine_is_left_alone() {
        let mut d = director();
        d.switch_to(Mode::Drone);
        run_secs(&mut d, 4.0);
        let contract = d.snapshot().contract;
        assert!(!contract.fallback_active, "{contract:?}");
        assert_eq!(contract.output_state, OutputState::Active);
    }

    #[test]
    fn params_only_reach_the_active_mode() {
        let mut d = director();
        d.switch_to(Mode::Memory);
        run_secs(&mut d, 0.5);
        // routed: density lands on the active memory engine
        d.set_mode_params(Mode::Memory, &ParamMap::new().with("density", 1.0));
        // dropped: drone is not active, director must not panic or route
        d.set_mode_params(Mode::Drone, &ParamMap::new().with("brightness", 1.0));
        assert_eq!(d.active_mode(), Some(Mode::Memory));
    }

    #[test]
    fn clock_tracks_rendered_samples() {
        let mut d = director();
        run_secs(&mut d, 2.0);
        assert!((d.now() - 2.0).abs() < 0.01, "clock {}", d.now());
    }
}
