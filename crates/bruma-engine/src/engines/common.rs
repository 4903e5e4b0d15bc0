//! Shared engine core: metering, diagnostics cadence, and the fallback bed.
//!
//! Every concrete engine embeds an [`EngineShared`] and routes its
//! lifecycle through it, so contract reporting and fallback behave
//! identically across modes. The fallback bed is a pink-noise floor at
//! `fallback_bed_db` that fades in when [`EngineShared::ensure_fallback`]
//! first engages; it guarantees the sound contract even when an engine's
//! own graph has gone quiet.

use bruma_core::{LinearSmoothedParam, PinkNoise, db_to_linear};
use tracing::warn;

use crate::analysis::{BandMeter, OutputMeter};
use crate::clock::Ticker;
use crate::config::EngineConfig;
use crate::contract::{Contract, Diagnostics, FallbackReason, ModeDetail, OutputState};

/// Level above which an engine's own output counts as audible, dBFS.
const AUDIBLE_DB: f32 = -60.0;

/// Seconds the fallback bed takes to fade in.
const BED_FADE_MS: f32 = 800.0;

/// Diagnostics, metering and fallback state common to all engines.
pub struct EngineShared {
    meter: OutputMeter,
    bands: BandMeter,
    diag_ticker: Ticker,
    bands_db: [f32; 4],
    bed_noise: PinkNoise,
    bed_gain: LinearSmoothedParam,
    bed_level: f32,
    fallback_reason: Option<FallbackReason>,
    started: bool,
}

impl EngineShared {
    /// Create the shared state with the bed faded fully out.
    pub fn new(config: &EngineConfig, sample_rate: f32, seed: u32) -> Self {
        Self {
            meter: OutputMeter::new(sample_rate),
            bands: BandMeter::new(sample_rate),
            diag_ticker: Ticker::new(config.diagnostics_interval_secs, 0.0),
            bands_db: [crate::analysis::SILENCE_FLOOR_DB; 4],
            bed_noise: PinkNoise::new(seed),
            bed_gain: LinearSmoothedParam::new(0.0, sample_rate, BED_FADE_MS),
            bed_level: db_to_linear(config.fallback_bed_db),
            fallback_reason: None,
            started: false,
        }
    }

    /// Record the start transition. Returns false if already started, so
    /// engines can make `start()` idempotent with one check.
    pub fn mark_started(&mut self) -> bool {
        if self.started {
            return false;
        }
        self.started = true;
        true
    }

    /// Whether `start()` has been recorded.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Record the stop transition.
    pub fn mark_stopped(&mut self) {
        self.started = false;
    }

    /// Engage fallback. Idempotent; the first reason is kept.
    pub fn ensure_fallback(&mut self, mode: crate::mode::Mode, reason: FallbackReason) -> bool {
        if self.fallback_reason.is_some() {
            return false;
        }
        warn!(mode = %mode, ?reason, "engine entering fallback");
        self.fallback_reason = Some(reason);
        self.bed_gain.set_target(self.bed_level);
        true
    }

    /// Whether fallback has engaged.
    pub fn fallback_active(&self) -> bool {
        self.fallback_reason.is_some()
    }

    /// Run the diagnostics cadence.
    pub fn control_tick(&mut self, now: f64) {
        if self.diag_ticker.fire(now) {
            self.bands_db = self.bands.read_and_reset();
        }
    }

    /// Next fallback-bed sample (zero-gain until fallback engages).
    #[inline]
    pub fn bed_sample(&mut self) -> f32 {
        let gain = self.bed_gain.advance();
        if gain <= 0.0 {
            // keep the generator running so engagement starts mid-stream
            let _ = self.bed_noise.next();
            return 0.0;
        }
        self.bed_noise.next() * gain
    }

    /// Feed the meters from a rendered block.
    pub fn observe_block(&mut self, left: &[f32], right: &[f32]) {
        for (l, r) in left.iter().zip(right.iter()) {
            let mono = 0.5 * (l + r);
            self.meter.feed(mono);
            self.bands.feed(mono);
        }
    }

    /// Snapshot the sound contract from the output meter.
    pub fn contract(&self) -> Contract {
        let level = self.meter.level_db();
        let output_state = if self.fallback_reason.is_some() {
            OutputState::Fallback
        } else if level > AUDIBLE_DB {
            OutputState::Active
        } else {
            OutputState::Silent
        };
        Contract {
            output_level_db: level,
            output_state,
            fallback_active: self.fallback_reason.is_some(),
            fallback_reason: self.fallback_reason,
        }
    }

    /// Snapshot diagnostics around a mode-specific detail block.
    pub fn diagnostics(&self, detail: ModeDetail) -> Diagnostics {
        Diagnostics {
            contract: self.contract(),
            bands_db: self.bands_db,
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::Mode;

    fn shared() -> EngineShared {
        EngineShared::new(&EngineConfig::default(), 48000.0, 11)
    }

    #[test]
    fn start_is_idempotent() {
        let mut s = shared();
        assert!(s.mark_started());
        assert!(!s.mark_started());
    }

    #[test]
    fn fallback_keeps_first_reason() {
        let mut s = shared();
        assert!(s.ensure_fallback(Mode::Memory, FallbackReason::CaptureDenied));
        assert!(!s.ensure_fallback(Mode::Memory, FallbackReason::Silence));
        assert_eq!(
            s.contract().fallback_reason,
            Some(FallbackReason::CaptureDenied)
        );
        assert_eq!(s.contract().output_state, OutputState::Fallback);
    }

    #[test]
    fn bed_is_silent_until_fallback() {
        let mut s = shared();
        for _ in 0..1000 {
            assert_eq!(s.bed_sample(), 0.0);
        }
        s.ensure_fallback(Mode::Drone, FallbackReason::Silence);
        // after the fade the bed must be audibly non-zero
        let mut energy = 0.0f32;
        for _ in 0..96000 {
            let x = s.bed_sample();
            energy += x * x;
        }
        assert!(energy > 0.0);
    }

    #[test]
    fn bed_reaches_contract_level() {
        let config = EngineConfig::default();
        let mut s = EngineShared::new(&config, 48000.0, 5);
        s.ensure_fallback(Mode::Drone, FallbackReason::Silence);
        // run past the fade, metering the bed itself
        let mut last = 0.0;
        for _ in 0..48000 * 3 {
            last = s.bed_sample();
            s.meter.feed(last);
        }
        let db = s.contract().output_level_db;
        // pink noise at -45 dB gain should land well above the -60 dB
        // audibility threshold
        assert!(db > AUDIBLE_DB, "bed level {db} dB");
    }
}
