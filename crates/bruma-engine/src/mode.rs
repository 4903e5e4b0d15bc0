//! Mode identifiers and the engine capability set.
//!
//! The six modes form a closed set: a tagged enum plus one trait, with
//! concrete engines selected by [`build_engine`]. This replaces open
//! subclassing on purpose — the director can reason about every mode
//! that will ever exist.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::contract::{Contract, Diagnostics, FallbackReason};
use crate::engines;
use crate::params::ParamMap;

/// The six generative modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Mode {
    /// Detuned oscillator bank under slow filter drift.
    Drone,
    /// Noise excitation through resonant room modes.
    Environ,
    /// Granular playback of a live capture ring.
    Memory,
    /// Cellular-automaton-gated oscillator columns.
    Generative,
    /// Hexagram-biased probabilistic drone.
    Oracle,
    /// Long-form moment-sequenced partial field.
    Khs,
}

impl Mode {
    /// All modes, in presentation order.
    pub const ALL: [Mode; 6] = [
        Mode::Drone,
        Mode::Environ,
        Mode::Memory,
        Mode::Generative,
        Mode::Oracle,
        Mode::Khs,
    ];

    /// Stable lowercase name, used in config keys and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Mode::Drone => "drone",
            Mode::Environ => "environ",
            Mode::Memory => "memory",
            Mode::Generative => "generative",
            Mode::Oracle => "oracle",
            Mode::Khs => "khs",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a mode name does not match any mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown mode: {}", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMode(s.to_string()))
    }
}

/// The capability set every concrete engine implements.
///
/// Engines are driven entirely by the director: `control_tick` runs the
/// engine's own tickers against the virtual clock, `render` fills one
/// block, and the contract/diagnostics accessors return plain data.
pub trait ModeEngine: Send {
    /// Which mode this engine realizes.
    fn mode(&self) -> Mode;

    /// Begin producing. Idempotent; a second call is a no-op. Never
    /// fails at this boundary — internal setup problems (capture denial,
    /// bed stream failure) degrade into fallback instead.
    fn start(&mut self, now: f64);

    /// Stop producing and cancel owned schedules. The audible fade is
    /// the director's job; `stop` runs after the fade has settled.
    fn stop(&mut self);

    /// Apply a sparse parameter update. Values are clamped on read;
    /// unknown keys are ignored.
    fn set_params(&mut self, params: &ParamMap);

    /// Degrade into the guaranteed-audible fallback bed. Idempotent;
    /// the first reason wins.
    fn ensure_fallback(&mut self, reason: FallbackReason);

    /// Run control-plane schedules due at `now` (seconds).
    fn control_tick(&mut self, now: f64);

    /// Render one block into `left`/`right`, starting at `now` seconds.
    /// Buffers arrive zeroed and are equal length.
    fn render(&mut self, left: &mut [f32], right: &mut [f32], now: f64);

    /// Current sound-contract snapshot.
    fn contract(&self) -> Contract;

    /// Current diagnostics snapshot.
    fn diagnostics(&self) -> Diagnostics;
}

/// Build the concrete engine for `mode`.
///
/// `seed` decorrelates the engine's random schedules from the session's
/// other engines; the director derives one per switch.
pub fn build_engine(
    mode: Mode,
    config: &EngineConfig,
    sample_rate: f32,
    seed: u64,
) -> Box<dyn ModeEngine> {
    match mode {
        Mode::Drone => Box::new(engines::drone::DroneEngine::new(config, sample_rate, seed)),
        Mode::Environ => Box::new(engines::environ::EnvironEngine::new(
            config,
            sample_rate,
            seed,
        )),
        Mode::Memory => Box::new(engines::memory::MemoryEngine::new(
            config,
            sample_rate,
            seed,
        )),
        Mode::Generative => Box::new(engines::generative::GenerativeEngine::new(
            config,
            sample_rate,
            seed,
        )),
        Mode::Oracle => Box::new(engines::oracle::OracleEngine::new(
            config,
            sample_rate,
            seed,
        )),
        Mode::Khs => Box::new(engines::khs::KhsEngine::new(config, sample_rate, seed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for mode in Mode::ALL {
            assert_eq!(mode.name().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("KHS".parse::<Mode>().unwrap(), Mode::Khs);
        assert_eq!("Drone".parse::<Mode>().unwrap(), Mode::Drone);
    }

    #[test]
    fn unknown_name_is_rejected() {
        assert!("reverb".parse::<Mode>().is_err());
    }

    #[test]
    fn factory_builds_every_mode() {
        let config = EngineConfig::default();
        for mode in Mode::ALL {
            let engine = build_engine(mode, &config, 48000.0, 3);
            assert_eq!(engine.mode(), mode);
        }
    }
}
