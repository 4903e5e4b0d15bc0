//! Bruma Engine - generative mode engines and their director.
//!
//! This crate is the orchestration core of bruma. A [`Director`] owns
//! exactly one active [`ModeEngine`] at a time, crossfades between
//! engines on mode switches, and enforces the *sound contract*: an
//! active mode must become audible within a grace period or it is healed
//! into a guaranteed low-level fallback bed.
//!
//! # Architecture
//!
//! - [`clock`] - virtual control clock: all scheduling runs on f64
//!   seconds derived from the sample counter, so the same logic runs
//!   under cpal, the offline bounce, or a simulated-time test harness.
//! - [`contract`] - the per-engine sound contract and diagnostics model.
//! - [`mode`] - the closed [`Mode`] enum, the [`ModeEngine`] capability
//!   trait, and the factory that builds concrete engines.
//! - [`engines`] - the six concrete engines: Drone, Environ, Memory
//!   (granular), Generative (cellular automaton), Oracle (probabilistic),
//!   and Khs (moment-sequenced).
//! - [`director`] - the top-level orchestrator with the master
//!   limiter/noise-floor chain and the silence watchdog.
//!
//! # Example
//!
//! ```rust
//! use bruma_engine::{Director, DirectorConfig, EngineConfig, Mode};
//!
//! let mut director = Director::new(DirectorConfig::default(), EngineConfig::default(), 48000.0, 1);
//! director.switch_to(Mode::Drone);
//!
//! let mut left = vec![0.0f32; 256];
//! let mut right = vec![0.0f32; 256];
//! director.process_block(&mut left, &mut right);
//! ```

pub mod analysis;
pub mod capture;
pub mod clock;
pub mod config;
pub mod contract;
pub mod director;
pub mod engines;
pub mod mode;
pub mod params;

pub use capture::{CapturePermission, CaptureSource, DeniedCapture};
pub use clock::{RandomTicker, Ticker};
pub use config::{BrumaConfig, ConfigError, DirectorConfig, EngineConfig};
pub use contract::{Contract, Diagnostics, FallbackReason, ModeDetail, OutputState};
pub use director::{CaptureFactory, Director, DirectorSnapshot};
pub use mode::{Mode, ModeEngine, build_engine};
pub use params::ParamMap;
