//! Bruma Core - DSP primitives for generative ambient synthesis
//!
//! This crate provides the signal-level building blocks used by the bruma
//! mode engines. Everything here is allocation-free in the per-sample path
//! and suitable for a real-time audio callback.
//!
//! # Core Abstractions
//!
//! ## Parameter Smoothing
//!
//! Zipper-free parameter changes for click-free macro scheduling:
//!
//! - [`SmoothedParam`] - Exponential smoothing (RC-like response)
//! - [`LinearSmoothedParam`] - Linear ramps (crossfades, moment transitions)
//!
//! ## Oscillators & Noise
//!
//! - [`SineOsc`] - Phase-accumulator sine oscillator for drone partials
//! - [`Lfo`] - Low-frequency oscillator for slow parameter drift
//! - [`WhiteNoise`] / [`PinkNoise`] - Noise sources for beds and fallback
//!   writers (deterministic xorshift core, seedable)
//!
//! ## Filters
//!
//! - [`Biquad`] - Second-order IIR with RBJ cookbook coefficient helpers
//! - [`OnePole`] - 6 dB/oct lowpass for meters and tone rolloff
//!
//! ## Buffers & Windows
//!
//! - [`RingBuffer`] - Fixed-capacity circular sample store with a wrapping
//!   write pointer, the backing store for granular capture
//! - [`grain_window`] - Raised-cosine window evaluated per grain sample
//!
//! ## Dynamics
//!
//! - [`Limiter`] - Brickwall lookahead limiter for the master bus
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature:
//!
//! ```toml
//! [dependencies]
//! bruma-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod lfo;
pub mod limiter;
pub mod math;
pub mod noise;
pub mod one_pole;
pub mod osc;
pub mod param;
pub mod ring_buffer;
pub mod window;

pub use biquad::{Biquad, bandpass_coefficients, highpass_coefficients, lowpass_coefficients};
pub use lfo::{Lfo, LfoWaveform};
pub use limiter::Limiter;
pub use math::{db_to_linear, flush_denormal, lerp, linear_to_db};
pub use noise::{PinkNoise, WhiteNoise};
pub use one_pole::OnePole;
pub use osc::SineOsc;
pub use param::{LinearSmoothedParam, SmoothedParam};
pub use ring_buffer::RingBuffer;
pub use window::grain_window;
