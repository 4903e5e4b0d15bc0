//! The sound contract and per-engine diagnostics model.
//!
//! Every engine continuously reports a [`Contract`]: its output level,
//! whether it is audible, and whether it has degraded into fallback. The
//! director aggregates these into a session-wide snapshot. All types
//! here are plain data — snapshots never expose live graph handles.

use serde::Serialize;

/// Coarse audibility state of an engine's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutputState {
    /// Producing audible output.
    Active,
    /// Below the audibility threshold and not (yet) in fallback.
    Silent,
    /// Running its degraded but guaranteed-audible fallback graph.
    Fallback,
}

/// Why an engine entered fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FallbackReason {
    /// The director's watchdog observed sustained silence.
    Silence,
    /// Capture permission was denied.
    CaptureDenied,
    /// An external stream (ambience bed) failed to deliver.
    StreamFailed,
}

/// Per-engine sound-contract snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Contract {
    /// Most recent measured output level in dBFS (floor −120).
    pub output_level_db: f32,
    /// Coarse audibility state.
    pub output_state: OutputState,
    /// Whether the fallback graph is engaged.
    pub fallback_active: bool,
    /// Why fallback was engaged, if it was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
}

impl Contract {
    /// A contract for an engine that has not produced output yet.
    pub fn silent() -> Self {
        Self {
            output_level_db: -120.0,
            output_state: OutputState::Silent,
            fallback_active: false,
            fallback_reason: None,
        }
    }
}

/// Mode-specific diagnostic detail.
///
/// Closed enum rather than a string map: each engine exposes exactly the
/// internals its tests and observers need, typed.
#[derive(Debug, Clone, Copy, Serialize)]
pub enum ModeDetail {
    /// No mode-specific detail.
    None,
    /// Granular scheduler internals.
    Memory {
        /// Current grain rate target in grains/second, always in [3, 32].
        target_rate: f32,
        /// Whether a ghost window is currently open.
        ghost_active: bool,
        /// Samples captured into the ring buffer (saturates at capacity).
        captured: usize,
    },
    /// Moment scheduler position.
    Khs {
        /// 1-based moment index, always in [1, 12].
        moment_index: u8,
    },
    /// Most recent hexagram cast.
    Oracle {
        /// Six lines, each in {6, 7, 8, 9}.
        lines: [u8; 6],
    },
    /// Cellular automaton state summary.
    Generative {
        /// Active rule (30 or 110).
        rule: u8,
        /// Number of live cells in the current row.
        population: u8,
    },
}

/// Read-only diagnostics snapshot for one engine.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    /// The shared contract fields.
    pub contract: Contract,
    /// Band energies in dB: low / mid / high / air.
    pub bands_db: [f32; 4],
    /// Mode-specific detail.
    pub detail: ModeDetail,
}
