//! Audio I/O layer for the bruma generative engine.
//!
//! This crate connects a [`bruma_engine::Director`] to the outside
//! world:
//!
//! - **Live output**: [`OutputSession`] drives the director from a cpal
//!   output callback, optionally wiring microphone capture into the
//!   Memory engine.
//! - **Offline bounce**: [`bounce_to_wav`] renders a session to a WAV
//!   file with no audio hardware at all, block-for-block identical to
//!   the live path.
//! - **Device listing**: [`list_devices`] / [`default_devices`] for the
//!   CLI's `devices` command.

mod bounce;
mod stream;

pub use bounce::{BounceSpec, bounce_to_wav};
pub use stream::{
    AudioDevice, MicCapture, OutputSession, SessionConfig, default_devices, list_devices,
};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("no audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
