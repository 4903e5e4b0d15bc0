//! Runtime configuration for the director and the mode engines.
//!
//! Everything the director treats as a tunable lives here with a
//! serde default, so a partial TOML file only overrides what it names.
//!
//! # TOML Format
//!
//! ```toml
//! [director]
//! silence_threshold_db = -60.0
//! fade_min_secs = 0.2
//! fade_max_secs = 0.6
//!
//! [engine.memory]
//! ring_secs = 8.0
//!
//! [engine.khs]
//! moment_min_secs = 60.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read config '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write config '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// A field is outside its usable range
    #[error("invalid config field '{field}': {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Description of why the value is unusable.
        reason: String,
    },
}

/// Director-level tunables: crossfades, watchdog and the master chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectorConfig {
    /// Master level below which the watchdog considers output silent, dBFS.
    pub silence_threshold_db: f32,
    /// Seconds an engine may stay below the threshold before fallback.
    pub silence_grace_secs: f64,
    /// Watchdog polling interval in seconds.
    pub watchdog_interval_secs: f64,
    /// Shortest crossfade window in seconds.
    pub fade_min_secs: f64,
    /// Longest crossfade window in seconds.
    pub fade_max_secs: f64,
    /// Extra seconds a retiring engine is kept after its fade settles.
    pub retire_margin_secs: f64,
    /// Level of the permanent pink-noise floor, dBFS.
    pub noise_floor_db: f32,
    /// Master limiter ceiling, dBFS.
    pub master_ceiling_db: f32,
    /// Master limiter threshold, dBFS.
    pub master_threshold_db: f32,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: -60.0,
            silence_grace_secs: 3.0,
            watchdog_interval_secs: 0.12,
            fade_min_secs: 0.2,
            fade_max_secs: 0.6,
            retire_margin_secs: 0.1,
            noise_floor_db: -72.0,
            master_ceiling_db: -1.0,
            master_threshold_db: -3.0,
        }
    }
}

impl DirectorConfig {
    /// Check field ranges that would otherwise corrupt the fade math.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fade_min_secs > 0.0) {
            return Err(ConfigError::InvalidField {
                field: "fade_min_secs",
                reason: format!("must be positive, got {}", self.fade_min_secs),
            });
        }
        if self.fade_max_secs < self.fade_min_secs {
            return Err(ConfigError::InvalidField {
                field: "fade_max_secs",
                reason: format!(
                    "must be >= fade_min_secs ({}), got {}",
                    self.fade_min_secs, self.fade_max_secs
                ),
            });
        }
        if !(self.watchdog_interval_secs > 0.0) {
            return Err(ConfigError::InvalidField {
                field: "watchdog_interval_secs",
                reason: format!("must be positive, got {}", self.watchdog_interval_secs),
            });
        }
        if self.silence_grace_secs < 0.0 {
            return Err(ConfigError::InvalidField {
                field: "silence_grace_secs",
                reason: format!("must be non-negative, got {}", self.silence_grace_secs),
            });
        }
        Ok(())
    }
}

/// Tunables for the Memory engine's capture ring and grain scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MemoryConfig {
    /// Length of the capture ring in seconds.
    pub ring_secs: f32,
    /// Grain length in seconds.
    pub grain_secs: f32,
    /// Maximum simultaneously sounding grains.
    pub max_grains: usize,
    /// Level of the resonator feedback written back into the ring.
    pub feedback: f32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            ring_secs: 4.0,
            grain_secs: 0.3,
            max_grains: 24,
            feedback: 0.12,
        }
    }
}

/// Tunables for the Generative engine's cellular automaton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerativeConfig {
    /// Wolfram rule number driving the automaton.
    pub rule: u8,
    /// Number of columns (one oscillator voice each).
    pub columns: usize,
    /// Seconds between automaton steps.
    pub step_secs: f64,
    /// Invert the live row before gating the voices.
    pub invert: bool,
    /// Base frequency of the lowest column voice, Hz.
    pub base_hz: f32,
}

impl Default for GenerativeConfig {
    fn default() -> Self {
        Self {
            rule: 110,
            columns: 14,
            step_secs: 0.15,
            invert: false,
            base_hz: 110.0,
        }
    }
}

/// Tunables for the KHS engine's moment scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KhsConfig {
    /// Shortest moment dwell in seconds.
    pub moment_min_secs: f64,
    /// Longest moment dwell in seconds.
    pub moment_max_secs: f64,
    /// Shortest transition between moments in seconds.
    pub transition_min_secs: f64,
    /// Longest transition between moments in seconds.
    pub transition_max_secs: f64,
}

impl Default for KhsConfig {
    fn default() -> Self {
        Self {
            moment_min_secs: 60.0,
            moment_max_secs: 180.0,
            transition_min_secs: 20.0,
            transition_max_secs: 60.0,
        }
    }
}

/// Tunables shared by every mode engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Level of the fallback noise bed, dBFS.
    pub fallback_bed_db: f32,
    /// Seconds between diagnostics snapshots.
    pub diagnostics_interval_secs: f64,
    /// Memory engine tunables.
    pub memory: MemoryConfig,
    /// Generative engine tunables.
    pub generative: GenerativeConfig,
    /// KHS engine tunables.
    pub khs: KhsConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fallback_bed_db: -45.0,
            diagnostics_interval_secs: 0.12,
            memory: MemoryConfig::default(),
            generative: GenerativeConfig::default(),
            khs: KhsConfig::default(),
        }
    }
}

/// Top-level configuration file: director plus engine sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BrumaConfig {
    /// Director-level tunables.
    pub director: DirectorConfig,
    /// Engine-level tunables.
    pub engine: EngineConfig,
}

impl BrumaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents)?;
        config.director.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::WriteFile {
            path: path.to_path_buf(),
            source,
        })
    }
}
