//! Shared helpers for CLI commands.

use anyhow::Context;
use bruma_engine::BrumaConfig;
use std::path::PathBuf;

/// Load configuration from the given path, or defaults if none.
pub fn load_config(path: Option<&PathBuf>) -> anyhow::Result<BrumaConfig> {
    match path {
        Some(path) => BrumaConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(BrumaConfig::default()),
    }
}

/// Seed for the session's random schedules: explicit for reproducible
/// runs, time-derived otherwise.
pub fn session_seed(explicit: Option<u64>) -> u64 {
    explicit.unwrap_or_else(|| {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, BrumaConfig::default());
    }

    #[test]
    fn bad_config_path_is_an_error() {
        let path = PathBuf::from("/no/such/file.toml");
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn explicit_seed_wins() {
        assert_eq!(session_seed(Some(42)), 42);
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bruma.toml");
        std::fs::write(&path, "[director]\nnoise_floor_db = -66.0\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.director.noise_floor_db, -66.0);
    }
}
