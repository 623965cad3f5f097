//! On-disk profile for the engine configuration.
//!
//! The profile is the flat TOML rendering of [`EngineConfig`]; nothing else
//! in the engine is persistent. Missing keys fall back to defaults, so old
//! profiles keep loading across upgrades.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::EngineConfig;

const PROFILE_DIR: &str = "mousestick";
const PROFILE_FILE: &str = "profile.toml";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no user configuration directory available")]
    NoConfigDir,

    #[error("profile io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse profile: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize profile: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// `<config_dir>/mousestick/profile.toml`.
pub fn profile_path() -> Result<PathBuf, ProfileError> {
    dirs::config_dir()
        .map(|dir| dir.join(PROFILE_DIR).join(PROFILE_FILE))
        .ok_or(ProfileError::NoConfigDir)
}

/// Writes a default profile if none exists yet.
pub fn ensure_default_profile() -> Result<(), ProfileError> {
    let path = profile_path()?;
    if path.exists() {
        debug!("profile already present at {}", path.display());
        return Ok(());
    }
    save_profile_to(&path, &EngineConfig::default())?;
    info!("wrote default profile to {}", path.display());
    Ok(())
}

pub fn load_profile() -> Result<EngineConfig, ProfileError> {
    load_profile_from(&profile_path()?)
}

pub fn save_profile(config: &EngineConfig) -> Result<(), ProfileError> {
    save_profile_to(&profile_path()?, config)
}

pub fn load_profile_from(path: &Path) -> Result<EngineConfig, ProfileError> {
    let raw = fs::read_to_string(path)?;
    let config = toml::from_str(&raw)?;
    debug!("loaded profile from {}", path.display());
    Ok(config)
}

pub fn save_profile_to(path: &Path, config: &EngineConfig) -> Result<(), ProfileError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let rendered = toml::to_string_pretty(config)?;
    fs::write(path, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_round_trips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");

        let config = EngineConfig {
            sensitivity: 5000.0,
            deadzone: 5,
            recoil_enabled: false,
            ..EngineConfig::default()
        };
        save_profile_to(&path, &config).unwrap();
        let loaded = load_profile_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        fs::write(&path, "sensitivity = 1234.0\n").unwrap();

        let loaded = load_profile_from(&path).unwrap();
        assert_eq!(loaded.sensitivity, 1234.0);
        assert_eq!(loaded.deadzone, EngineConfig::default().deadzone);
        assert!(loaded.recoil_enabled);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(matches!(
            load_profile_from(&path),
            Err(ProfileError::Io(_))
        ));
    }
}
