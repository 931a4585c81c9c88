use std::path::PathBuf;

use crate::error::ConfigError;

/// Get XDG config directory for motion-recorder
/// Returns ~/.config/motion-recorder or $XDG_CONFIG_HOME/motion-recorder
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|p| p.join("motion-recorder"))
        .ok_or(ConfigError::NoConfigDir)
}

/// Get default camera config file path
/// Returns ~/.config/motion-recorder/cameras.toml
pub fn cameras_config_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("cameras.toml"))
}
