use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::camera::CameraConfig;
use crate::error::ConfigError;
use crate::paths;

/// Largest accepted analysis frame side, in pixels
pub const MAX_FRAME_DIMENSION: u32 = 8192;

/// Geometry of the grayscale analysis frames (one byte per pixel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct FrameConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl FrameConfig {
    /// Bytes in one raw gray frame
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// How ffmpeg is invoked for both the analysis and the record feed.
#[derive(Debug, Clone, Deserialize)]
pub struct FfmpegConfig {
    /// ffmpeg binary name or path (default: "ffmpeg")
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Hardware decoder passed to `-hwaccel`, e.g. "drm" on a Raspberry Pi
    #[serde(default)]
    pub hwaccel: Option<String>,
    /// RTSP transport: "udp" or "tcp" (default: "udp")
    #[serde(default = "default_rtsp_transport")]
    pub rtsp_transport: String,
    /// Container extension for recordings (default: "mkv")
    #[serde(default = "default_container")]
    pub container: String,
    /// Kill a recorder still running this many seconds after SIGTERM.
    /// Unset means wait for it indefinitely.
    #[serde(default)]
    pub stop_timeout_secs: Option<u64>,
    /// Where generated shaders are written (default: `<base_dir>/.shaders`)
    #[serde(default)]
    pub shader_dir: Option<PathBuf>,
}

fn default_binary() -> String {
    "ffmpeg".to_string()
}

fn default_rtsp_transport() -> String {
    "udp".to_string()
}

fn default_container() -> String {
    "mkv".to_string()
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            hwaccel: None,
            rtsp_transport: default_rtsp_transport(),
            container: default_container(),
            stop_timeout_secs: None,
            shader_dir: None,
        }
    }
}

impl FfmpegConfig {
    pub fn stop_timeout(&self) -> Option<Duration> {
        self.stop_timeout_secs.map(Duration::from_secs)
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CamerasConfig {
    /// Recordings land in `<base_dir>/<camera name>/`
    pub base_dir: PathBuf,
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
    /// Cameras in the order they are supervised
    #[serde(default)]
    pub cameras: Vec<CameraConfig>,
}

impl CamerasConfig {
    /// Load config from default XDG location
    pub fn load() -> Result<Self, ConfigError> {
        let path = paths::cameras_config_path()?;
        Self::load_from(&path)
    }

    /// Load and validate config from specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cameras.is_empty() {
            return Err(ConfigError::Invalid("no cameras configured".to_string()));
        }
        let side = 1..=MAX_FRAME_DIMENSION;
        if !side.contains(&self.frame.width) || !side.contains(&self.frame.height) {
            return Err(ConfigError::Invalid(format!(
                "frame geometry {}x{} must be within 1-{} per side",
                self.frame.width, self.frame.height, MAX_FRAME_DIMENSION
            )));
        }
        let container = self.ffmpeg.container.trim_start_matches('.');
        if container.is_empty() || container.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "invalid container extension '{}'",
                self.ffmpeg.container
            )));
        }

        let mut seen = HashSet::new();
        for camera in &self.cameras {
            camera.validate()?;
            if !seen.insert(camera.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate camera name '{}'",
                    camera.name
                )));
            }
        }
        Ok(())
    }

    /// Directory holding one camera's recordings
    pub fn camera_dir(&self, camera: &CameraConfig) -> PathBuf {
        self.base_dir.join(&camera.name)
    }

    /// Directory for generated analysis shaders
    pub fn shader_dir(&self) -> PathBuf {
        self.ffmpeg
            .shader_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join(".shaders"))
    }
}
