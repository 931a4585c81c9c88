//! Static configuration for motion-recorder.
//!
//! Loaded once at startup from a TOML file and treated as immutable for the
//! lifetime of the process.

mod camera;
mod config;
mod error;
mod paths;

pub use camera::{is_valid_camera_name, CameraConfig, MotionConfig, ShaderConfig, MAX_FRAME_HISTORY};
pub use config::{CamerasConfig, FfmpegConfig, FrameConfig, MAX_FRAME_DIMENSION};
pub use error::ConfigError;
pub use paths::{cameras_config_path, config_dir};
