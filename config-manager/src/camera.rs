use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Upper bound for `motion.frame_history`
pub const MAX_FRAME_HISTORY: usize = 1000;

/// One physical camera with its two RTSP feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    /// Camera name, used for the output directory and file names
    pub name: String,
    /// High-quality stream, persisted while motion is active
    pub stream_hq: String,
    /// Low-quality stream, decoded continuously for motion analysis
    pub stream_lq: String,
    #[serde(default)]
    pub motion: MotionConfig,
    /// Optional libplacebo shader applied to the analysis feed
    #[serde(default)]
    pub shader: Option<ShaderConfig>,
}

impl CameraConfig {
    pub fn new(name: &str, stream_hq: &str, stream_lq: &str) -> Self {
        Self {
            name: name.to_string(),
            stream_hq: stream_hq.to_string(),
            stream_lq: stream_lq.to_string(),
            motion: MotionConfig::default(),
            shader: None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_camera_name(&self.name) {
            return Err(ConfigError::Invalid(format!(
                "camera name '{}' must be 1-32 chars of [A-Za-z0-9_-] starting with a letter or digit",
                self.name
            )));
        }
        if self.stream_hq.trim().is_empty() || self.stream_lq.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "camera '{}' needs both stream_hq and stream_lq",
                self.name
            )));
        }
        self.motion
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("camera '{}': {}", self.name, e)))?;
        if let Some(shader) = &self.shader {
            shader
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("camera '{}': {}", self.name, e)))?;
        }
        Ok(())
    }
}

/// Validate a camera name.
/// Names end up in file paths, so they must be 1-32 chars, alphanumeric plus
/// dash/underscore, starting with an alphanumeric.
pub fn is_valid_camera_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 32 {
        return false;
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return false;
    }
    name.chars().next().map(|c| c.is_ascii_alphanumeric()).unwrap_or(false)
}

/// Hysteresis thresholds for the frame-difference detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Number of per-frame deltas averaged together
    pub frame_history: usize,
    /// Averaged delta (0.0-1.0) above which a frame counts as active
    pub active_threshold: f64,
    /// Consecutive active frames needed to start motion
    pub start_frames: u32,
    /// Consecutive quiet frames needed to enter pre-stop
    pub prestop_low_frames: u32,
    /// Active frames during pre-stop that cancel it
    pub cancel_prestop_frames: u32,
    /// Seconds of pre-stop before motion is declared over
    pub full_stop_delay_secs: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            frame_history: 10,
            active_threshold: 0.002,
            start_frames: 15,
            prestop_low_frames: 20,
            cancel_prestop_frames: 15,
            full_stop_delay_secs: 4.0,
        }
    }
}

impl MotionConfig {
    /// Pre-stop length. Values a `Duration` cannot hold saturate.
    pub fn full_stop_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.full_stop_delay_secs).unwrap_or(Duration::MAX)
    }

    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_FRAME_HISTORY).contains(&self.frame_history) {
            return Err(format!(
                "motion.frame_history must be within 1-{}",
                MAX_FRAME_HISTORY
            ));
        }
        if !(self.active_threshold >= 0.0 && self.active_threshold.is_finite()) {
            return Err("motion.active_threshold must be a non-negative number".to_string());
        }
        if Duration::try_from_secs_f64(self.full_stop_delay_secs).is_err() {
            return Err(format!(
                "motion.full_stop_delay_secs {} is not a usable duration",
                self.full_stop_delay_secs
            ));
        }
        Ok(())
    }
}

/// Parameters of the generated blur + frame-difference shader.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShaderConfig {
    pub sigma: f32,
    pub radius: u32,
    pub motion_threshold: f32,
}

impl ShaderConfig {
    fn validate(&self) -> Result<(), String> {
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err("shader.sigma must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.motion_threshold) {
            return Err("shader.motion_threshold must be within 0.0-1.0".to_string());
        }
        Ok(())
    }
}
