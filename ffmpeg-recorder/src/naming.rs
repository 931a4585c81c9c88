use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Sortable, filesystem-safe timestamp used in recording names
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Format a UTC instant at second granularity, e.g. `2024-12-01_15-30-00`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// File name of one recording session: `{camera}_{timestamp}.{ext}`
pub fn recording_file_name(camera: &str, at: DateTime<Utc>, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        camera,
        format_timestamp(at),
        extension.trim_start_matches('.')
    )
}

/// Full output path inside the camera's directory
pub fn recording_path(camera_dir: &Path, camera: &str, at: DateTime<Utc>, extension: &str) -> PathBuf {
    camera_dir.join(recording_file_name(camera, at, extension))
}
