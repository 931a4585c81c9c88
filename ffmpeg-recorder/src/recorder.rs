use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use chrono::{DateTime, Utc};
use config_manager::{CameraConfig, FfmpegConfig};
use tokio::process::{Child, Command};

use crate::command::{process_command, record_args};
use crate::naming::recording_path;
use crate::process;

/// One motion-triggered recording: an ffmpeg process copying the camera's
/// high-quality stream into a single file.
///
/// The process is stopped with SIGTERM so ffmpeg finalizes the container.
#[derive(Debug)]
pub struct RecordingSession {
    camera: String,
    started_at: DateTime<Utc>,
    output_path: PathBuf,
    ffmpeg_process: Option<Child>,
    stop_timeout: Option<Duration>,
}

impl RecordingSession {
    /// Start recording `camera` into `camera_dir`, named after `started_at`.
    pub async fn start(
        ffmpeg: &FfmpegConfig,
        camera: &CameraConfig,
        camera_dir: &Path,
        started_at: DateTime<Utc>,
    ) -> Result<Self, RecorderError> {
        // Ensure output directory exists
        tokio::fs::create_dir_all(camera_dir).await?;

        let output_path = recording_path(camera_dir, &camera.name, started_at, &ffmpeg.container);
        let args = record_args(ffmpeg, &camera.stream_hq, &output_path);
        let command = process_command(&ffmpeg.binary, &args);

        Self::spawn(&camera.name, started_at, output_path, command, ffmpeg.stop_timeout())
    }

    /// Spawn an already prepared record command.
    pub fn spawn(
        camera: &str,
        started_at: DateTime<Utc>,
        output_path: PathBuf,
        mut command: Command,
        stop_timeout: Option<Duration>,
    ) -> Result<Self, RecorderError> {
        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RecorderError::FfmpegNotFound
            } else {
                RecorderError::Io(e)
            }
        })?;

        Ok(Self {
            camera: camera.to_string(),
            started_at,
            output_path,
            ffmpeg_process: Some(child),
            stop_timeout,
        })
    }

    /// Stop recording and reap the process.
    ///
    /// Returns the exit status, or `None` if the session was already stopped.
    /// On error the process stays with the session, so a later `stop` or the
    /// drop can still signal it.
    pub async fn stop(&mut self) -> Result<Option<ExitStatus>, RecorderError> {
        let Some(child) = self.ffmpeg_process.as_mut() else {
            return Ok(None);
        };

        let status = process::terminate(child, self.stop_timeout).await?;
        self.ffmpeg_process = None;
        tracing::debug!(
            "Recorder for {} exited with {} ({})",
            self.camera,
            status,
            self.output_path.display()
        );
        Ok(Some(status))
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        // Never SIGKILL a recorder, the container would be left unfinalized.
        // tokio reaps the orphaned child in the background.
        if let Some(ref mut child) = self.ffmpeg_process {
            process::request_termination(child);
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("ffmpeg not found - is it installed?")]
    FfmpegNotFound,
    #[error("ffmpeg did not provide a stdout pipe")]
    MissingStdout,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
