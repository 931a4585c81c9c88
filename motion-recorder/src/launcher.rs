use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use config_manager::{CameraConfig, CamerasConfig, FfmpegConfig};
use ffmpeg_recorder::{RecorderError, RecordingSession};

/// Starts and stops recording sessions for one camera.
#[async_trait]
pub trait SessionLauncher: Send {
    type Session: Send;

    /// Start a session named after `started_at`. An error means no session
    /// exists.
    async fn start(&mut self, started_at: DateTime<Utc>) -> Result<Self::Session, RecorderError>;

    /// Gracefully stop a session and wait for its process to exit.
    async fn stop(&mut self, session: Self::Session) -> Result<(), RecorderError>;
}

/// Launches ffmpeg record processes for the camera's high-quality stream.
pub struct FfmpegLauncher {
    ffmpeg: FfmpegConfig,
    camera: CameraConfig,
    camera_dir: PathBuf,
}

impl FfmpegLauncher {
    pub fn new(config: &CamerasConfig, camera: &CameraConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg.clone(),
            camera: camera.clone(),
            camera_dir: config.camera_dir(camera),
        }
    }
}

#[async_trait]
impl SessionLauncher for FfmpegLauncher {
    type Session = RecordingSession;

    async fn start(&mut self, started_at: DateTime<Utc>) -> Result<RecordingSession, RecorderError> {
        let session =
            RecordingSession::start(&self.ffmpeg, &self.camera, &self.camera_dir, started_at).await?;
        tracing::info!(
            "Recording {} to {}",
            self.camera.name,
            session.output_path().display()
        );
        Ok(session)
    }

    async fn stop(&mut self, mut session: RecordingSession) -> Result<(), RecorderError> {
        session.stop().await?;
        tracing::info!(
            "Finished {} ({}s)",
            session.output_path().display(),
            (Utc::now() - session.started_at()).num_seconds()
        );
        Ok(())
    }
}
