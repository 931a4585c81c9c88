//! Motion-triggered recording for multiple RTSP cameras.
//!
//! Every camera gets a [`CameraWorker`] that reads per-frame verdicts from a
//! [`FrameSource`] and starts or stops recordings through a
//! [`SessionLauncher`]. The [`Supervisor`] runs all workers concurrently and
//! waits for each to finalize its recording when asked to stop.

pub mod launcher;
pub mod signals;
pub mod source;
pub mod supervisor;
pub mod worker;

#[cfg(test)]
mod testing;

pub use launcher::{FfmpegLauncher, SessionLauncher};
pub use source::{FfmpegFrameSource, FrameSource};
pub use supervisor::{RunSummary, StopHandle, Supervisor};
pub use worker::{CameraWorker, ExitReason, WorkerReport};

use config_manager::{CameraConfig, CamerasConfig};
use motion_detect::MotionDetector;

/// Worker wired to real ffmpeg processes
pub type FfmpegWorker = CameraWorker<FfmpegFrameSource<MotionDetector>, FfmpegLauncher>;

/// Build the production worker for one configured camera.
///
/// Writes the camera's shader if it has one and spawns its analysis feed.
pub async fn ffmpeg_worker(config: &CamerasConfig, camera: &CameraConfig) -> FfmpegWorker {
    let detector = MotionDetector::new(camera.motion.clone(), config.frame.frame_len());
    CameraWorker::new(
        camera.name.clone(),
        FfmpegFrameSource::open(config, camera, detector).await,
        FfmpegLauncher::new(config, camera),
    )
}
