use async_trait::async_trait;
use config_manager::{CameraConfig, CamerasConfig};
use ffmpeg_recorder::{generate_motion_shader, AnalysisFeed, AnalysisFilter, RecorderError};
use motion_detect::{Classification, Detector};

/// Blocking stream of per-frame verdicts for one camera.
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame's verdict. `Terminated` once the stream is gone.
    async fn next_classification(&mut self) -> Classification;

    /// Release the detector and the underlying stream. Safe to call repeatedly.
    async fn close(&mut self);
}

/// Frame source backed by an ffmpeg analysis feed and a [`Detector`].
pub struct FfmpegFrameSource<D> {
    camera: String,
    feed: Option<AnalysisFeed>,
    detector: Option<D>,
    frame: Vec<u8>,
    frames: u64,
}

impl<D: Detector> FfmpegFrameSource<D> {
    /// Spawn the analysis feed for `camera`.
    ///
    /// Failures are logged and leave the source closed, so the first
    /// classification is `Terminated`.
    pub async fn open(config: &CamerasConfig, camera: &CameraConfig, detector: D) -> Self {
        match Self::start_feed(config, camera).await {
            Ok(feed) => Self::with_feed(&camera.name, feed, detector),
            Err(e) => {
                tracing::error!("Failed to start analysis feed for {}: {}", camera.name, e);
                Self {
                    camera: camera.name.clone(),
                    feed: None,
                    detector: None,
                    frame: Vec::new(),
                    frames: 0,
                }
            }
        }
    }

    async fn start_feed(
        config: &CamerasConfig,
        camera: &CameraConfig,
    ) -> Result<AnalysisFeed, RecorderError> {
        let filter = match &camera.shader {
            Some(shader) => AnalysisFilter::Shader(
                generate_motion_shader(&config.shader_dir(), shader, config.frame).await?,
            ),
            None => AnalysisFilter::Scale,
        };
        AnalysisFeed::start(&config.ffmpeg, camera, config.frame, &filter)
    }

    /// Wrap an already running feed.
    pub fn with_feed(camera: &str, feed: AnalysisFeed, detector: D) -> Self {
        let frame = vec![0u8; feed.frame_len()];
        Self {
            camera: camera.to_string(),
            feed: Some(feed),
            detector: Some(detector),
            frame,
            frames: 0,
        }
    }

    /// Frames classified so far
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[async_trait]
impl<D: Detector> FrameSource for FfmpegFrameSource<D> {
    async fn next_classification(&mut self) -> Classification {
        let (Some(feed), Some(detector)) = (self.feed.as_mut(), self.detector.as_mut()) else {
            return Classification::Terminated;
        };

        match feed.next_frame(&mut self.frame).await {
            Ok(true) => {
                self.frames += 1;
                let verdict = detector.classify(&self.frame);
                tracing::trace!(
                    "{} frame {}: {:?} (score {:?})",
                    self.camera,
                    self.frames,
                    verdict,
                    detector.score()
                );
                verdict
            }
            Ok(false) => {
                tracing::warn!(
                    "Analysis stream for {} ended after {} frames",
                    self.camera,
                    self.frames
                );
                Classification::Terminated
            }
            Err(e) => {
                tracing::warn!("Analysis stream for {} failed: {}", self.camera, e);
                Classification::Terminated
            }
        }
    }

    async fn close(&mut self) {
        self.detector = None;
        if let Some(mut feed) = self.feed.take() {
            if let Err(e) = feed.close().await {
                tracing::warn!("Failed to stop analysis feed for {}: {}", self.camera, e);
            }
        }
    }
}
