use std::io;
use std::process::Stdio;
use std::time::Duration;

use config_manager::{CameraConfig, FfmpegConfig, FrameConfig};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStdout, Command};

use crate::command::{analysis_args, process_command, AnalysisFilter};
use crate::process;
use crate::recorder::RecorderError;

/// The continuously running low-quality feed: an ffmpeg process writing raw
/// gray frames of a fixed size to its stdout.
#[derive(Debug)]
pub struct AnalysisFeed {
    camera: String,
    ffmpeg_process: Option<Child>,
    stdout: Option<ChildStdout>,
    frame_len: usize,
    stop_timeout: Option<Duration>,
}

impl AnalysisFeed {
    /// Spawn ffmpeg decoding the camera's low-quality stream.
    pub fn start(
        ffmpeg: &FfmpegConfig,
        camera: &CameraConfig,
        frame: FrameConfig,
        filter: &AnalysisFilter,
    ) -> Result<Self, RecorderError> {
        let args = analysis_args(ffmpeg, &camera.stream_lq, frame, filter);
        let command = process_command(&ffmpeg.binary, &args);
        Self::spawn(&camera.name, command, frame.frame_len(), ffmpeg.stop_timeout())
    }

    /// Spawn an already prepared command whose stdout carries the frames.
    pub fn spawn(
        camera: &str,
        mut command: Command,
        frame_len: usize,
        stop_timeout: Option<Duration>,
    ) -> Result<Self, RecorderError> {
        let mut child = command
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    RecorderError::FfmpegNotFound
                } else {
                    RecorderError::Io(e)
                }
            })?;
        let stdout = child.stdout.take().ok_or(RecorderError::MissingStdout)?;

        Ok(Self {
            camera: camera.to_string(),
            ffmpeg_process: Some(child),
            stdout: Some(stdout),
            frame_len,
            stop_timeout,
        })
    }

    /// Bytes per frame
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Fill `buf` with the next frame.
    ///
    /// Returns `Ok(false)` once the stream has ended or the feed was closed.
    pub async fn next_frame(&mut self, buf: &mut [u8]) -> io::Result<bool> {
        debug_assert_eq!(buf.len(), self.frame_len);
        match self.stdout.as_mut() {
            Some(stdout) => read_frame(stdout, buf).await,
            None => Ok(false),
        }
    }

    /// Close the pipe, then terminate and reap ffmpeg. Safe to call repeatedly.
    pub async fn close(&mut self) -> Result<(), RecorderError> {
        self.stdout = None;
        if let Some(mut child) = self.ffmpeg_process.take() {
            let status = process::terminate(&mut child, self.stop_timeout).await?;
            tracing::debug!("Analysis feed for {} exited with {}", self.camera, status);
        }
        Ok(())
    }
}

/// Read exactly one frame.
///
/// Returns `Ok(false)` at end of stream. A trailing partial frame is discarded
/// rather than returned.
pub async fn read_frame<R>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            if filled > 0 {
                tracing::debug!(
                    "Discarding partial frame ({} of {} bytes) at end of stream",
                    filled,
                    buf.len()
                );
            }
            return Ok(false);
        }
        filled += n;
    }
    Ok(true)
}
