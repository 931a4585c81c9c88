//! FFmpeg process plumbing for motion-triggered RTSP recording
//!
//! Each camera runs two kinds of ffmpeg processes:
//! - an [`AnalysisFeed`] that decodes the low-quality stream continuously and
//!   writes fixed-size raw gray frames to a pipe
//! - a [`RecordingSession`] per motion event that stream-copies the
//!   high-quality stream into one file
//!
//! # Features
//! - Records original quality video without re-encoding (`-c copy`)
//! - Timestamp-based file naming (e.g., `Porch_2024-12-01_15-30-00.mkv`)
//! - Graceful stop via SIGTERM so the container is finalized, with an
//!   optional kill deadline
//! - Generated libplacebo shader for GPU-side frame differencing
//!
//! # Example
//! ```ignore
//! use ffmpeg_recorder::RecordingSession;
//!
//! let mut session = RecordingSession::start(&config.ffmpeg, &camera, &dir, chrono::Utc::now()).await?;
//! // ... motion ends
//! session.stop().await?;
//! ```

pub mod analysis;
pub mod command;
pub mod naming;
pub mod process;
pub mod recorder;
pub mod shader;

pub use analysis::{read_frame, AnalysisFeed};
pub use command::{analysis_args, process_command, record_args, AnalysisFilter};
pub use naming::{format_timestamp, recording_file_name, recording_path, TIMESTAMP_FORMAT};
pub use recorder::{RecorderError, RecordingSession};
pub use shader::{generate_motion_shader, shader_file_name};

/// Get ffmpeg version string
pub async fn ffmpeg_version(binary: &str) -> Option<String> {
    let output = tokio::process::Command::new(binary)
        .arg("-version")
        .stdin(std::process::Stdio::null())
        .output()
        .await
        .ok()?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout.lines().next().map(|s| s.to_string())
    } else {
        None
    }
}
