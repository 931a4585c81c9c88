use std::path::{Path, PathBuf};
use std::process::Stdio;

use config_manager::{FfmpegConfig, FrameConfig};
use tokio::process::Command;

/// Video filter applied to the low-quality feed before raw frames are emitted.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisFilter {
    /// libplacebo with a custom blur + frame-difference shader
    Shader(PathBuf),
    /// Plain downscale, raw luma frames are diffed instead
    Scale,
}

impl AnalysisFilter {
    fn to_filter_arg(&self, frame: FrameConfig) -> String {
        match self {
            AnalysisFilter::Shader(path) => format!(
                "libplacebo=w={}:h={}:custom_shader_path={}",
                frame.width,
                frame.height,
                path.display()
            ),
            AnalysisFilter::Scale => format!("scale={}:{}", frame.width, frame.height),
        }
    }
}

/// Input options shared by both feeds. `max_delay` and `timeout` are in
/// microseconds, as ffmpeg expects them.
fn input_args(ffmpeg: &FfmpegConfig, url: &str, max_delay: u32, timeout: u32) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "quiet".into()];
    if let Some(hwaccel) = &ffmpeg.hwaccel {
        args.extend(["-hwaccel".into(), hwaccel.clone()]);
    }
    args.extend([
        "-rtsp_transport".into(),
        ffmpeg.rtsp_transport.clone(),
        "-reorder_queue_size".into(),
        "4000".into(),
        "-max_delay".into(),
        max_delay.to_string(),
        "-timeout".into(),
        timeout.to_string(),
        "-avoid_negative_ts".into(),
        "make_zero".into(),
        "-seek2any".into(),
        "1".into(),
        "-fflags".into(),
        "+genpts".into(),
        "-i".into(),
        url.to_string(),
    ]);
    args
}

/// Arguments for the record feed: stream copy of the high-quality URL into
/// `output`. `-n` makes ffmpeg refuse to reuse an existing file.
pub fn record_args(ffmpeg: &FfmpegConfig, url: &str, output: &Path) -> Vec<String> {
    let mut args = input_args(ffmpeg, url, 5_000_000, 5_000_000);
    args.extend([
        "-c".into(),
        "copy".into(),
        "-n".into(),
        output.display().to_string(),
    ]);
    args
}

/// Arguments for the analysis feed: raw gray frames of `frame` geometry on stdout.
pub fn analysis_args(
    ffmpeg: &FfmpegConfig,
    url: &str,
    frame: FrameConfig,
    filter: &AnalysisFilter,
) -> Vec<String> {
    let mut args = input_args(ffmpeg, url, 3_000_000, 2_000_000);
    args.extend([
        "-vf".into(),
        filter.to_filter_arg(frame),
        "-an".into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "gray".into(),
        "-".into(),
    ]);
    args
}

/// Build a command with all stdio detached.
///
/// On Unix the child gets its own process group so a terminal Ctrl+C only
/// reaches us; children are stopped explicitly afterwards.
pub fn process_command<I, S>(program: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    command.process_group(0);
    command
}
