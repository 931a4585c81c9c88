use std::fmt;

use chrono::Utc;
use motion_detect::Classification;
use tokio_util::sync::CancellationToken;

use crate::launcher::SessionLauncher;
use crate::source::FrameSource;

/// Why a camera worker left its detection loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopRequested,
    StreamEnded,
}

/// What a worker did during its run, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub camera: String,
    pub exit: ExitReason,
    pub sessions_started: u32,
    pub failed_starts: u32,
}

impl fmt::Display for WorkerReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.exit {
            ExitReason::StopRequested => "stop requested",
            ExitReason::StreamEnded => "analysis stream ended",
        };
        write!(
            f,
            "{}: {}, {} recording(s)",
            self.camera, reason, self.sessions_started
        )?;
        if self.failed_starts > 0 {
            write!(f, ", {} failed start(s)", self.failed_starts)?;
        }
        Ok(())
    }
}

enum WorkerState<S> {
    Idle,
    Recording(S),
}

/// Motion-to-recording state machine for one camera.
///
/// Owns the camera's frame source and at most one recording session. The
/// detector's verdicts are followed as-is: a session exists exactly while the
/// latest verdict is `Motion`.
pub struct CameraWorker<F, L: SessionLauncher> {
    camera: String,
    source: F,
    launcher: L,
    state: WorkerState<L::Session>,
    sessions_started: u32,
    failed_starts: u32,
}

impl<F, L> CameraWorker<F, L>
where
    F: FrameSource,
    L: SessionLauncher,
{
    pub fn new(camera: impl Into<String>, source: F, launcher: L) -> Self {
        Self {
            camera: camera.into(),
            source,
            launcher,
            state: WorkerState::Idle,
            sessions_started: 0,
            failed_starts: 0,
        }
    }

    pub fn camera(&self) -> &str {
        &self.camera
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, WorkerState::Recording(_))
    }

    /// Run until `stop` is cancelled or the analysis stream terminates.
    ///
    /// On the way out an active session is stopped before the frame source
    /// is closed.
    pub async fn run(mut self, stop: CancellationToken) -> WorkerReport {
        tracing::info!("Watching {} for motion", self.camera);

        let exit = loop {
            if stop.is_cancelled() {
                break ExitReason::StopRequested;
            }

            // A blocked frame read is abandoned as soon as a stop arrives
            let verdict = tokio::select! {
                biased;
                _ = stop.cancelled() => break ExitReason::StopRequested,
                verdict = self.source.next_classification() => verdict,
            };

            match verdict {
                Classification::Terminated => break ExitReason::StreamEnded,
                verdict => self.handle(verdict).await,
            }
        };

        self.shutdown().await;

        WorkerReport {
            camera: self.camera,
            exit,
            sessions_started: self.sessions_started,
            failed_starts: self.failed_starts,
        }
    }

    async fn handle(&mut self, verdict: Classification) {
        match (verdict, self.is_recording()) {
            (Classification::Motion, false) => self.start_recording().await,
            (Classification::NoMotion, true) => self.stop_recording().await,
            _ => {}
        }
    }

    async fn start_recording(&mut self) {
        let started_at = Utc::now();
        match self.launcher.start(started_at).await {
            Ok(session) => {
                self.state = WorkerState::Recording(session);
                self.sessions_started += 1;
                tracing::info!("Motion on {}, recording started", self.camera);
            }
            Err(e) => {
                // Stay idle; the next Motion verdict retries
                self.failed_starts += 1;
                tracing::warn!("Failed to start recording {}: {}", self.camera, e);
            }
        }
    }

    async fn stop_recording(&mut self) {
        let WorkerState::Recording(session) = std::mem::replace(&mut self.state, WorkerState::Idle)
        else {
            return;
        };
        match self.launcher.stop(session).await {
            Ok(()) => tracing::info!("Motion ended on {}, recording stopped", self.camera),
            Err(e) => tracing::warn!("Failed to stop recording {}: {}", self.camera, e),
        }
    }

    async fn shutdown(&mut self) {
        self.stop_recording().await;
        self.source.close().await;
    }
}
