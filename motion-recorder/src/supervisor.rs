use std::fmt;

use tokio_util::sync::CancellationToken;

use crate::launcher::SessionLauncher;
use crate::source::FrameSource;
use crate::worker::{CameraWorker, ExitReason};

/// Cloneable handle that asks every worker of a [`Supervisor`] to stop.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Request a stop. Repeated calls have no further effect.
    pub fn request_stop(&self) {
        if !self.token.is_cancelled() {
            tracing::info!("Stop requested, finalizing recordings");
        }
        self.token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Aggregate outcome of a supervised run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub workers: usize,
    /// Workers that exited because a stop was requested
    pub stopped: usize,
    /// Workers whose analysis stream ended on its own
    pub stream_ended: usize,
    /// Workers that panicked
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} camera(s): {} stopped, {} stream ended, {} failed",
            self.workers, self.stopped, self.stream_ended, self.failed
        )
    }
}

/// Runs one [`CameraWorker`] per camera as independent tasks and waits for
/// all of them.
#[derive(Debug, Default)]
pub struct Supervisor {
    stop: StopHandle,
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn request_stop(&self) {
        self.stop.request_stop();
    }

    /// Spawn every worker and return once each has finished its exit path.
    ///
    /// A worker that panics is reported and does not affect the others.
    pub async fn run<F, L, I>(&self, workers: I) -> RunSummary
    where
        I: IntoIterator<Item = CameraWorker<F, L>>,
        F: FrameSource + 'static,
        L: SessionLauncher + 'static,
    {
        let handles: Vec<_> = workers
            .into_iter()
            .map(|worker| {
                let camera = worker.camera().to_string();
                let token = self.stop.token.child_token();
                (camera, tokio::spawn(worker.run(token)))
            })
            .collect();

        tracing::info!("Supervising {} camera(s)", handles.len());

        let mut summary = RunSummary {
            workers: handles.len(),
            ..RunSummary::default()
        };
        for (camera, handle) in handles {
            match handle.await {
                Ok(report) => {
                    tracing::info!("Camera {}", report);
                    match report.exit {
                        ExitReason::StopRequested => summary.stopped += 1,
                        ExitReason::StreamEnded => summary.stream_ended += 1,
                    }
                }
                Err(e) => {
                    tracing::error!("Camera {} worker failed: {}", camera, e);
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Event, EventLog, MockLauncher, ScriptedSource};
    use async_trait::async_trait;
    use motion_detect::Classification::{self, Motion, NoMotion};
    use std::time::Duration;

    fn worker(
        name: &str,
        script: &[Classification],
        pending: bool,
        log: &EventLog,
    ) -> CameraWorker<ScriptedSource, MockLauncher> {
        let source = if pending {
            ScriptedSource::pending(script, log.clone())
        } else {
            ScriptedSource::terminating(script, log.clone())
        };
        CameraWorker::new(name, source, MockLauncher::new(log.clone()))
    }

    #[tokio::test]
    async fn test_only_moving_camera_records() {
        let (a, b) = (EventLog::default(), EventLog::default());
        let supervisor = Supervisor::new();

        let summary = supervisor
            .run(vec![
                worker("a", &[Motion], false, &a),
                worker("b", &[NoMotion, NoMotion, NoMotion], false, &b),
            ])
            .await;

        assert_eq!(a.count(&Event::Started(1)), 1);
        assert_eq!(b.events(), [Event::Closed]);
        assert_eq!(
            summary,
            RunSummary {
                workers: 2,
                stopped: 0,
                stream_ended: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_stop_reaches_every_worker() {
        let logs: Vec<EventLog> = (0..3).map(|_| EventLog::default()).collect();
        let supervisor = Supervisor::new();
        let stop = supervisor.stop_handle();

        let workers = vec![
            worker("a", &[Motion], true, &logs[0]),
            worker("b", &[NoMotion], true, &logs[1]),
            worker("c", &[Motion, NoMotion, Motion], true, &logs[2]),
        ];

        let waiter = {
            let logs = logs.clone();
            tokio::spawn(async move {
                logs[0].wait_for(&Event::Started(1)).await;
                logs[2].wait_for(&Event::Started(2)).await;
                stop.request_stop();
                stop.request_stop();
            })
        };

        let summary = tokio::time::timeout(Duration::from_secs(5), supervisor.run(workers))
            .await
            .expect("all workers should exit after a stop");
        waiter.await.unwrap();

        assert_eq!(summary.stopped, 3);
        assert_eq!(logs[0].events(), [Event::Started(1), Event::Stopped(1), Event::Closed]);
        assert_eq!(logs[1].events(), [Event::Closed]);
        assert_eq!(
            logs[2].events(),
            [
                Event::Started(1),
                Event::Stopped(1),
                Event::Started(2),
                Event::Stopped(2),
                Event::Closed
            ]
        );
        assert!(supervisor.stop_handle().is_stop_requested());
    }

    #[tokio::test]
    async fn test_request_stop_is_idempotent() {
        let log = EventLog::default();
        let supervisor = Supervisor::new();
        supervisor.request_stop();
        supervisor.request_stop();
        supervisor.stop_handle().request_stop();

        let summary = supervisor.run(vec![worker("a", &[Motion], true, &log)]).await;
        assert_eq!(summary.stopped, 1);
        assert_eq!(log.events(), [Event::Closed]);
    }

    #[tokio::test]
    async fn test_stream_error_is_isolated() {
        let (broken, healthy) = (EventLog::default(), EventLog::default());
        let supervisor = Supervisor::new();
        let stop = supervisor.stop_handle();

        let workers = vec![
            // Stream fails at once
            worker("broken", &[], false, &broken),
            worker("healthy", &[NoMotion, Motion, NoMotion, Motion], true, &healthy),
        ];

        let waiter = {
            let (broken, healthy) = (broken.clone(), healthy.clone());
            tokio::spawn(async move {
                broken.wait_for(&Event::Closed).await;
                healthy.wait_for(&Event::Started(2)).await;
                stop.request_stop();
            })
        };

        let summary = supervisor.run(workers).await;
        waiter.await.unwrap();

        assert_eq!(summary.stream_ended, 1);
        assert_eq!(summary.stopped, 1);
        assert_eq!(healthy.max_live_sessions(), 1);
        assert_eq!(healthy.count(&Event::Stopped(2)), 1);
    }

    /// Either a scripted camera or one whose detector panics
    enum MixedSource {
        Scripted(ScriptedSource),
        Panicking,
    }

    #[async_trait]
    impl FrameSource for MixedSource {
        async fn next_classification(&mut self) -> Classification {
            match self {
                MixedSource::Scripted(source) => source.next_classification().await,
                MixedSource::Panicking => panic!("detector blew up"),
            }
        }

        async fn close(&mut self) {
            if let MixedSource::Scripted(source) = self {
                source.close().await;
            }
        }
    }

    #[tokio::test]
    async fn test_panicking_worker_is_isolated() {
        let (bad, good) = (EventLog::default(), EventLog::default());
        let supervisor = Supervisor::new();

        let summary = supervisor
            .run(vec![
                CameraWorker::new("bad", MixedSource::Panicking, MockLauncher::new(bad.clone())),
                CameraWorker::new(
                    "good",
                    MixedSource::Scripted(ScriptedSource::terminating(&[Motion, NoMotion], good.clone())),
                    MockLauncher::new(good.clone()),
                ),
            ])
            .await;

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.stream_ended, 1);
        assert_eq!(good.events(), [Event::Started(1), Event::Stopped(1), Event::Closed]);
    }
}
