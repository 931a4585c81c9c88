//! Scripted frame sources and an in-memory launcher for exercising workers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ffmpeg_recorder::RecorderError;
use motion_detect::Classification;

use crate::launcher::SessionLauncher;
use crate::source::FrameSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(u32),
    StartFailed,
    Stopped(u32),
    Closed,
}

#[derive(Default)]
struct LogInner {
    events: Vec<Event>,
    live: usize,
    max_live: usize,
}

/// Ordered record of everything one camera's source and launcher did.
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<LogInner>>);

impl EventLog {
    fn push(&self, event: Event) {
        let mut inner = self.0.lock().unwrap();
        match event {
            Event::Started(_) => {
                inner.live += 1;
                inner.max_live = inner.max_live.max(inner.live);
            }
            Event::Stopped(_) => inner.live -= 1,
            _ => {}
        }
        inner.events.push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().events.clone()
    }

    /// Most sessions ever alive at the same time
    pub fn max_live_sessions(&self) -> usize {
        self.0.lock().unwrap().max_live
    }

    pub fn count(&self, wanted: &Event) -> usize {
        self.0
            .lock()
            .unwrap()
            .events
            .iter()
            .filter(|e| *e == wanted)
            .count()
    }

    /// Poll until `event` has been recorded.
    pub async fn wait_for(&self, event: &Event) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.count(event) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("event was never recorded");
    }
}

/// Replays a fixed list of verdicts, then either terminates or blocks forever.
pub struct ScriptedSource {
    script: VecDeque<Classification>,
    block_when_done: bool,
    log: EventLog,
}

impl ScriptedSource {
    pub fn terminating(script: &[Classification], log: EventLog) -> Self {
        Self {
            script: script.iter().copied().collect(),
            block_when_done: false,
            log,
        }
    }

    pub fn pending(script: &[Classification], log: EventLog) -> Self {
        Self {
            block_when_done: true,
            ..Self::terminating(script, log)
        }
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_classification(&mut self) -> Classification {
        match self.script.pop_front() {
            Some(verdict) => {
                tokio::task::yield_now().await;
                verdict
            }
            None if self.block_when_done => std::future::pending().await,
            None => Classification::Terminated,
        }
    }

    async fn close(&mut self) {
        self.log.push(Event::Closed);
    }
}

/// Launcher handing out numbered sessions.
pub struct MockLauncher {
    log: EventLog,
    failing_starts: u32,
    next_id: u32,
}

impl MockLauncher {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            failing_starts: 0,
            next_id: 1,
        }
    }

    /// Make the next `n` starts fail
    pub fn failing_starts(mut self, n: u32) -> Self {
        self.failing_starts = n;
        self
    }
}

#[async_trait]
impl SessionLauncher for MockLauncher {
    type Session = u32;

    async fn start(&mut self, _started_at: DateTime<Utc>) -> Result<u32, RecorderError> {
        if self.failing_starts > 0 {
            self.failing_starts -= 1;
            self.log.push(Event::StartFailed);
            return Err(RecorderError::FfmpegNotFound);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.log.push(Event::Started(id));
        Ok(id)
    }

    async fn stop(&mut self, session: u32) -> Result<(), RecorderError> {
        self.log.push(Event::Stopped(session));
        Ok(())
    }
}
