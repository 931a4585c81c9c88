use tokio::task::JoinHandle;

use crate::supervisor::StopHandle;

/// Turns a stream of stop signals into a single stop request.
#[derive(Debug)]
pub struct SignalBridge {
    stop: StopHandle,
    received: u32,
}

impl SignalBridge {
    pub fn new(stop: StopHandle) -> Self {
        Self { stop, received: 0 }
    }

    /// Handle one received signal. Returns true if this one requested the stop.
    pub fn on_signal(&mut self, name: &str) -> bool {
        self.received += 1;
        if self.received == 1 {
            tracing::info!("Received {}, shutting down...", name);
            self.stop.request_stop();
            true
        } else {
            tracing::warn!(
                "Received {} again ({} total), already shutting down",
                name,
                self.received
            );
            false
        }
    }
}

/// Listen for SIGINT and SIGTERM for the rest of the process lifetime.
#[cfg(unix)]
pub fn install(stop: StopHandle) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut bridge = SignalBridge::new(stop);

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = sigint.recv() => "SIGINT",
                Some(()) = sigterm.recv() => "SIGTERM",
                else => break,
            };
            bridge.on_signal(name);
        }
    }))
}

/// Listen for Ctrl+C for the rest of the process lifetime.
#[cfg(not(unix))]
pub fn install(stop: StopHandle) -> std::io::Result<JoinHandle<()>> {
    let mut bridge = SignalBridge::new(stop);
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            bridge.on_signal("Ctrl+C");
        }
    }))
}
