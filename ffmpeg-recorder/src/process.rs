use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;

/// Ask a child to exit gracefully (SIGTERM on Unix).
///
/// A child that is already gone is not an error.
pub fn request_termination(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) | Err(nix::errno::Errno::ESRCH) => {}
                Err(e) => tracing::warn!("Failed to send SIGTERM to pid {}: {}", pid, e),
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }
}

/// Terminate a child and reap it.
///
/// Sends SIGTERM and waits for the exit. With a `grace` period, a child still
/// running afterwards is killed. Without one, this waits as long as the child
/// takes. The SIGTERM is sent even when the status check fails.
pub async fn terminate(child: &mut Child, grace: Option<Duration>) -> io::Result<ExitStatus> {
    match child.try_wait() {
        Ok(Some(status)) => return Ok(status),
        Ok(None) => {}
        Err(e) => {
            request_termination(child);
            return Err(e);
        }
    }

    request_termination(child);

    match grace {
        None => child.wait().await,
        Some(grace) => match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                tracing::warn!(
                    "Process {:?} still running {}s after SIGTERM, killing",
                    child.id(),
                    grace.as_secs_f32()
                );
                child.kill().await?;
                child.wait().await
            }
        },
    }
}
