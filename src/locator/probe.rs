use std::{path::Path, process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{process::Command, time::timeout};
use tracing::debug;

use crate::config::DEFAULT_PROBE_TIMEOUT_SEC;

/// Decides whether a candidate executable is usable.
#[async_trait]
pub trait Probe: Send + Sync {
    /// True when `candidate` started, ran `args` and exited 0. Never fails.
    async fn probe(&self, candidate: &Path, args: &[String]) -> bool;
}

/// Probes by running the candidate as a child process.
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    timeout: Duration,
}

impl ProcessProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SEC))
    }
}

#[async_trait]
impl Probe for ProcessProbe {
    async fn probe(&self, candidate: &Path, args: &[String]) -> bool {
        let mut cmd = Command::new(candidate);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                debug!(candidate = %candidate.display(), error = %e, "probe could not start");
                return false;
            }
        };
        let waited = timeout(self.timeout, child.wait()).await;
        match waited {
            Ok(Ok(status)) => {
                debug!(candidate = %candidate.display(), %status, "probe finished");
                status.success()
            }
            Ok(Err(e)) => {
                debug!(candidate = %candidate.display(), error = %e, "probe wait failed");
                false
            }
            Err(_) => {
                debug!(candidate = %candidate.display(), "probe timed out");
                let _ = child.kill().await;
                false
            }
        }
    }
}
