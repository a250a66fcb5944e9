//! External process launch, progress forwarding and exit interpretation.

use std::{
    fmt,
    path::PathBuf,
    process::Stdio,
    sync::Arc,
    time::Duration,
};

use serde::Serialize;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader},
    process::{Child, Command},
    task::JoinHandle,
    time::{sleep, timeout},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{Config, DEFAULT_MAX_DIAGNOSTIC_BYTES};

pub mod status;

pub use status::{NullStatus, StatusSink};

/// How long output readers may keep draining after the process exited.
const READER_GRACE: Duration = Duration::from_secs(2);

/// One external program launch: executable plus ordered arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub executable: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self { executable: executable.into(), args }
    }

    /// Arguments joined by single spaces, for display and logging.
    pub fn command_line(&self) -> String {
        self.args.join(" ")
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.executable.display(), self.command_line())
    }
}

/// Status sink, cancellation and limits shared by one run.
#[derive(Clone)]
pub struct ProcessContext {
    pub status: Arc<dyn StatusSink>,
    pub cancel: CancellationToken,
    pub timeout: Option<Duration>,
    pub max_diagnostic_bytes: usize,
}

impl ProcessContext {
    pub fn new(status: Arc<dyn StatusSink>) -> Self {
        Self {
            status,
            cancel: CancellationToken::new(),
            timeout: None,
            max_diagnostic_bytes: DEFAULT_MAX_DIAGNOSTIC_BYTES,
        }
    }

    pub fn from_config(cfg: &Config, status: Arc<dyn StatusSink>) -> Self {
        Self {
            timeout: cfg.timeout(),
            max_diagnostic_bytes: cfg.max_diagnostic_bytes(),
            ..Self::new(status)
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn set_status(&self, status: &str) {
        self.status.set_status(status);
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new(Arc::new(NullStatus))
    }
}

impl fmt::Debug for ProcessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("timeout", &self.timeout)
            .field("max_diagnostic_bytes", &self.max_diagnostic_bytes)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Exited,
    FailedToStart,
    Cancelled,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessResult {
    /// Exit code; `-1` when the process did not exit normally.
    pub exit_code: i32,
    /// Empty on success, captured diagnostics otherwise.
    pub error_text: String,
    pub outcome: Outcome,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.outcome == Outcome::Exited && self.exit_code == 0
    }

    fn interrupted(outcome: Outcome, error_text: String) -> Self {
        Self { exit_code: -1, error_text, outcome }
    }
}

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    Cancelled,
    TimedOut,
}

/// Runs `invocation` to completion, cancellation or timeout.
///
/// Every stdout line is forwarded to the status sink. Ordinary failures are
/// reported in the returned [`ProcessResult`]; a cancelled or timed out child
/// is killed and reaped before this returns.
pub async fn run(invocation: &Invocation, ctx: &ProcessContext) -> ProcessResult {
    let exe = invocation.executable.display().to_string();
    let mut cmd = Command::new(&invocation.executable);
    cmd.args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    info!(executable = %exe, args = %invocation.command_line(), "executing");
    let mut child: Child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(executable = %exe, error = %e, "failed to start process");
            return ProcessResult::interrupted(
                Outcome::FailedToStart,
                format!("failed to start '{}': {}", exe, e),
            );
        }
    };

    let limit = ctx.max_diagnostic_bytes;
    let stdout_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(forward_lines(out, ctx.status.clone(), limit)));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(capture_tail(err, limit)));

    let deadline = async {
        match ctx.timeout {
            Some(d) => sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };

    let waited = tokio::select! {
        status = child.wait() => Waited::Exited(status),
        _ = ctx.cancel.cancelled() => Waited::Cancelled,
        _ = deadline => Waited::TimedOut,
    };

    let status = match waited {
        Waited::Exited(status) => status,
        Waited::Cancelled => {
            terminate(&mut child, &exe).await;
            abort(stdout_task);
            abort(stderr_task);
            return ProcessResult::interrupted(
                Outcome::Cancelled,
                format!("'{}' was cancelled", exe),
            );
        }
        Waited::TimedOut => {
            terminate(&mut child, &exe).await;
            abort(stdout_task);
            abort(stderr_task);
            let secs = ctx.timeout.map(|d| d.as_secs()).unwrap_or_default();
            return ProcessResult::interrupted(
                Outcome::TimedOut,
                format!("'{}' did not finish within {} s and was killed", exe, secs),
            );
        }
    };

    let stdout_tail = join_reader(stdout_task).await;
    let stderr_tail = join_reader(stderr_task).await;

    let status = match status {
        Ok(s) => s,
        Err(e) => {
            warn!(executable = %exe, error = %e, "failed waiting for process");
            return ProcessResult {
                exit_code: -1,
                error_text: format!("failed waiting for '{}': {}", exe, e),
                outcome: Outcome::Exited,
            };
        }
    };

    let exit_code = status.code().unwrap_or(-1);
    if status.success() {
        info!(executable = %exe, "process finished");
        return ProcessResult { exit_code, error_text: String::new(), outcome: Outcome::Exited };
    }

    let error_text = diagnostics(&stderr_tail, &stdout_tail, exit_code);
    warn!(executable = %exe, exit_code, "process failed");
    ProcessResult { exit_code, error_text, outcome: Outcome::Exited }
}

fn diagnostics(stderr: &str, stdout: &str, exit_code: i32) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    let stdout = stdout.trim();
    if !stdout.is_empty() {
        return stdout.to_string();
    }
    if exit_code == -1 {
        "process was terminated by a signal".to_string()
    } else {
        format!("process exited with code {}", exit_code)
    }
}

async fn terminate(child: &mut Child, exe: &str) {
    if let Err(e) = child.kill().await {
        // already gone
        debug!(executable = %exe, error = %e, "kill failed");
    }
    info!(executable = %exe, "process terminated");
}

fn abort(task: Option<JoinHandle<String>>) {
    if let Some(t) = task {
        t.abort();
    }
}

async fn join_reader(task: Option<JoinHandle<String>>) -> String {
    let Some(task) = task else {
        return String::new();
    };
    let handle = task.abort_handle();
    match timeout(READER_GRACE, task).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            // A grandchild still holds the pipe open.
            handle.abort();
            String::new()
        }
    }
}

async fn forward_lines<R>(reader: R, status: Arc<dyn StatusSink>, limit: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail = TailBuffer::new(limit);
    let mut reader = BufReader::new(reader);
    let mut raw = Vec::new();
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        // Scripts may print in a non-UTF-8 locale codepage.
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim_end();
        if !line.is_empty() {
            status.set_status(line);
        }
        tail.push(line.as_bytes());
        tail.push(b"\n");
    }
    tail.into_string()
}

async fn capture_tail<R>(mut reader: R, limit: usize) -> String
where
    R: AsyncRead + Unpin,
{
    let mut tail = TailBuffer::new(limit);
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => tail.push(&chunk[..n]),
        }
    }
    tail.into_string()
}

/// Keeps the last `limit` bytes written to it.
#[derive(Debug)]
struct TailBuffer {
    limit: usize,
    buf: Vec<u8>,
    truncated: bool,
}

impl TailBuffer {
    fn new(limit: usize) -> Self {
        Self { limit, buf: Vec::new(), truncated: false }
    }

    fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > self.limit {
            let excess = self.buf.len() - self.limit;
            self.buf.drain(..excess);
            self.truncated = true;
        }
    }

    fn into_string(self) -> String {
        let text = String::from_utf8_lossy(&self.buf).into_owned();
        if self.truncated {
            format!("...{}", text)
        } else {
            text
        }
    }
}
