//! External command execution with per-call timeouts.
//!
//! Detection lookups go through the [`Executor`] trait so tests can substitute
//! canned responses. [`SystemExecutor`] is the production implementation.
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::ExecError;

/// How often a running child is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of a command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecResult {
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
}

impl ExecResult {
    /// A successful result with the given standard output.
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            success: true,
            code: Some(0),
        }
    }

    /// A failed result with the given exit code and standard error.
    #[must_use]
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            success: false,
            code: Some(code),
        }
    }

    /// `exit status N: <first stderr line>`, for reporting a failed run.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        let status = self
            .code
            .map_or_else(|| "terminated by signal".to_string(), |c| format!("exit status {c}"));
        match self.stderr.lines().map(str::trim).find(|l| !l.is_empty()) {
            Some(line) => format!("{status}: {line}"),
            None => status,
        }
    }
}

/// Abstraction over process execution.
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `program` with `args`, killing it if it outlives `timeout`.
    ///
    /// A non-zero exit is not an error; inspect [`ExecResult::success`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Spawn`] if the program cannot be started and
    /// [`ExecError::Timeout`] if it does not finish in time.
    fn run(&self, program: &str, args: &[&str], timeout: Duration)
    -> Result<ExecResult, ExecError>;

    /// Locate `program` on the executable search path.
    fn which(&self, program: &str) -> Option<PathBuf>;
}

/// Runs real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ExecResult, ExecError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.to_string(),
                source,
            })?;

        // Drain both pipes concurrently so a chatty child cannot block on a
        // full pipe buffer while we poll for exit.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_deadline(&mut child, program, timeout)?;

        Ok(ExecResult {
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
            success: status.success(),
            code: status.code(),
        })
    }

    fn which(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> Result<std::process::ExitStatus, ExecError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExecError::Timeout {
                    program: program.to_string(),
                    timeout,
                });
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                return Err(ExecError::Wait {
                    program: program.to_string(),
                    source,
                });
            }
        }
    }
}

/// Run `f` on a helper thread and give up waiting after `timeout`.
///
/// The helper thread is detached on timeout; `f` must not hold locks the
/// caller needs.
///
/// # Errors
///
/// Returns [`ExecError::Timeout`] labelled with `label` if `f` does not
/// return in time.
pub fn with_timeout<T, F>(label: &str, timeout: Duration, f: F) -> Result<T, ExecError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(timeout).map_err(|_| ExecError::Timeout {
        program: label.to_string(),
        timeout,
    })
}
