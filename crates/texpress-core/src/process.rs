//! External process invocation
//!
//! Every compiler and bibliography pass goes through a [`ProcessRunner`].
//! [`SystemRunner`] spawns the real binary and enforces the per-pass
//! timeout; tests substitute scripted runners.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

/// A single external command to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Arguments as lossy strings, for logging and assertions
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Outcome of one external invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessResult {
    /// The process ran and exited with status zero
    pub success: bool,
    /// The process was killed after exceeding its timeout
    pub timed_out: bool,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessResult {
    /// Successful result with the given stdout
    pub fn succeeded(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Failed result with the given stderr
    pub fn failed(stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            stderr: stderr.into(),
            ..Self::default()
        }
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Runs external commands synchronously
pub trait ProcessRunner: Send + Sync {
    /// Run the invocation to completion (or timeout)
    ///
    /// Failures to spawn are reported as an unsuccessful result, never as
    /// a panic or error, so callers can diagnose them like any other
    /// failed pass.
    fn run(&self, invocation: &Invocation) -> ProcessResult;
}

/// Runs commands as real child processes
#[derive(Debug, Clone)]
pub struct SystemRunner {
    poll_interval: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(25),
        }
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> ProcessResult {
        debug!(
            program = %invocation.program,
            args = ?invocation.args_lossy(),
            "Spawning process"
        );

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = invocation.current_dir {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to start {}: {}", invocation.program, e);
                return ProcessResult::failed(format!(
                    "failed to start `{}`: {}",
                    invocation.program, e
                ));
            }
        };

        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);
        let deadline = invocation.timeout.map(|t| Instant::now() + t);

        let (success, timed_out) = loop {
            match child.try_wait() {
                Ok(Some(status)) => break (status.success(), false),
                Ok(None) => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        warn!("{} exceeded its timeout, killing it", invocation.program);
                        let _ = child.kill();
                        let _ = child.wait();
                        break (false, true);
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(e) => {
                    warn!("Failed to wait on {}: {}", invocation.program, e);
                    let _ = child.kill();
                    let _ = child.wait();
                    break (false, false);
                }
            }
        };

        let stdout = stdout.map(collect).unwrap_or_default();
        let mut stderr = stderr.map(collect).unwrap_or_default();
        if timed_out {
            let secs = invocation.timeout.map(|t| t.as_secs_f64()).unwrap_or_default();
            stderr.extend_from_slice(
                format!("\n`{}` timed out after {}s", invocation.program, secs).as_bytes(),
            );
        }

        ProcessResult {
            success,
            timed_out,
            stdout,
            stderr,
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn collect(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_builder() {
        let inv = Invocation::new("pdflatex")
            .arg("-output-directory")
            .arg("/tmp")
            .current_dir("/tmp")
            .timeout(Some(Duration::from_secs(5)));

        assert_eq!(inv.program, "pdflatex");
        assert_eq!(inv.args_lossy(), vec!["-output-directory", "/tmp"]);
        assert_eq!(inv.current_dir, Some(PathBuf::from("/tmp")));
        assert_eq!(inv.timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_missing_binary_is_failed_result() {
        let result = SystemRunner::new().run(&Invocation::new("texpress-no-such-binary-xyz"));
        assert!(!result.success);
        assert!(!result.timed_out);
        assert!(result.stderr_lossy().contains("texpress-no-such-binary-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_and_output() {
        let ok = SystemRunner::new().run(&Invocation::new("echo").arg("hello"));
        assert!(ok.success);
        assert_eq!(ok.stdout_lossy().trim(), "hello");

        let failed = SystemRunner::new().run(&Invocation::new("false"));
        assert!(!failed.success);
        assert!(!failed.timed_out);
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let started = Instant::now();
        let result = SystemRunner::new().run(
            &Invocation::new("sleep")
                .arg("5")
                .timeout(Some(Duration::from_millis(200))),
        );

        assert!(!result.success);
        assert!(result.timed_out);
        assert!(result.stderr_lossy().contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_current_dir_applied() {
        let dir = tempfile::tempdir().unwrap();
        let result = SystemRunner::new().run(&Invocation::new("pwd").current_dir(dir.path()));
        assert!(result.success);
        let reported = PathBuf::from(result.stdout_lossy().trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
