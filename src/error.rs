//! Error types for runexec.
//!
//! Uses thiserror for derive macros. Each variant belongs to one failure
//! family so callers can tell "never ran" from "ran but failed".

use crate::exit_codes;
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Which of the child's standard streams an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Stdout,
    Stderr,
    Stdin,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
            StreamKind::Stdin => write!(f, "stdin"),
        }
    }
}

/// Main error type for runexec operations.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The OS could not create the process.
    #[error("failed to launch '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    /// Copying one of the child's streams failed.
    #[error("{stream} stream failed: {source}")]
    Stream {
        stream: StreamKind,
        #[source]
        source: io::Error,
    },

    /// A stream pump was still running when the stop timeout elapsed.
    #[error("{stream} pump did not finish within {timeout:?}")]
    StreamStopTimeout { stream: StreamKind, timeout: Duration },

    /// The process ran but its exit code is outside the allowed set.
    #[error("process exited with code {code}")]
    ExitValue { code: i32 },

    /// The watchdog killed the process and the exit code was rejected.
    #[error("process killed after exceeding timeout of {timeout:?} (exit code {code})")]
    Timeout { timeout: Duration, code: i32 },

    /// Waiting for the process to exit failed.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] io::Error),

    /// Killing the process failed.
    #[error("failed to destroy process: {0}")]
    Destroy(#[source] io::Error),

    /// The watchdog is still monitoring another running process.
    #[error("watchdog is already monitoring running process {pid}")]
    WatchdogBusy { pid: u32 },

    /// A helper thread (pump, timer, waiter) could not be started.
    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    /// The execution thread ended without delivering a result.
    #[error("execution thread terminated without delivering a result")]
    ResultLost,

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExecError {
    /// Build a launch failure for `program`.
    pub fn launch(program: impl Into<String>, source: io::Error) -> Self {
        ExecError::Launch {
            program: program.into(),
            source,
        }
    }

    /// Returns the exit code the `runexec` binary uses for this error.
    ///
    /// Exit-value failures pass the child's own code through when it fits
    /// in a process exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecError::Launch { .. } => exit_codes::LAUNCH_FAILURE,
            ExecError::Timeout { .. } => exit_codes::TIMEOUT,
            ExecError::ExitValue { code } if (1..=255).contains(code) => *code,
            ExecError::Config(_) => exit_codes::USAGE_ERROR,
            ExecError::ExitValue { .. }
            | ExecError::Stream { .. }
            | ExecError::StreamStopTimeout { .. }
            | ExecError::Wait(_)
            | ExecError::Destroy(_)
            | ExecError::Spawn { .. }
            | ExecError::WatchdogBusy { .. }
            | ExecError::ResultLost => exit_codes::INTERNAL_FAILURE,
        }
    }

    /// True when the process never started.
    pub fn is_launch_failure(&self) -> bool {
        matches!(self, ExecError::Launch { .. })
    }
}

/// Result type alias for runexec operations.
pub type Result<T> = std::result::Result<T, ExecError>;
