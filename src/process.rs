//! Shared handle to a launched child process.
//!
//! The waiter thread and the watchdog timer both touch the same child, so
//! every operation goes through one mutex. Once the child has been reaped its
//! exit status is cached and [`ProcessHandle::destroy`] becomes a no-op; a
//! kill can never hit a reaped (and possibly recycled) pid.

use std::io;
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout, ExitStatus};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Exit code reported when no real exit code exists.
pub const INVALID_EXIT_VALUE: i32 = -1;

const MIN_POLL: Duration = Duration::from_millis(1);
const MAX_POLL: Duration = Duration::from_millis(50);

/// The child's standard streams, taken out of the handle once.
#[derive(Debug, Default)]
pub struct ProcessStreams {
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

#[derive(Debug)]
struct HandleState {
    child: Child,
    status: Option<ExitStatus>,
    destroyed: bool,
}

impl HandleState {
    fn poll(&mut self) -> io::Result<Option<ExitStatus>> {
        if let Some(status) = self.status {
            return Ok(Some(status));
        }
        let status = self.child.try_wait()?;
        self.status = status;
        Ok(status)
    }
}

/// A running (or finished) child process shared between threads.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    state: Mutex<HandleState>,
}

impl ProcessHandle {
    pub fn new(child: Child) -> Self {
        Self {
            pid: child.id(),
            state: Mutex::new(HandleState {
                child,
                status: None,
                destroyed: false,
            }),
        }
    }

    /// OS process id.
    pub fn id(&self) -> u32 {
        self.pid
    }

    fn lock(&self) -> MutexGuard<'_, HandleState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Take the piped standard streams. Later calls return empty streams.
    pub fn take_streams(&self) -> ProcessStreams {
        let mut state = self.lock();
        ProcessStreams {
            stdin: state.child.stdin.take(),
            stdout: state.child.stdout.take(),
            stderr: state.child.stderr.take(),
        }
    }

    /// Check for exit without blocking.
    pub fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        self.lock().poll()
    }

    /// Whether the process has been reaped.
    pub fn has_exited(&self) -> bool {
        self.lock().status.is_some()
    }

    /// Block until the process exits.
    ///
    /// The lock is only held while polling, so a concurrent
    /// [`destroy`](Self::destroy) is never blocked behind a waiter.
    pub fn wait(&self) -> io::Result<ExitStatus> {
        let mut delay = MIN_POLL;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(status);
            }
            thread::sleep(delay);
            delay = (delay * 2).min(MAX_POLL);
        }
    }

    /// Kill the process if it is still running.
    ///
    /// Returns `Ok(true)` only when this call delivered the kill. A process
    /// that already exited (or was already killed) yields `Ok(false)`.
    pub fn destroy(&self) -> io::Result<bool> {
        let mut state = self.lock();
        if state.destroyed || state.poll()?.is_some() {
            return Ok(false);
        }

        state.child.kill()?;
        state.destroyed = true;
        debug!(pid = self.pid, "process destroyed");
        Ok(true)
    }

    /// Whether [`destroy`](Self::destroy) killed this process.
    pub fn was_destroyed(&self) -> bool {
        self.lock().destroyed
    }
}

/// Integer exit code for a status.
///
/// On Unix a process terminated by a signal reports `128 + signal`.
pub fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    INVALID_EXIT_VALUE
}
