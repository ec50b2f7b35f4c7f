//! Asynchronous result delivery and cancellation.

use super::result::ExecutionResult;
use crate::error::ExecError;
use crate::process::ProcessHandle;
use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Receives the result of an asynchronous execution exactly once.
pub trait ResultHandler: Send + 'static {
    fn on_complete(self, result: ExecutionResult);
}

impl<F> ResultHandler for F
where
    F: FnOnce(ExecutionResult) + Send + 'static,
{
    fn on_complete(self, result: ExecutionResult) {
        self(result)
    }
}

#[derive(Debug, Default)]
struct CancelState {
    requested: bool,
    process: Option<Weak<ProcessHandle>>,
}

/// Kills an asynchronous execution, including one that has not launched yet.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    state: Arc<Mutex<CancelState>>,
}

impl CancelHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Request a kill.
    ///
    /// Returns `Ok(true)` when this call killed the running process. A
    /// request made before launch is remembered and applied as soon as the
    /// process exists.
    pub fn kill(&self) -> io::Result<bool> {
        let mut state = self.lock();
        state.requested = true;
        match state.process.as_ref().and_then(Weak::upgrade) {
            Some(process) => process.destroy(),
            None => Ok(false),
        }
    }

    /// Whether a kill has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.lock().requested
    }

    /// Attach the launched process, applying any pending kill.
    pub(crate) fn register(&self, process: &Arc<ProcessHandle>) -> io::Result<bool> {
        let mut state = self.lock();
        state.process = Some(Arc::downgrade(process));
        if state.requested {
            process.destroy()
        } else {
            Ok(false)
        }
    }
}

/// Handle to an execution running on a background thread.
///
/// Dropping the handle detaches the execution; it still runs to completion.
#[derive(Debug)]
pub struct ExecutionHandle {
    receiver: Receiver<ExecutionResult>,
    cancel: CancelHandle,
    result: Option<ExecutionResult>,
}

impl ExecutionHandle {
    pub(crate) fn new(receiver: Receiver<ExecutionResult>, cancel: CancelHandle) -> Self {
        Self {
            receiver,
            cancel,
            result: None,
        }
    }

    fn lost() -> ExecutionResult {
        ExecutionResult::failed(ExecError::ResultLost, Duration::ZERO)
    }

    /// Block until the result is available.
    pub fn wait(mut self) -> ExecutionResult {
        if let Some(result) = self.result.take() {
            return result;
        }
        self.receiver.recv().unwrap_or_else(|_| Self::lost())
    }

    /// Wait up to `timeout` for the result.
    pub fn wait_timeout(&mut self, timeout: Duration) -> Option<&ExecutionResult> {
        if self.result.is_none() {
            match self.receiver.recv_timeout(timeout) {
                Ok(result) => self.result = Some(result),
                Err(RecvTimeoutError::Timeout) => return None,
                Err(RecvTimeoutError::Disconnected) => self.result = Some(Self::lost()),
            }
        }
        self.result.as_ref()
    }

    /// The result, if it has been delivered.
    pub fn try_result(&mut self) -> Option<&ExecutionResult> {
        if self.result.is_none() {
            match self.receiver.try_recv() {
                Ok(result) => self.result = Some(result),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.result = Some(Self::lost()),
            }
        }
        self.result.as_ref()
    }

    /// Kill the process. See [`CancelHandle::kill`].
    pub fn kill(&self) -> io::Result<bool> {
        self.cancel.kill()
    }

    /// A cancel handle usable from other threads.
    pub fn canceller(&self) -> CancelHandle {
        self.cancel.clone()
    }
}
