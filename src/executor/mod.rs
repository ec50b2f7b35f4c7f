//! Command execution.
//!
//! Ties launcher, watchdog, and stream router together. One execution runs
//! as: check working directory, launch, start pumps, arm watchdog, wait for
//! exit, stop watchdog, drain pumps, apply the exit-value policy.
//!
//! Failures never escape as panics or early returns from [`Executor::execute`];
//! they are captured in the [`ExecutionResult`].

mod exit_values;
mod handle;
mod result;


pub use exit_values::ExitValues;
pub use handle::{CancelHandle, ExecutionHandle, ResultHandler};
pub use result::{ExecutionReport, ExecutionResult};

use crate::command::{CommandSpec, Environment};
use crate::error::ExecError;
use crate::launcher::Launcher;
use crate::os::OsFamily;
use crate::process::{INVALID_EXIT_VALUE, ProcessHandle, exit_code};
use crate::pump::StreamRouter;
use crate::watchdog::Watchdog;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Runs commands with a launcher, exit-value policy, and optional watchdog.
///
/// Cloning is cheap; clones share the same watchdog, which monitors one
/// running process at a time. An execution started while the shared
/// watchdog is busy fails with [`ExecError::WatchdogBusy`].
#[derive(Debug, Clone)]
pub struct Executor {
    launcher: Launcher,
    working_dir: Option<PathBuf>,
    exit_values: ExitValues,
    watchdog: Option<Arc<Watchdog>>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(OsFamily::detect())
    }
}

impl Executor {
    /// Executor using the launcher for `family`, accepting only exit code 0.
    pub fn new(family: OsFamily) -> Self {
        Self {
            launcher: Launcher::for_family(family),
            working_dir: None,
            exit_values: ExitValues::default(),
            watchdog: None,
        }
    }

    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_exit_values(mut self, exit_values: ExitValues) -> Self {
        self.exit_values = exit_values;
        self
    }

    /// Monitor executions with `watchdog`.
    pub fn with_watchdog(mut self, watchdog: Arc<Watchdog>) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    /// Shorthand for a fresh watchdog with `timeout`.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_watchdog(Arc::new(Watchdog::new(timeout)))
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn exit_values(&self) -> &ExitValues {
        &self.exit_values
    }

    pub fn watchdog(&self) -> Option<&Arc<Watchdog>> {
        self.watchdog.as_ref()
    }

    /// Run `command` to completion on the calling thread.
    ///
    /// `env` replaces the child's environment when given.
    pub fn execute(
        &self,
        command: &CommandSpec,
        env: Option<&Environment>,
        router: StreamRouter,
    ) -> ExecutionResult {
        self.run(command, env, router, None)
    }

    /// Run `command` on a background thread.
    ///
    /// The launch itself happens on that thread, so launch failures arrive
    /// through the handle like every other failure.
    pub fn execute_async(
        &self,
        command: CommandSpec,
        env: Option<Environment>,
        router: StreamRouter,
    ) -> ExecutionHandle {
        let (sender, receiver) = mpsc::sync_channel(1);
        let cancel = self.spawn_execution(command, env, router, move |result| {
            // A dropped handle just means nobody is listening.
            let _ = sender.send(result);
        });
        ExecutionHandle::new(receiver, cancel)
    }

    /// Run `command` on a background thread and hand the result to
    /// `handler` exactly once.
    pub fn execute_with_handler<H: ResultHandler>(
        &self,
        command: CommandSpec,
        env: Option<Environment>,
        router: StreamRouter,
        handler: H,
    ) -> CancelHandle {
        self.spawn_execution(command, env, router, move |result| {
            handler.on_complete(result)
        })
    }

    fn spawn_execution<F>(
        &self,
        command: CommandSpec,
        env: Option<Environment>,
        router: StreamRouter,
        deliver: F,
    ) -> CancelHandle
    where
        F: FnOnce(ExecutionResult) + Send + 'static,
    {
        let cancel = CancelHandle::new();
        // Held outside the thread so a failed spawn can still deliver.
        let delivery = Arc::new(Mutex::new(Some(deliver)));

        let executor = self.clone();
        let thread_cancel = cancel.clone();
        let thread_delivery = Arc::clone(&delivery);

        let spawned = thread::Builder::new()
            .name("runexec-waiter".to_string())
            .spawn(move || {
                let started = Instant::now();
                let result = catch_unwind(AssertUnwindSafe(|| {
                    executor.run(&command, env.as_ref(), router, Some(&thread_cancel))
                }))
                .unwrap_or_else(|_| {
                    warn!("execution thread panicked");
                    ExecutionResult::failed(ExecError::ResultLost, started.elapsed())
                });
                deliver_once(&thread_delivery, result);
            });

        if let Err(source) = spawned {
            let error = ExecError::Spawn {
                name: "waiter",
                source,
            };
            deliver_once(&delivery, ExecutionResult::failed(error, Duration::ZERO));
        }

        cancel
    }

    fn run(
        &self,
        command: &CommandSpec,
        env: Option<&Environment>,
        mut router: StreamRouter,
        cancel: Option<&CancelHandle>,
    ) -> ExecutionResult {
        let started = Instant::now();
        let working_dir = self.working_dir.as_deref();

        if let Some(dir) = working_dir
            && !dir.is_dir()
        {
            let source = io::Error::new(
                io::ErrorKind::NotFound,
                format!("working directory '{}' does not exist", dir.display()),
            );
            let error = ExecError::launch(command.executable(), source);
            info!(error = %error, "execution failed before launch");
            return ExecutionResult::failed(error, started.elapsed());
        }

        let child = match self.launcher.launch(command, env, working_dir) {
            Ok(child) => child,
            Err(error) => {
                info!(error = %error, "execution failed before launch");
                return ExecutionResult::failed(error, started.elapsed());
            }
        };
        let process = Arc::new(ProcessHandle::new(child));

        if let Err(error) = router.start(process.take_streams()) {
            // Whatever pumps did start still need the child gone to finish.
            let _ = process.destroy();
            let _ = process.wait();
            let _ = router.stop();
            return ExecutionResult::failed(error, started.elapsed());
        }

        let mut error: Option<ExecError> = None;

        // Only an arming made by this execution is stopped and consulted.
        let mut arming = None;
        if let Some(watchdog) = &self.watchdog {
            match watchdog.arm(&process) {
                Ok(generation) => arming = Some((watchdog, generation)),
                Err(e) => {
                    warn!(error = %e, "watchdog failed to start; killing process");
                    if let Err(kill) = process.destroy() {
                        warn!(error = %kill, "failed to kill unmonitored process");
                    }
                    error = Some(e);
                }
            }
        }

        if let Some(cancel) = cancel
            && let Err(e) = cancel.register(&process)
        {
            error.get_or_insert(ExecError::Destroy(e));
        }

        let exit_code = match process.wait() {
            Ok(status) => exit_code(&status),
            Err(e) => {
                // The child may still hold its pipes open.
                let _ = process.destroy();
                error.get_or_insert(ExecError::Wait(e));
                INVALID_EXIT_VALUE
            }
        };

        let killed_by_timeout = match arming {
            Some((watchdog, generation)) => {
                let killed = watchdog.disarm(generation);
                if let Some(e) = watchdog.take_error() {
                    error.get_or_insert(ExecError::Destroy(e));
                }
                killed
            }
            None => false,
        };
        let streams = router.stop();

        let cancelled = !killed_by_timeout
            && process.was_destroyed()
            && cancel.is_some_and(CancelHandle::is_cancelled);

        if let Err(e) = streams {
            error.get_or_insert(e);
        }

        if error.is_none() && self.exit_values.is_failure(exit_code) {
            error = Some(if killed_by_timeout {
                ExecError::Timeout {
                    timeout: arming
                        .and_then(|(watchdog, _)| watchdog.timeout())
                        .unwrap_or_default(),
                    code: exit_code,
                }
            } else {
                ExecError::ExitValue { code: exit_code }
            });
        }

        let duration = started.elapsed();
        info!(
            pid = process.id(),
            exit_code,
            killed_by_timeout,
            cancelled,
            duration_ms = duration.as_millis() as u64,
            error = error.as_ref().map(tracing::field::display),
            "execution finished"
        );

        ExecutionResult {
            exit_code,
            error,
            killed_by_timeout,
            cancelled,
            duration,
        }
    }
}

fn deliver_once<F>(slot: &Mutex<Option<F>>, result: ExecutionResult)
where
    F: FnOnce(ExecutionResult),
{
    let deliver = slot
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .take();
    if let Some(deliver) = deliver {
        deliver(result);
    }
}
