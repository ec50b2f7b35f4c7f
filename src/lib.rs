//! runexec: portable external process execution.
//!
//! Launch a command, pump its standard streams on background threads, kill
//! it after a timeout, and judge the exit code against a policy. Executions
//! run synchronously via [`Executor::execute`] or in the background via
//! [`Executor::execute_async`].

pub mod command;
pub mod config;
pub mod error;
pub mod executor;
pub mod exit_codes;
pub mod launcher;
pub mod logging;
pub mod os;
pub mod process;
pub mod pump;
pub mod watchdog;

pub use command::{CommandSpec, Environment};
pub use config::ExecutorConfig;
pub use error::{ExecError, Result, StreamKind};
pub use executor::{
    CancelHandle, ExecutionHandle, ExecutionReport, ExecutionResult, Executor, ExitValues,
    ResultHandler,
};
pub use launcher::Launcher;
pub use os::OsFamily;
pub use process::{INVALID_EXIT_VALUE, ProcessHandle};
pub use pump::{CaptureBuffer, StreamRouter};
pub use watchdog::Watchdog;
