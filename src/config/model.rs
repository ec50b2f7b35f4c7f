//! ExecutorConfig struct definition and defaults.

use crate::launcher::DEFAULT_SHELL;
use crate::os::OsFamily;
use crate::pump::DEFAULT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Settings for an [`Executor`](crate::Executor) and its stream router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    // =========================================================================
    // Execution
    // =========================================================================
    /// Kill the process after this many milliseconds. No timeout when unset.
    pub timeout_ms: Option<u64>,

    /// Directory the command runs in. Inherited when unset.
    pub working_dir: Option<PathBuf>,

    /// Exit codes that count as success. Only 0 when unset.
    pub exit_values: Option<Vec<i32>>,

    /// Accept every exit code.
    pub ignore_exit_values: bool,

    // =========================================================================
    // Launching
    // =========================================================================
    /// OS family used to pick the launcher. Detected from the host when unset.
    pub os_family: Option<OsFamily>,

    /// Shell used to apply a working directory on Windows-family launchers.
    #[serde(default = "default_shell")]
    pub shell: String,

    // =========================================================================
    // Streams
    // =========================================================================
    /// Pump buffer size in bytes.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    /// Sleep between polls of a non-blocking stdin source.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long to wait for each pump after the process exits. Unbounded when
    /// unset.
    pub stream_stop_timeout_ms: Option<u64>,
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

fn default_poll_interval_ms() -> u64 {
    50
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            working_dir: None,
            exit_values: None,
            ignore_exit_values: false,
            os_family: None,
            shell: default_shell(),
            buffer_size: default_buffer_size(),
            poll_interval_ms: default_poll_interval_ms(),
            stream_stop_timeout_ms: None,
        }
    }
}
