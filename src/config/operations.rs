//! Config loading, validation, and conversion into runtime objects.

use super::model::ExecutorConfig;
use crate::error::{ExecError, Result};
use crate::executor::{Executor, ExitValues};
use crate::launcher::Launcher;
use crate::os::OsFamily;
use crate::pump::StreamRouter;
use crate::watchdog::Watchdog;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

impl ExecutorConfig {
    /// Load and validate config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ExecError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ExecutorConfig = serde_yaml::from_str(yaml)
            .map_err(|e| ExecError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ExecError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `timeout_ms`, `buffer_size`, and `poll_interval_ms` must be positive
    /// - `shell` must be non-empty
    /// - `exit_values` and `ignore_exit_values` are mutually exclusive
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == Some(0) {
            return Err(invalid("timeout_ms must be greater than 0"));
        }

        if self.buffer_size == 0 {
            return Err(invalid("buffer_size must be greater than 0"));
        }

        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms must be greater than 0"));
        }

        if self.shell.trim().is_empty() {
            return Err(invalid("shell must be non-empty"));
        }

        if self.ignore_exit_values && self.exit_values.is_some() {
            return Err(invalid(
                "exit_values cannot be combined with ignore_exit_values",
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    pub fn os_family(&self) -> OsFamily {
        self.os_family.unwrap_or_default()
    }

    /// Exit-value policy described by this config.
    pub fn exit_value_policy(&self) -> ExitValues {
        if self.ignore_exit_values {
            return ExitValues::Any;
        }
        match &self.exit_values {
            Some(codes) => ExitValues::allowed(codes.iter().copied()),
            None => ExitValues::ZeroOnly,
        }
    }

    /// Build an executor. A watchdog is attached only when a timeout is set.
    pub fn executor(&self) -> Executor {
        let launcher = Launcher::for_family_with_shell(self.os_family(), &self.shell);
        let mut executor = Executor::new(self.os_family())
            .with_launcher(launcher)
            .with_exit_values(self.exit_value_policy());

        if let Some(dir) = &self.working_dir {
            executor = executor.with_working_dir(dir);
        }
        if let Some(timeout) = self.timeout() {
            executor = executor.with_watchdog(Arc::new(Watchdog::new(timeout)));
        }
        executor
    }

    /// Apply the stream settings to `router`.
    pub fn apply_to(&self, router: StreamRouter) -> StreamRouter {
        router
            .with_buffer_size(self.buffer_size)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_stop_timeout(self.stream_stop_timeout_ms.map(Duration::from_millis))
    }
}

impl Executor {
    /// Shorthand for [`ExecutorConfig::executor`].
    pub fn from_config(config: &ExecutorConfig) -> Self {
        config.executor()
    }
}

fn invalid(message: &str) -> ExecError {
    ExecError::Config(format!("config validation failed: {}", message))
}
