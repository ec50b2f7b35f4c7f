//! Shell-wrapping launcher for interpreters that cannot take a working
//! directory separately from the command.

use super::{DirectLauncher, LaunchPlan};
use crate::command::CommandSpec;
use std::path::Path;

/// Wraps commands as `<shell> /c cd /d <dir> && <command...>`.
#[derive(Debug, Clone)]
pub struct ShellWrappingLauncher {
    shell: String,
    inner: DirectLauncher,
}

impl ShellWrappingLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            inner: DirectLauncher,
        }
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    pub fn prepare(&self, command: &CommandSpec, working_dir: Option<&Path>) -> LaunchPlan {
        let Some(dir) = working_dir else {
            return self.inner.prepare(command, None);
        };

        let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        let wrapped = CommandSpec::new(self.shell.as_str())
            .args(["/c", "cd", "/d"])
            .arg(dir.to_string_lossy())
            .arg("&&")
            .args(command.to_argv());

        // The shell changes directory itself; the spawn uses the caller's cwd.
        self.inner.prepare(&wrapped, None)
    }
}
