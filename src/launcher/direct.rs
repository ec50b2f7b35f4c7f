//! Direct launcher: hands the command straight to the OS.

use super::LaunchPlan;
use crate::command::{CommandSpec, Environment};
use crate::error::{ExecError, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

/// Spawns commands as given, after working-directory executable lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectLauncher;

impl DirectLauncher {
    pub fn prepare(&self, command: &CommandSpec, working_dir: Option<&Path>) -> LaunchPlan {
        let command = match resolve_in_working_dir(command, working_dir) {
            Some(local) => command
                .clone()
                .with_executable(local.to_string_lossy().into_owned()),
            None => command.clone(),
        };

        LaunchPlan {
            command,
            working_dir: working_dir.map(Path::to_path_buf),
        }
    }

    pub(crate) fn spawn(plan: &LaunchPlan, env: Option<&Environment>) -> Result<Child> {
        let program = plan.command.executable();

        let mut command = Command::new(program);
        command
            .args(plan.command.arguments())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(dir) = &plan.working_dir {
            command.current_dir(dir);
        }

        if let Some(env) = env {
            command.env_clear().envs(env);
        }

        command.spawn().map_err(|e| ExecError::launch(program, e))
    }
}

/// Find a bare executable name inside the working directory.
///
/// Returns the absolute path of `<working_dir>/<name>` when that file exists.
/// Paths, explicit files, and names that already exist relative to the
/// caller's directory are left alone.
fn resolve_in_working_dir(command: &CommandSpec, working_dir: Option<&Path>) -> Option<PathBuf> {
    if command.is_file() {
        return None;
    }

    let dir = working_dir?;
    let name = Path::new(command.executable());
    if name.is_absolute() || name.components().count() != 1 || name.is_file() {
        return None;
    }

    let candidate = dir.join(name);
    if candidate.is_file() {
        std::path::absolute(&candidate).ok()
    } else {
        None
    }
}
