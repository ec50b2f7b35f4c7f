//! Launch strategies.
//!
//! A [`Launcher`] turns a [`CommandSpec`], an optional environment, and an
//! optional working directory into a running child process:
//!
//! - **Direct**: spawns the command as given, preferring an executable found
//!   in the working directory over one found on the search path.
//! - **ShellWrapping**: for command interpreters that cannot take a working
//!   directory separately, rewrites the command into
//!   `<shell> /c cd /d <dir> && <command...>` and hands it to Direct.
//!
//! The variant is chosen once from an [`OsFamily`] value.
//!
//! Launching is split into [`Launcher::prepare`] (pure argv rewriting) and a
//! spawn step, so the rewriting can be checked without creating processes.

mod direct;
mod shell;

#[cfg(test)]
mod tests;

pub use direct::DirectLauncher;
pub use shell::ShellWrappingLauncher;

use crate::command::{CommandSpec, Environment};
use crate::error::Result;
use crate::os::OsFamily;
use std::path::{Path, PathBuf};
use std::process::Child;
use tracing::info;

/// Shell used by the shell-wrapping launcher unless configured otherwise.
pub const DEFAULT_SHELL: &str = "cmd";

/// The command and working directory that will actually be spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub command: CommandSpec,
    pub working_dir: Option<PathBuf>,
}

/// Launch strategy, selected by OS family.
#[derive(Debug, Clone)]
pub enum Launcher {
    Direct(DirectLauncher),
    ShellWrapping(ShellWrappingLauncher),
}

impl Launcher {
    /// Pick the launcher for the given OS family.
    pub fn for_family(family: OsFamily) -> Self {
        Self::for_family_with_shell(family, DEFAULT_SHELL)
    }

    /// Like [`Launcher::for_family`], with a custom wrapping shell.
    pub fn for_family_with_shell(family: OsFamily, shell: &str) -> Self {
        match family {
            OsFamily::Unix => Launcher::Direct(DirectLauncher),
            OsFamily::Windows => Launcher::ShellWrapping(ShellWrappingLauncher::new(shell)),
        }
    }

    /// Rewrite the command for this launcher without spawning anything.
    pub fn prepare(&self, command: &CommandSpec, working_dir: Option<&Path>) -> LaunchPlan {
        match self {
            Launcher::Direct(direct) => direct.prepare(command, working_dir),
            Launcher::ShellWrapping(shell) => shell.prepare(command, working_dir),
        }
    }

    /// Start the command with all three standard streams piped.
    ///
    /// `env` replaces the child's environment when given; `None` inherits
    /// the caller's. Spawn errors come back as [`crate::ExecError::Launch`].
    pub fn launch(
        &self,
        command: &CommandSpec,
        env: Option<&Environment>,
        working_dir: Option<&Path>,
    ) -> Result<Child> {
        let plan = self.prepare(command, working_dir);

        info!(
            program = %plan.command.executable(),
            args = ?plan.command.arguments(),
            cwd = ?plan.working_dir,
            inherit_env = env.is_none(),
            "launching process"
        );

        DirectLauncher::spawn(&plan, env)
    }
}
