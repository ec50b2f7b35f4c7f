//! CLI argument parsing for runexec.
//!
//! Uses clap derive macros for declarative argument definitions. The CLI
//! only translates flags into an [`ExecutorConfig`], a [`CommandSpec`], and
//! an optional environment; execution lives in the library.

use anyhow::Context;
use clap::{ArgAction, ArgGroup, Parser};
use runexec::logging::LogLevel;
use runexec::{CommandSpec, Environment, ExecutorConfig};
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::warn;

/// Run an external command with a timeout, exit-code policy, and stream
/// routing.
///
/// The command is given either as trailing arguments or as a single string
/// via `--cmd`, which is split using shell quoting rules:
///
///   runexec --timeout-ms 5000 -- make test
///   runexec --cmd "sh -c 'echo \"hello world\"'"
#[derive(Parser, Debug)]
#[command(name = "runexec")]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("target").required(true).args(["cmd", "program"])))]
pub struct Cli {
    /// Command line as one string, split with shell quoting rules.
    #[arg(long, value_name = "STRING")]
    pub cmd: Option<String>,

    /// Kill the command after this many milliseconds.
    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Working directory for the command.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Exit code that counts as success (repeatable; default: 0 only).
    #[arg(
        long = "exit-value",
        value_name = "CODE",
        action = ArgAction::Append,
        allow_negative_numbers = true,
        conflicts_with = "ignore_exit_values"
    )]
    pub exit_values: Vec<i32>,

    /// Accept any exit code.
    #[arg(long)]
    pub ignore_exit_values: bool,

    /// Set an environment variable for the command (repeatable).
    ///
    /// Applied on top of the inherited environment.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair, action = ArgAction::Append)]
    pub env: Vec<(String, String)>,

    /// Feed this file to the command's stdin. Without it, stdin is closed.
    #[arg(long, value_name = "FILE")]
    pub stdin_file: Option<PathBuf>,

    /// Emit the command's output as log lines instead of passing it through.
    #[arg(long)]
    pub log_output: bool,

    /// Print an execution report as JSON on stdout when done.
    #[arg(long)]
    pub json: bool,

    /// Load executor settings from a YAML file. Flags override it.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level (overrides RUNEXEC_LOG).
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Program to run, followed by its arguments.
    #[arg(value_name = "PROGRAM", trailing_var_arg = true, allow_hyphen_values = true)]
    pub program: Vec<String>,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Config file (if any) with command-line overrides applied, validated.
    pub fn executor_config(&self) -> runexec::Result<ExecutorConfig> {
        let mut config = match &self.config {
            Some(path) => ExecutorConfig::load(path)?,
            None => ExecutorConfig::default(),
        };

        if let Some(ms) = self.timeout_ms {
            config.timeout_ms = Some(ms);
        }
        if let Some(dir) = &self.cwd {
            config.working_dir = Some(dir.clone());
        }
        if !self.exit_values.is_empty() {
            config.exit_values = Some(self.exit_values.clone());
            config.ignore_exit_values = false;
        }
        if self.ignore_exit_values {
            config.ignore_exit_values = true;
            config.exit_values = None;
        }

        config.validate()?;
        Ok(config)
    }

    /// The command to run.
    pub fn command_spec(&self) -> anyhow::Result<CommandSpec> {
        let argv = match &self.cmd {
            Some(line) => shell_words::split(line)
                .with_context(|| format!("failed to parse --cmd '{}'", line))?,
            None => self.program.clone(),
        };

        CommandSpec::from_argv(argv).context("no command given")
    }

    /// Environment for the command, or `None` to inherit unchanged.
    pub fn environment(&self) -> Option<Environment> {
        if self.env.is_empty() {
            return None;
        }

        Some(merge_environment(std::env::vars_os(), &self.env))
    }
}

/// Inherited variables with `overrides` applied on top.
///
/// Variables whose name or value is not valid UTF-8 cannot be represented
/// and are dropped with a warning.
fn merge_environment<I>(inherited: I, overrides: &[(String, String)]) -> Environment
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut env = Environment::new();
    for (key, value) in inherited {
        match (key.into_string(), value.into_string()) {
            (Ok(key), Ok(value)) => {
                env.insert(key, value);
            }
            (Ok(key), Err(_)) => {
                warn!(variable = %key, "dropping inherited variable with non-UTF-8 value");
            }
            (Err(key), _) => {
                warn!(variable = ?key, "dropping inherited variable with non-UTF-8 name");
            }
        }
    }

    for (key, value) in overrides {
        env.insert(key.clone(), value.clone());
    }
    env
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}
