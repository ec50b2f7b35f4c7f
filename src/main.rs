//! runexec: run an external command with a timeout and exit-code policy.
//!
//! This is the main entry point for the `runexec` CLI. It parses arguments,
//! runs the command through the library's executor, and maps the outcome to
//! an exit code.

mod cli;

use anyhow::{Context, Result};
use cli::Cli;
use runexec::pump::log_lines;
use runexec::{ExecError, StreamKind, StreamRouter, exit_codes, logging};
use std::fs::File;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse_args();

    if let Err(err) = logging::init_logging(cli.log_level) {
        eprintln!("Warning: {:#}", err);
    }

    match run(&cli) {
        Ok(code) => to_exit_code(code),
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {:#}", err);

            let code = err
                .downcast_ref::<ExecError>()
                .map(ExecError::exit_code)
                .unwrap_or(exit_codes::USAGE_ERROR);
            to_exit_code(code)
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    let config = cli.executor_config()?;
    let command = cli.command_spec()?;
    let env = cli.environment();
    let router = config.apply_to(build_router(cli)?);

    let result = config.executor().execute(&command, env.as_ref(), router);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.report())?);
    }

    Ok(match &result.error {
        Some(err) => {
            eprintln!("Error: {}", err);
            err.exit_code()
        }
        None if result.killed_by_timeout => exit_codes::TIMEOUT,
        None => result.exit_code,
    })
}

fn build_router(cli: &Cli) -> Result<StreamRouter> {
    let router = if cli.log_output {
        StreamRouter::new(log_lines(StreamKind::Stdout), log_lines(StreamKind::Stderr))
    } else {
        StreamRouter::inherit()
    };

    match &cli.stdin_file {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open stdin file '{}'", path.display()))?;
            Ok(router.with_stdin(file))
        }
        None => Ok(router),
    }
}

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(exit_codes::INTERNAL_FAILURE as u8))
}
