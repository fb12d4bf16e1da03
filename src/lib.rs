// src/lib.rs

pub mod cli;
pub mod cmd;
pub mod errors;
pub mod logging;
pub mod platform;
pub mod shellquote;
pub mod stream;

pub use cmd::{CancelHandle, Cmd, DEFAULT_TIMEOUT, RunContext};
pub use errors::{Result, RunError};
pub use stream::{DEFAULT_LINE_BUFFER_SIZE, LineBufferOverflow, LineStream};

use anyhow::Context;
use tracing::info;

use crate::cli::{CliArgs, EnvConfig};

/// High-level entry point used by `main.rs`.
///
/// Wires together the environment configuration (`TIMEOUT`, `WORKING_DIR`,
/// `LINES`, `NOSH`), shell quoting of the argv, a supervised [`Cmd`] run
/// and the final output report.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let cfg = EnvConfig::from_env()?;

    let mut cmd = if cfg.no_shell {
        let (program, rest) = args.command.split_first().context("no command given")?;
        Cmd::raw(program, rest.to_vec())
    } else {
        Cmd::new(shellquote::quote(&args.command)?)
    };

    if let Some(timeout) = cfg.timeout {
        cmd = cmd.timeout(timeout);
    }
    if let Some(dir) = cfg.working_dir {
        cmd = cmd.working_dir(dir);
    }
    if cfg.lines {
        cmd = cmd.stdout_writer(LineStream::new(|line| info!("line: {line}")));
    }

    cmd.run().await?;

    println!("stdout: {}", cmd.stdout());
    println!("stderr: {}", cmd.stderr());
    println!("exit code: {}", cmd.exit_code());
    Ok(())
}

/// Run `command` through the platform shell and return its stdout.
///
/// Any stderr output is treated as an error, even when the process exits
/// zero. For finer control build a [`Cmd`] directly.
pub async fn output(command: &str) -> Result<String> {
    let mut cmd = Cmd::new(command);
    cmd.run().await?;
    let stderr = cmd.stderr();
    if !stderr.is_empty() {
        return Err(RunError::Stderr(stderr));
    }
    Ok(cmd.stdout())
}
