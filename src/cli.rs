// src/cli.rs

//! CLI argument parsing using `clap`, plus the environment-variable
//! configuration surface.
//!
//! Apart from logging, the tool is configured through environment
//! variables: `TIMEOUT`, `WORKING_DIR`, `LINES=1` and `NOSH=1`. The
//! command itself is passed as trailing arguments.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};

/// Command-line arguments for `runcmd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runcmd",
    version,
    about = "Run one command under supervision: capture output, enforce timeouts.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNCMD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Command to execute (quoted for the shell unless NOSH=1).
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Configuration read from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    /// `TIMEOUT`: maximum run time; `0` disables the default timeout.
    pub timeout: Option<Duration>,
    /// `WORKING_DIR`: child working directory.
    pub working_dir: Option<PathBuf>,
    /// `LINES=1`: log each output line as it arrives.
    pub lines: bool,
    /// `NOSH=1`: exec the argv directly instead of going through the shell.
    pub no_shell: bool,
}

impl EnvConfig {
    /// Read `TIMEOUT`, `WORKING_DIR`, `LINES` and `NOSH` from the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        let timeout = match std::env::var("TIMEOUT") {
            Ok(raw) => {
                Some(parse_duration(&raw).map_err(|e| anyhow!("invalid TIMEOUT '{raw}': {e}"))?)
            }
            Err(_) => None,
        };
        let working_dir = std::env::var("WORKING_DIR").ok().map(PathBuf::from);
        Ok(Self {
            timeout,
            working_dir,
            lines: flag_set("LINES"),
            no_shell: flag_set("NOSH"),
        })
    }
}

fn flag_set(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v == "1")
}

/// Parse a duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
///
/// A bare `"0"` is accepted; everything else needs a unit suffix.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = match s.chars().position(|c| !c.is_ascii_digit()) {
        Some(idx) => idx,
        None => {
            return if s.chars().all(|c| c == '0') {
                Ok(Duration::ZERO)
            } else {
                Err("duration missing unit suffix".to_string())
            };
        }
    };

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
