// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RunError {
    /// The process could not be started at all. The command never ran and
    /// the output accessors stay unreadable.
    #[error("failed to start command: {0}")]
    Start(#[source] std::io::Error),

    /// The configured run timeout elapsed and the process group was
    /// signalled.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The caller-supplied deadline elapsed before the command finished.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// The caller cancelled the run before the command finished.
    #[error("context canceled")]
    Canceled,

    /// Cancellation fired but the termination signal could not be
    /// delivered to the process group.
    #[error("timeout, kill {pid}: {source}")]
    Signal {
        pid: u32,
        source: std::io::Error,
    },

    /// Waiting on a started process failed for a reason other than a
    /// non-zero exit (those are not errors).
    #[error("failed to wait for command: {0}")]
    Wait(#[source] std::io::Error),

    /// The one-shot helper treats any stderr output as a failure.
    #[error("command wrote to stderr: {0}")]
    Stderr(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RunError>;
