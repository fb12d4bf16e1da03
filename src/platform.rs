// src/platform.rs

//! Platform-specific command construction and process control.
//!
//! Everything here is selected at build time with `cfg`; the rest of the
//! crate never inspects the operating system at runtime.

use std::io;

use tokio::process::Command;

/// Build a command that runs `text` through the platform shell
/// (`/bin/sh -c` on Unix, `cmd.exe /C` on Windows).
pub fn shell_command(text: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C");
        c
    } else {
        let mut c = Command::new("/bin/sh");
        c.arg("-c");
        c
    };
    cmd.arg(text);
    cmd
}

/// Place the child in its own process group so the whole tree can be
/// signalled together.
#[cfg(unix)]
pub fn set_process_group(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(not(unix))]
pub fn set_process_group(_cmd: &mut Command) {}

/// Send SIGTERM to `pid`'s entire process group.
#[cfg(unix)]
pub async fn terminate_group(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    killpg(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
}

/// Best-effort kill of `pid`'s process tree.
#[cfg(not(unix))]
pub async fn terminate_group(pid: u32) -> io::Result<()> {
    let status = Command::new("taskkill")
        .args(["/pid", &pid.to_string(), "/t", "/f"])
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("taskkill exited with {status}")))
    }
}

/// Credentials the child process runs under.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: Option<u32>,
}

#[cfg(unix)]
impl Identity {
    /// Identity with only the user id set.
    pub fn uid(uid: u32) -> Self {
        Self { uid, gid: None }
    }
}

#[cfg(unix)]
pub(crate) fn apply_identity(cmd: &mut Command, identity: Identity) {
    cmd.uid(identity.uid);
    if let Some(gid) = identity.gid {
        cmd.gid(gid);
    }
}
