// src/cmd/mod.rs

//! Supervised execution of a single external command.
//!
//! A [`Cmd`] owns one eventual OS process. Configure it with the builder
//! methods, start it with [`Cmd::run`] or [`Cmd::run_with`], then read the
//! captured output through the accessors.
//!
//! The child is placed in its own process group; on timeout or
//! cancellation the whole group is signalled, so pipelines and grandchild
//! processes go down with it. A non-zero exit status is not an error:
//! check [`Cmd::exit_code`] after a successful run.

mod context;
mod sink;

pub use context::{CancelHandle, RunContext};

use std::future::pending;
use std::io::Write;
use std::mem;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{debug, warn};

use self::context::CancelCause;
use self::sink::{MultiWriter, SharedBuf};
use crate::errors::{Result, RunError};
use crate::platform;

/// Timeout applied to every new [`Cmd`] until overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

enum Launch {
    /// Run the command text through the platform shell.
    Shell,
    /// Run the command text through an explicit shell program.
    ShellOverride {
        program: String,
        base_args: Vec<String>,
    },
    /// Exec a program and argument vector directly.
    Raw { program: String, args: Vec<String> },
}

/// Why the race against the child was lost.
enum StopCause {
    Timeout(Duration),
    Deadline,
    Canceled,
}

/// A single supervised command: configuration, execution, captured output.
pub struct Cmd {
    command: String,
    launch: Launch,
    /// Ordered `KEY=VALUE` pairs. Duplicates are allowed; the last
    /// occurrence of a key wins at exec time.
    env: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Option<Duration>,
    #[cfg(unix)]
    identity: Option<platform::Identity>,
    stdout_sinks: Vec<Box<dyn Write + Send>>,
    stderr_sinks: Vec<Box<dyn Write + Send>>,
    stdout_buf: SharedBuf,
    stderr_buf: SharedBuf,
    combined_buf: SharedBuf,
    executed: bool,
    exit_code: i32,
}

impl Cmd {
    /// A command interpreted by the platform shell (`/bin/sh -c` on Unix,
    /// `cmd.exe /C` on Windows).
    ///
    /// The ambient environment is captured here, once; later
    /// [`Cmd::env`] calls append to that snapshot and the child sees the
    /// snapshot, not whatever the environment looks like at spawn time.
    pub fn new(command: impl Into<String>) -> Self {
        Self::with_launch(command.into(), Launch::Shell)
    }

    /// A program exec'd directly with `args`, bypassing the shell.
    pub fn raw(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let program = program.into();
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let display = std::iter::once(program.clone())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");
        Self::with_launch(display, Launch::Raw { program, args })
    }

    fn with_launch(command: String, launch: Launch) -> Self {
        Self {
            command,
            launch,
            // vars_os, not vars: vars() panics on non-UTF-8 entries,
            // which are legal on Unix.
            env: std::env::vars_os()
                .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
                .collect(),
            working_dir: None,
            timeout: Some(DEFAULT_TIMEOUT),
            #[cfg(unix)]
            identity: None,
            stdout_sinks: Vec::new(),
            stderr_sinks: Vec::new(),
            stdout_buf: SharedBuf::new(),
            stderr_buf: SharedBuf::new(),
            combined_buf: SharedBuf::new(),
            executed: false,
            exit_code: 0,
        }
    }

    /// Interpret the command text with `program` instead of the platform
    /// shell, e.g. `/bin/bash` with `["-c"]`. The command text is appended
    /// as the final argument.
    pub fn shell(
        mut self,
        program: impl Into<String>,
        base_args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.launch = Launch::ShellOverride {
            program: program.into(),
            base_args: base_args.into_iter().map(Into::into).collect(),
        };
        self
    }

    /// Maximum run time before the process group is terminated. A zero
    /// duration disables the timeout entirely.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { None } else { Some(timeout) };
        self
    }

    /// Let the command run until it finishes or the context fires.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    /// Working directory for the child.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Append `KEY=VALUE` to the captured environment.
    ///
    /// `${VAR}` references in `value` are expanded against the captured
    /// sequence before appending (last occurrence of a key wins; unknown
    /// variables expand to the empty string).
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let value = expand_env(value.as_ref(), &self.env);
        self.env.push(format!("{}={}", key.as_ref(), value));
        self
    }

    /// Drop the captured environment; the child starts from an empty one.
    pub fn env_clear(mut self) -> Self {
        self.env.clear();
        self
    }

    /// Attach an extra stdout sink, written synchronously as chunks
    /// arrive. A [`LineStream`](crate::LineStream) gives line-by-line
    /// access while the process runs.
    pub fn stdout_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.stdout_sinks.push(Box::new(writer));
        self
    }

    /// Attach an extra stderr sink.
    pub fn stderr_writer(mut self, writer: impl Write + Send + 'static) -> Self {
        self.stderr_sinks.push(Box::new(writer));
        self
    }

    /// Mirror child output to this process's stdout and stderr as well.
    /// The stream handles are captured now, at configuration time.
    pub fn std_streams(mut self) -> Self {
        self.stdout_sinks.push(Box::new(std::io::stdout()));
        self.stderr_sinks.push(Box::new(std::io::stderr()));
        self
    }

    /// Run the child under different credentials.
    #[cfg(unix)]
    pub fn identity(mut self, identity: platform::Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// [`Cmd::run_with`] under a context that never fires on its own.
    pub async fn run(&mut self) -> Result<()> {
        self.run_with(RunContext::new()).await
    }

    /// Start the child and supervise it until completion or cancellation.
    ///
    /// The configured timeout only applies when `ctx` carries no deadline
    /// of its own; a caller deadline always wins. On cancellation the
    /// whole process group is sent a termination signal and the error
    /// reports the cancellation's origin. A non-zero exit status is not an
    /// error; read it with [`Cmd::exit_code`].
    ///
    /// Panics when called on a `Cmd` that has already run: one `Cmd` owns
    /// one process.
    pub async fn run_with(&mut self, ctx: RunContext) -> Result<()> {
        if self.executed {
            panic!("cannot run the same Cmd twice");
        }

        let mut command = self.build_command();
        let derived = if ctx.has_deadline() { None } else { self.timeout };

        let mut child = command.spawn().map_err(RunError::Start)?;
        let pid = match child.id() {
            Some(pid) => pid,
            None => {
                return Err(RunError::Start(std::io::Error::other(
                    "spawned child has no pid",
                )));
            }
        };
        debug!(pid, command = %self.command, "spawned");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let extra_out = mem::take(&mut self.stdout_sinks);
        let extra_err = mem::take(&mut self.stderr_sinks);
        let out_sinks = self.bundle(self.stdout_buf.clone(), extra_out);
        let err_sinks = self.bundle(self.stderr_buf.clone(), extra_err);

        // One background task per run: it reaps the child and drains both
        // pipes, then reports through a single-slot channel. After a
        // cancellation it keeps running so the child still gets reaped and
        // late output still reaches the buffers.
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (status, (), ()) = tokio::join!(
                child.wait(),
                drain(stdout, out_sinks, "stdout"),
                drain(stderr, err_sinks, "stderr"),
            );
            let _ = done_tx.send(status);
        });

        let result = tokio::select! {
            res = done_rx => match res {
                Ok(Ok(status)) => {
                    if let Some(code) = status.code() {
                        self.exit_code = code;
                    }
                    debug!(pid, code = self.exit_code, "command finished");
                    Ok(())
                }
                Ok(Err(e)) => Err(RunError::Wait(e)),
                Err(_) => Err(RunError::Wait(std::io::Error::other(
                    "wait task ended without reporting",
                ))),
            },
            cause = cancel_fired(derived, ctx) => self.terminate(pid, cause).await,
        };
        self.executed = true;
        result
    }

    /// True once a run attempt got past process start.
    pub fn executed(&self) -> bool {
        self.executed
    }

    /// Captured stdout as text.
    ///
    /// Panics when the command has not run.
    pub fn stdout(&self) -> String {
        self.check_executed("stdout");
        self.stdout_buf.to_string_lossy()
    }

    /// Captured stderr as text.
    ///
    /// Panics when the command has not run.
    pub fn stderr(&self) -> String {
        self.check_executed("stderr");
        self.stderr_buf.to_string_lossy()
    }

    /// Both streams interleaved in the order their chunks arrived.
    ///
    /// Panics when the command has not run.
    pub fn combined(&self) -> String {
        self.check_executed("combined output");
        self.combined_buf.to_string_lossy()
    }

    /// Exit code of the finished process. Stays 0 when the process was
    /// killed by a signal.
    ///
    /// Panics when the command has not run.
    pub fn exit_code(&self) -> i32 {
        self.check_executed("exit code");
        self.exit_code
    }

    fn check_executed(&self, what: &str) {
        if !self.executed {
            panic!("cannot read {what} before the command has run");
        }
    }

    fn build_command(&self) -> Command {
        let mut command = match &self.launch {
            Launch::Shell => platform::shell_command(&self.command),
            Launch::ShellOverride { program, base_args } => {
                let mut c = Command::new(program);
                c.args(base_args).arg(&self.command);
                c
            }
            Launch::Raw { program, args } => {
                let mut c = Command::new(program);
                c.args(args);
                c
            }
        };

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env_clear()
            .envs(self.env.iter().filter_map(|kv| kv.split_once('=')));
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        platform::set_process_group(&mut command);
        #[cfg(unix)]
        if let Some(identity) = self.identity {
            platform::apply_identity(&mut command, identity);
        }
        command
    }

    /// Buffers first, then caller sinks, so the buffers always see a chunk
    /// before a caller sink can fail the write.
    fn bundle(&self, own: SharedBuf, extras: Vec<Box<dyn Write + Send>>) -> MultiWriter {
        let mut sinks: Vec<Box<dyn Write + Send>> = vec![
            Box::new(own),
            Box::new(self.combined_buf.clone()),
        ];
        sinks.extend(extras);
        MultiWriter::new(sinks)
    }

    async fn terminate(&self, pid: u32, cause: StopCause) -> Result<()> {
        debug!(pid, command = %self.command, "terminating process group");
        if let Err(e) = platform::terminate_group(pid).await {
            warn!(pid, error = %e, "failed to signal process group");
            return Err(RunError::Signal { pid, source: e });
        }
        match cause {
            StopCause::Timeout(d) => Err(RunError::Timeout(d)),
            StopCause::Deadline => Err(RunError::DeadlineExceeded),
            StopCause::Canceled => Err(RunError::Canceled),
        }
    }
}

/// Resolve when either the derived timeout or the caller's context fires,
/// reporting which one it was.
async fn cancel_fired(derived: Option<Duration>, ctx: RunContext) -> StopCause {
    let timeout = async {
        match derived {
            Some(d) => {
                sleep(d).await;
                d
            }
            None => pending::<Duration>().await,
        }
    };
    tokio::select! {
        d = timeout => StopCause::Timeout(d),
        cause = ctx.done() => match cause {
            CancelCause::Deadline => StopCause::Deadline,
            CancelCause::Canceled => StopCause::Canceled,
        },
    }
}

/// Read a pipe to EOF, fanning each chunk out to the stream's sinks. A
/// sink error stops capture for this stream; dropping the pipe makes a
/// child that keeps writing see a closed descriptor.
async fn drain<R>(pipe: Option<R>, mut sinks: MultiWriter, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let Some(mut pipe) = pipe else { return };
    let mut chunk = [0u8; 8192];
    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                if let Err(e) = sinks.write_all(&chunk[..n]) {
                    warn!(stream, error = %e, "output sink failed; capture stopped");
                    return;
                }
            }
            Err(e) => {
                warn!(stream, error = %e, "failed to read child output");
                return;
            }
        }
    }
    if let Err(e) = sinks.flush() {
        debug!(stream, error = %e, "failed to flush output sinks");
    }
}

/// Expand `${VAR}` references in `value` against an ordered `KEY=VALUE`
/// sequence. The last occurrence of a key wins; unknown variables expand
/// to the empty string.
fn expand_env(value: &str, env: &[String]) -> String {
    if !value.contains("${") {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(open) = rest.find("${") {
        out.push_str(&rest[..open]);
        match rest[open + 2..].find('}') {
            Some(close) => {
                let key = &rest[open + 2..open + 2 + close];
                if let Some(found) = lookup(env, key) {
                    out.push_str(found);
                }
                rest = &rest[open + 2 + close + 1..];
            }
            None => {
                // Unterminated reference; keep the text as written.
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn lookup<'a>(env: &'a [String], key: &str) -> Option<&'a str> {
    env.iter().rev().find_map(|kv| {
        kv.split_once('=')
            .filter(|(k, _)| *k == key)
            .map(|(_, v)| v)
    })
}
