// src/cmd/context.rs

//! Cancellation contexts for command runs.

use std::future::pending;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, sleep_until};

/// Which of a context's sources fired.
pub(crate) enum CancelCause {
    Deadline,
    Canceled,
}

/// Deadline and cancellation signal for a single [`Cmd::run_with`] call.
///
/// A fresh context never fires on its own. Add a deadline with
/// [`RunContext::deadline`] or [`RunContext::timeout`], or obtain an
/// explicit kill switch with [`RunContext::cancellable`]. When a context
/// carries a deadline, the command's own configured timeout is ignored for
/// that run; the caller's deadline wins.
///
/// [`Cmd::run_with`]: crate::Cmd::run_with
pub struct RunContext {
    deadline: Option<Instant>,
    canceled: Option<oneshot::Receiver<()>>,
}

impl RunContext {
    /// A context that never fires.
    pub fn new() -> Self {
        Self {
            deadline: None,
            canceled: None,
        }
    }

    /// A context with an explicit cancellation handle.
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = oneshot::channel();
        let ctx = Self {
            deadline: None,
            canceled: Some(rx),
        };
        (ctx, CancelHandle { tx })
    }

    /// Fire once `at` is reached.
    pub fn deadline(mut self, at: Instant) -> Self {
        self.deadline = Some(at);
        self
    }

    /// Fire once `after` has elapsed, measured from now.
    pub fn timeout(self, after: Duration) -> Self {
        self.deadline(Instant::now() + after)
    }

    pub(crate) fn has_deadline(&self) -> bool {
        self.deadline.is_some()
    }

    /// Resolve when the context fires; pend forever when it cannot.
    pub(crate) async fn done(self) -> CancelCause {
        let deadline = async {
            match self.deadline {
                Some(at) => sleep_until(at).await,
                None => pending::<()>().await,
            }
        };
        let canceled = async {
            match self.canceled {
                Some(rx) => {
                    if rx.await.is_err() {
                        // Handle dropped without cancelling: this source can
                        // no longer fire.
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };
        tokio::select! {
            _ = deadline => CancelCause::Deadline,
            _ = canceled => CancelCause::Canceled,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Fires the cancellation signal of the [`RunContext`] it was created with.
pub struct CancelHandle {
    tx: oneshot::Sender<()>,
}

impl CancelHandle {
    /// Cancel the associated run. Has no effect once the run has finished.
    pub fn cancel(self) {
        let _ = self.tx.send(());
    }
}
