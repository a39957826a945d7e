use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// One-shot escalation timer owned by a process entry.
///
/// Fires `on_fire` after `timeout` unless cancelled first. Dropping the timer
/// cancels it, so clearing the owning field on close is enough.
pub(crate) struct KillTimer {
    cancel: Sender<()>,
}

impl KillTimer {
    pub(crate) fn arm<F>(timeout: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(timeout) {
                on_fire();
            }
        });
        Self { cancel }
    }

    pub(crate) fn cancel(self) {
        let _ = self.cancel.send(());
    }
}
