//! Abort control for a running supervisor.
//!
//! The supervisor sleeps between directory samples and between relaunches.
//! A `SupervisorControl` lets another task (the CLI's Ctrl-C handler) cut
//! those sleeps short; the supervisor then terminates the child and returns
//! `Outcome::Aborted`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

/// Shared abort token with a wake-up for the supervisor's sleeps.
#[derive(Debug, Default)]
pub struct SupervisorControl {
    aborted: AtomicBool,
    wake: Notify,
}

impl SupervisorControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request abort. Idempotent; wakes a sleeping supervisor.
    pub fn request_abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);
        // notify_one stores a permit when nobody is waiting yet.
        self.wake.notify_one();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless an abort arrives first.
    /// Returns `true` when the full duration elapsed without an abort.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_aborted() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_aborted(),
            _ = self.wake.notified() => false,
        }
    }

    /// Resolve once an abort has been requested.
    pub async fn aborted(&self) {
        while !self.is_aborted() {
            self.wake.notified().await;
        }
    }
}
