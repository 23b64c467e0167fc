//! One-shot readiness signal for first-run setup.
//!
//! Refresh runs must not proceed while initial setup is still running. The
//! gate is a watch channel: waiters suspend until the flag flips to ready,
//! with no sleep-loop polling anywhere.

use tokio::sync::watch;

/// One-shot completion signal; starts ready unless first-run setup is due.
#[derive(Debug)]
pub struct SetupGate {
    ready: watch::Sender<bool>,
}

impl SetupGate {
    /// Create a gate; `ready` is `false` while first-run setup is pending.
    #[must_use]
    pub fn new(ready: bool) -> Self {
        let (tx, _rx) = watch::channel(ready);
        Self { ready: tx }
    }

    /// Flip the gate open. Idempotent; wakes all current waiters.
    pub fn mark_ready(&self) {
        let _ = self.ready.send(true);
    }

    /// Whether the gate is currently open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Suspend until the gate opens; returns immediately when already open.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // wait_for errors only when the sender is dropped; we own it.
        let _ = rx.wait_for(|ready| *ready).await;
    }
}
