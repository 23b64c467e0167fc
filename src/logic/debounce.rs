//! Cooldown gate that suppresses redundant concurrent refresh triggers.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Timestamp-cooldown re-entrancy guard.
///
/// Holds a single block-until instant. Rejected attempts are dropped, never
/// queued or retried.
#[derive(Debug, Default)]
pub struct RefreshDebouncer {
    /// Attempts before this instant are rejected. `None` until first use.
    block_until: Mutex<Option<Instant>>,
}

impl RefreshDebouncer {
    /// Create an unarmed gate; the first attempt always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// What: Attempt to pass the gate.
    ///
    /// Inputs:
    /// - `cooldown`: Window during which subsequent attempts are rejected
    /// - `forced`: Initial/forced runs bypass the cooldown check
    ///
    /// Output:
    /// - `true` and the gate re-armed when the attempt is accepted; `false`
    ///   with no side effects otherwise.
    pub fn try_enter(&self, cooldown: Duration, forced: bool) -> bool {
        let Ok(mut guard) = self.block_until.lock() else {
            return false;
        };
        let now = Instant::now();
        if !forced
            && let Some(until) = *guard
            && now < until
        {
            return false;
        }
        *guard = Some(now + cooldown);
        true
    }

    /// What: Re-arm the cooldown from "now", e.g. at the end of a run.
    pub fn rearm(&self, cooldown: Duration) {
        if let Ok(mut guard) = self.block_until.lock() {
            *guard = Some(Instant::now() + cooldown);
        }
    }
}
