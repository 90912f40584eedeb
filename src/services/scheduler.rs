//! Per-session delayed transitions: each session has at most one pending
//! timer, and scheduling a new one supersedes the old.

use std::{future::Future, time::Duration};

use dashmap::DashMap;
use tokio::task::AbortHandle;
use tokio::time::sleep;

/// Schedules at most one pending delayed transition per session pin.
///
/// Superseding or cancelling aborts the old task, but abort is advisory: the
/// orchestrator still re-validates the session phase inside every timer
/// callback, so a timer that slips through fires as a no-op.
#[derive(Default)]
pub struct Scheduler {
    pending: DashMap<String, AbortHandle>,
}

impl Scheduler {
    /// Create a scheduler with no pending transitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `transition` after `delay`, superseding any transition already
    /// pending for `pin`.
    pub fn schedule<F>(&self, pin: &str, delay: Duration, transition: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            transition.await;
        });

        if let Some(previous) = self.pending.insert(pin.to_string(), handle.abort_handle()) {
            previous.abort();
        }
    }

    /// Cancel the pending transition for `pin`, if any.
    pub fn cancel(&self, pin: &str) {
        if let Some((_, handle)) = self.pending.remove(pin) {
            handle.abort();
        }
    }

    /// Number of sessions with a transition pending (finished tasks included
    /// until superseded or cancelled).
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
