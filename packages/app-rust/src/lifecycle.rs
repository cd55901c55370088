//! Process-wide collection slot.
//!
//! Wraps the pure [`LifecycleState`] machine in an `ArcSwap` so the busy check
//! and the `Idle -> Running` transition happen as one compare-and-swap, and
//! publishes every change on a `watch` channel for the UI layer.

use std::sync::Arc;

use arc_swap::ArcSwap;
use coletor_core::{Busy, BusyAffordances, ExitDecision, JobKind, LifecycleState};
use tokio::sync::watch;
use tracing::{info, warn};

/// Owner of the single collection slot shared by both job kinds.
#[derive(Debug)]
pub struct LifecycleController {
    state: Arc<ArcSwap<LifecycleState>>,
    changes: watch::Sender<LifecycleState>,
}

impl LifecycleController {
    /// Creates a controller in the `Idle` state.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LifecycleState::Idle);
        Self {
            state: Arc::new(ArcSwap::from_pointee(LifecycleState::Idle)),
            changes: tx,
        }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        **self.state.load()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    /// Receiver notified on every state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.changes.subscribe()
    }

    /// Claims the slot for `kind` if it is idle.
    ///
    /// # Errors
    ///
    /// Returns [`Busy`] with the running kind when the slot is taken.
    pub fn try_begin(&self, kind: JobKind) -> Result<(), Busy> {
        loop {
            let current = self.state.load();
            let next = (**current).start(kind)?;
            let prev = self.state.compare_and_swap(&*current, Arc::new(next));
            if Arc::ptr_eq(&*current, &*prev) {
                info!(kind = %kind, "collection slot claimed");
                self.publish(next);
                return Ok(());
            }
        }
    }

    /// Frees the slot in response to the engine's completion signal.
    ///
    /// Returns the kind that was running, or `None` when already idle.
    pub fn complete(&self, kind: JobKind) -> Option<JobKind> {
        let released = self.release()?;
        if released == kind {
            info!(kind = %kind, "collection finished");
        } else {
            warn!(running = %released, signalled = %kind, "completion kind differs from running job");
        }
        Some(released)
    }

    /// Frees the slot after a dispatch that never reached the engine.
    pub fn abort(&self, kind: JobKind) -> Option<JobKind> {
        let released = self.release()?;
        warn!(kind = %kind, "collection dispatch failed, slot released");
        Some(released)
    }

    fn release(&self) -> Option<JobKind> {
        loop {
            let current = self.state.load();
            let running = current.running_kind()?;
            let next = current.complete()?;
            let prev = self.state.compare_and_swap(&*current, Arc::new(next));
            if Arc::ptr_eq(&*current, &*prev) {
                self.publish(next);
                return Some(running);
            }
        }
    }

    fn publish(&self, state: LifecycleState) {
        // Receivers may all be gone.
        let _ = self.changes.send(state);
    }

    #[must_use]
    pub fn exit_decision(&self) -> ExitDecision {
        self.state().exit_decision()
    }

    #[must_use]
    pub fn affordances(&self) -> BusyAffordances {
        self.state().affordances()
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}
