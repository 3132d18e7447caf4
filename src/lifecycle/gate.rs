//! Fire-once readiness barrier over a fixed set of named preconditions.
//!
//! # State Transitions
//! ```text
//! pending = {all preconditions}
//! complete(id) → pending.remove(id)
//! pending becomes empty → ready (once) → run every on_ready callback
//! ```
//!
//! # Design Decisions
//! - The precondition set is fixed at construction; unknown ids are rejected
//! - Completing an id twice is a no-op
//! - The empty-set check, the `fired` flip and the signal close happen
//!   under one lock, so exactly one caller dispatches the callbacks
//! - Callbacks run outside the lock so they may call back into the gate

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

use crate::lifecycle::signal::{Signal, SignalListener};

/// Precondition closed by the liveness probe once the router answers.
pub const ROUTES_DEPLOYED: &str = "routes-deployed";

/// Precondition closed once historical events have been replayed.
pub const REPLAY_COMPLETE: &str = "replay-complete";

type ReadyCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("unknown precondition `{0}`")]
    UnknownPrecondition(String),
}

struct GateState {
    known: HashSet<String>,
    pending: HashSet<String>,
    fired: bool,
    callbacks: Vec<ReadyCallback>,
}

/// Barrier that becomes ready once every precondition has completed.
pub struct ReadinessGate {
    state: Mutex<GateState>,
    ready: Signal,
}

impl ReadinessGate {
    /// Create a gate over the given preconditions.
    ///
    /// A gate with no preconditions is ready immediately.
    pub fn new<I, S>(preconditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known: HashSet<String> = preconditions.into_iter().map(Into::into).collect();
        let ready = Signal::new();
        let fired = known.is_empty();
        if fired {
            ready.close();
        }

        Self {
            state: Mutex::new(GateState {
                pending: known.clone(),
                known,
                fired,
                callbacks: Vec::new(),
            }),
            ready,
        }
    }

    /// The two preconditions a service bootstrap waits on.
    pub fn for_bootstrap() -> Self {
        Self::new([REPLAY_COMPLETE, ROUTES_DEPLOYED])
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark a precondition complete.
    ///
    /// Returns `Ok(true)` when this call made the gate ready.
    pub fn complete(&self, id: &str) -> Result<bool, GateError> {
        let callbacks = {
            let mut state = self.lock();
            if !state.known.contains(id) {
                return Err(GateError::UnknownPrecondition(id.to_string()));
            }
            if !state.pending.remove(id) {
                tracing::debug!(precondition = id, "Precondition already complete");
                return Ok(false);
            }
            tracing::info!(
                precondition = id,
                outstanding = state.pending.len(),
                "Precondition complete"
            );
            if !state.pending.is_empty() || state.fired {
                return Ok(false);
            }
            state.fired = true;
            self.ready.close();
            std::mem::take(&mut state.callbacks)
        };

        tracing::info!(callbacks = callbacks.len(), "Readiness gate open");
        for callback in callbacks {
            callback();
        }
        Ok(true)
    }

    /// Run `callback` once the gate is ready, or right away if it already is.
    pub fn on_ready<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut state = self.lock();
            if !state.fired {
                state.callbacks.push(Box::new(callback));
                return;
            }
        }
        callback();
    }

    /// Whether every precondition has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.is_closed()
    }

    /// Preconditions still outstanding, sorted by name.
    pub fn pending(&self) -> Vec<String> {
        let mut pending: Vec<String> = self.lock().pending.iter().cloned().collect();
        pending.sort();
        pending
    }

    /// Wait until the gate is ready.
    pub async fn ready(&self) {
        self.ready.closed().await
    }

    /// Read-only view of the ready signal.
    pub fn listener(&self) -> SignalListener {
        self.ready.listener()
    }
}

impl fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("ready", &self.is_ready())
            .field("pending", &self.pending())
            .finish()
    }
}
