//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bind → serve → { liveness probe ∥ replay wait } → gate.rs
//!     gate opens → registration.rs → registry + "started" signal
//!
//! Shutdown (shutdown.rs):
//!     Signal received → stop probe/replay → deregister → drain → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Serving starts before readiness; only registration waits on the gate
//! - signal.rs is the one-shot primitive under the gate, "started" and
//!   shutdown
//! - Shutdown has timeout: forced exit after deadline

pub mod gate;
pub mod registration;
pub mod shutdown;
pub mod signal;
pub mod signals;
pub mod startup;
pub mod state;

pub use gate::{GateError, ReadinessGate, REPLAY_COMPLETE, ROUTES_DEPLOYED};
pub use registration::{Registration, RegistrationTrigger};
pub use shutdown::Shutdown;
pub use signal::{Signal, SignalListener};
pub use startup::{bind, Bootstrap, BootstrapError};
pub use state::{BootstrapState, StateReporter};
