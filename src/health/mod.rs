//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Startup liveness probe (probe.rs):
//!     GET <service url>/sd/health, fixed interval, bounded attempts
//!     → success: routes deployed
//!     → exhaustion: fatal to the process
//!
//! Health routes (handlers.rs):
//!     /sd/health → 200 while the router serves
//!     /sd/ready  → 200 once the service is announced
//!
//! Resource checks (resources.rs):
//!     /sd/disk, /sd/cpu, /sd/ram → 200 OK / 429 WARNING / 500 CRITICAL
//! ```
//!
//! # Design Decisions
//! - The probe targets the service's own router, not a local flag, so the
//!   whole middleware chain is exercised
//! - The same /sd/health route backs the discovery agent's health check

pub mod handlers;
pub mod probe;
pub mod resources;

pub use probe::{LivenessProbe, ProbeError};
