//! Service bootstrap library.
//!
//! Starts the HTTP router, verifies it with a self liveness probe, waits
//! for event replay, then registers the service with discovery.

pub mod config;
pub mod discovery;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod replay;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{Bootstrap, BootstrapError, ReadinessGate, Shutdown, Signal};
