//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup)
//!     → request.rs (add / propagate request ID)
//!     → middleware.rs (response headers, metrics)
//!     → health handlers (/sd/health, /sd/ready) or /metrics
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
