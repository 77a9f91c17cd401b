//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → logging.rs (access log)
//!     → security::client_allowlist (caller gate)
//!     → forward handler → forwarder::ForwardingPipeline
//!     → JSON envelope or error body
//! ```

pub mod logging;
pub mod request;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
