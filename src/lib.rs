//! Egress Forwarder Library
//!
//! An outbound HTTP gateway: callers describe a request as JSON, the gateway
//! checks the destination against an allow-list, performs the call and
//! returns the upstream status, headers and body in a uniform envelope.

pub mod config;
pub mod forwarder;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use forwarder::{ForwardError, ForwardRequest, ForwarderResponse, ForwardingPipeline};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
