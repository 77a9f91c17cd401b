//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the forwarding gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Inbound listener settings.
    pub listener: ListenerConfig,

    /// Outbound forwarding policy and defaults.
    pub forwarder: ForwarderConfig,

    /// Inbound caller allow-list.
    pub access: AccessConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum size of an inbound forward payload in bytes.
    pub max_payload_bytes: usize,

    /// Deadline for handling one inbound request, in milliseconds.
    /// Must exceed the longest outbound timeout.
    pub request_timeout_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_payload_bytes: 10 * 1024 * 1024,
            request_timeout_ms: 130_000,
        }
    }
}

/// Outbound forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Hosts that may be contacted (subdomains included). Empty = any host.
    pub allowed_hosts: Vec<String>,

    /// Outbound timeout when the payload sets none, in milliseconds.
    pub default_timeout_ms: u64,

    /// Largest upstream response buffered in memory, in bytes.
    pub max_response_bytes: u64,

    /// Redirects followed per outbound call.
    pub max_redirects: usize,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: Vec::new(),
            default_timeout_ms: 30_000,
            max_response_bytes: 5 * 1024 * 1024,
            max_redirects: 5,
        }
    }
}

/// Inbound access control.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Caller IP addresses allowed to submit forwards. Empty = allow all.
    pub allowed_clients: Vec<String>,

    /// Take the caller address from `X-Forwarded-For` instead of the socket.
    /// Enable only behind a trusted reverse proxy.
    pub trust_forwarded_for: bool,
}

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Log output style.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
