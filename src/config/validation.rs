//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts, size limits)
//! - Validate addresses and allow-list entries
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use crate::config::schema::GatewayConfig;
use crate::forwarder::payload::{MAX_TIMEOUT_MS, MIN_TIMEOUT_MS};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// `127.0.0.1`, `::1` or `[::1]`.
fn is_ip_literal(host: &str) -> bool {
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    host.parse::<IpAddr>().is_ok()
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_payload_bytes == 0 {
        errors.push(ValidationError::new("listener.max_payload_bytes", "must be greater than 0"));
    }

    let fwd = &config.forwarder;
    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&fwd.default_timeout_ms) {
        errors.push(ValidationError::new(
            "forwarder.default_timeout_ms",
            format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"),
        ));
    }
    if config.listener.request_timeout_ms <= MAX_TIMEOUT_MS {
        errors.push(ValidationError::new(
            "listener.request_timeout_ms",
            format!("must exceed the {MAX_TIMEOUT_MS}ms outbound ceiling"),
        ));
    }
    if fwd.max_response_bytes == 0 {
        errors.push(ValidationError::new("forwarder.max_response_bytes", "must be greater than 0"));
    }
    for host in &fwd.allowed_hosts {
        if is_ip_literal(host) {
            continue;
        }
        if host.contains("://") || host.contains('/') || host.contains(':') || host.contains('@') {
            errors.push(ValidationError::new(
                "forwarder.allowed_hosts",
                format!("'{host}' must be a bare hostname"),
            ));
        }
    }

    for client in &config.access.allowed_clients {
        if client.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::new(
                "access.allowed_clients",
                format!("'{client}' is not an IP address"),
            ));
        }
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
