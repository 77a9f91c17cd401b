//! Configuration loading from disk and environment.
//!
//! Precedence, lowest first: built-in defaults, TOML file, environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_PATH_ENV: &str = "FORWARDER_CONFIG";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {message}")]
    Env { name: &'static str, message: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from an optional TOML file plus the
/// process environment.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    normalize(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay the environment variables the gateway understands.
///
/// `lookup` abstracts the environment so tests need not mutate it.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        let port: u16 = parse_env("PORT", &port)?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{host}:{port}");
    }
    if let Some(hosts) = lookup("ALLOWED_HOSTS") {
        config.forwarder.allowed_hosts = split_list(&hosts);
    }
    if let Some(clients) = lookup("ALLOWED_CLIENTS") {
        config.access.allowed_clients = split_list(&clients);
    }
    if let Some(timeout) = lookup("UPSTREAM_TIMEOUT_MS") {
        config.forwarder.default_timeout_ms = parse_env("UPSTREAM_TIMEOUT_MS", &timeout)?;
    }
    if let Some(max) = lookup("MAX_RESPONSE_BYTES") {
        config.forwarder.max_response_bytes = parse_env("MAX_RESPONSE_BYTES", &max)?;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level = level.trim().to_string();
    }
    Ok(())
}

/// Trim list entries, drop blanks, lower-case hostnames.
fn normalize(config: &mut GatewayConfig) {
    config.forwarder.allowed_hosts = config
        .forwarder
        .allowed_hosts
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .filter(|h| !h.is_empty())
        .collect();
    config.access.allowed_clients = config
        .access
        .allowed_clients
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        name,
        message: e.to_string(),
    })
}
