//! Inbound forward payload and its validation.
//!
//! # Responsibilities
//! - Deserialize the caller's description of an outbound request
//! - Reject malformed payloads before anything touches the network
//!
//! # Design Decisions
//! - Unknown fields are rejected, so a caller cannot smuggle transport
//!   behavior (e.g. a pre-built TLS agent) through the payload
//! - `cert`/`key` and the legacy `timeout` field are accepted for older callers

use axum::http::{HeaderName, HeaderValue};
use bytes::Bytes;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use url::Url;

use crate::forwarder::error::ForwardError;
use crate::forwarder::headers::HeaderList;

/// Lowest accepted per-request timeout.
pub const MIN_TIMEOUT_MS: u64 = 100;
/// Highest accepted per-request timeout.
pub const MAX_TIMEOUT_MS: u64 = 120_000;

/// Methods a caller may forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Methods defined to carry no request body.
    pub fn is_bodyless(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied request body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    /// Raw text, sent as-is.
    Text(String),
    /// Structured data (any JSON value other than a string).
    Structured(Value),
    /// Pre-built form pairs.
    Form(Vec<(String, String)>),
    /// Opaque bytes. Only reachable from library callers.
    Binary(Bytes),
}

impl RequestBody {
    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Text(s) => s.is_empty(),
            RequestBody::Structured(v) => v.is_null(),
            RequestBody::Form(pairs) => pairs.is_empty(),
            RequestBody::Binary(b) => b.is_empty(),
        }
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RequestBody::Empty,
            Value::String(s) => RequestBody::Text(s),
            other => RequestBody::Structured(other),
        }
    }
}

impl<'de> Deserialize<'de> for RequestBody {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(RequestBody::from)
    }
}

/// Query parameters to append to the target URL.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParams {
    /// Key/value object; array values repeat the key.
    Map(serde_json::Map<String, Value>),
    /// Pre-encoded query string (`a=1&b=2`, leading `?` optional).
    Encoded(String),
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Object(map) => Ok(QueryParams::Map(map)),
            Value::String(s) => Ok(QueryParams::Encoded(s.trim_start_matches('?').to_string())),
            _ => Err(serde::de::Error::custom(
                "params must be an object or a query string",
            )),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Complete description of one outbound call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForwardRequest {
    pub url: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub method: HttpMethod,

    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: HeaderList,

    #[serde(default)]
    pub body: RequestBody,

    #[serde(default)]
    pub params: Option<QueryParams>,

    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Legacy spelling of `timeout_ms`; loses when both are present.
    #[serde(default)]
    pub timeout: Option<u64>,

    #[serde(default)]
    pub max_body_length: Option<u64>,

    #[serde(default)]
    pub reject_unauthorized: Option<bool>,

    #[serde(default, alias = "cert")]
    pub client_cert: Option<String>,

    #[serde(default, alias = "key")]
    pub client_key: Option<String>,
}

impl ForwardRequest {
    /// A GET to `url` with every optional field unset.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::default(),
            headers: HeaderList::default(),
            body: RequestBody::default(),
            params: None,
            timeout_ms: None,
            timeout: None,
            max_body_length: None,
            reject_unauthorized: None,
            client_cert: None,
            client_key: None,
        }
    }

    /// Shape and range checks. Runs before any outbound work.
    pub fn validate(&self) -> Result<(), ForwardError> {
        let url = Url::parse(&self.url)
            .map_err(|e| ForwardError::InvalidPayload(format!("url is not a valid absolute URL: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ForwardError::InvalidPayload(format!(
                "url scheme must be http or https, got {}",
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(ForwardError::InvalidPayload("url must include a host".into()));
        }

        check_timeout("timeoutMs", self.timeout_ms)?;
        check_timeout("timeout", self.timeout)?;

        if self.max_body_length == Some(0) {
            return Err(ForwardError::InvalidPayload(
                "maxBodyLength must be a positive integer".into(),
            ));
        }

        for (name, value) in self.headers.iter() {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ForwardError::InvalidPayload(format!("invalid header name: {name:?}")))?;
            HeaderValue::from_str(value)
                .map_err(|_| ForwardError::InvalidPayload(format!("invalid value for header {name}")))?;
        }

        if self.client_key.is_some() && self.client_cert.is_none() {
            return Err(ForwardError::InvalidPayload(
                "clientKey requires clientCert".into(),
            ));
        }

        Ok(())
    }
}

fn check_timeout(field: &str, value: Option<u64>) -> Result<(), ForwardError> {
    match value {
        Some(ms) if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&ms) => {
            Err(ForwardError::InvalidPayload(format!(
                "{field} must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}, got {ms}"
            )))
        }
        _ => Ok(()),
    }
}
