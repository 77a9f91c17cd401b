//! Outbound request construction.
//!
//! # Data Flow
//! ```text
//! ForwardRequest
//!     → headers.rs (strip hop-by-hop and Content-Length, drop Content-Type on GET/HEAD)
//!     → body.rs (form-encode when declared)
//!     → tls.rs (client identity, verification flag)
//!     → timeout / size-limit resolution
//!     → OutboundRequestConfig
//! ```
//!
//! # Design Decisions
//! - Pure composition; the only failure is an internal invariant violation
//! - A caller may lower the response cap but never raise it above the
//!   process-wide limit

use std::time::Duration;

use url::{form_urlencoded, Url};

use crate::config::ForwarderConfig;
use crate::forwarder::body::{self, EncodedBody};
use crate::forwarder::error::ForwardError;
use crate::forwarder::headers::{self, HeaderList};
use crate::forwarder::payload::{ForwardRequest, HttpMethod, QueryParams};
use crate::forwarder::tls::{self, TlsOptions};
use crate::security::HostAllowList;

/// Redirect rules handed to the transport.
#[derive(Debug, Clone)]
pub struct RedirectPolicy {
    pub max_redirects: usize,
    /// Redirect targets must pass the same allow-list as the original URL.
    pub allowed_hosts: HostAllowList,
}

/// Fully resolved outbound call. Owned by a single pipeline invocation.
///
/// The transport buffers the response as raw bytes and treats every HTTP
/// status as a normal result.
#[derive(Debug, Clone)]
pub struct OutboundRequestConfig {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderList,
    pub body: EncodedBody,
    pub query: Vec<(String, String)>,
    pub timeout: Duration,
    /// Cap on the outbound request body.
    pub max_body_length: u64,
    /// Cap on the buffered response body.
    pub max_response_bytes: u64,
    pub tls: TlsOptions,
    pub redirects: RedirectPolicy,
}

/// Builds [`OutboundRequestConfig`] values from payloads using the
/// process-wide defaults.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    default_timeout: Duration,
    max_response_bytes: u64,
    redirects: RedirectPolicy,
}

impl RequestBuilder {
    pub fn new(config: &ForwarderConfig, allowed_hosts: HostAllowList) -> Self {
        Self {
            default_timeout: Duration::from_millis(config.default_timeout_ms),
            max_response_bytes: config.max_response_bytes,
            redirects: RedirectPolicy {
                max_redirects: config.max_redirects,
                allowed_hosts,
            },
        }
    }

    pub fn build(&self, payload: &ForwardRequest) -> Result<OutboundRequestConfig, ForwardError> {
        let url = Url::parse(&payload.url).map_err(|e| {
            ForwardError::Internal(format!("validated url failed to parse: {e}"))
        })?;

        let body = body::encode(&payload.body, &payload.headers);

        let mut headers = headers::strip_content_type_for_safe_methods(
            &headers::strip_content_length(&headers::strip_hop_by_hop(&payload.headers)),
            payload.method,
        );
        if matches!(body, EncodedBody::Json(_))
            && !payload.method.is_bodyless()
            && !headers.contains("content-type")
        {
            headers.push("Content-Type", "application/json");
        }

        let max_body_length = payload.max_body_length.unwrap_or(self.max_response_bytes);

        Ok(OutboundRequestConfig {
            method: payload.method,
            url,
            headers,
            body,
            query: resolve_query(payload.params.as_ref()),
            timeout: self.resolve_timeout(payload),
            max_body_length,
            max_response_bytes: max_body_length.min(self.max_response_bytes),
            tls: tls::resolve(payload),
            redirects: self.redirects.clone(),
        })
    }

    /// `timeoutMs`, then the legacy `timeout`, then the process default.
    fn resolve_timeout(&self, payload: &ForwardRequest) -> Duration {
        payload
            .timeout_ms
            .or(payload.timeout)
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout)
    }
}

fn resolve_query(params: Option<&QueryParams>) -> Vec<(String, String)> {
    match params {
        None => Vec::new(),
        Some(QueryParams::Map(map)) => body::flatten_object(map),
        Some(QueryParams::Encoded(query)) => form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
    }
}
