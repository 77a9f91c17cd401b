//! Forwarding error taxonomy.
//!
//! Upstream 4xx/5xx statuses are not errors here; they travel inside a
//! successful envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of one pipeline invocation.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Payload failed shape or range checks. Never reached the network.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Destination host is outside the allow-list.
    #[error("host {host} is not allowed")]
    HostNotAllowed { host: String },

    /// DNS, connect, TLS, timeout or size-limit failure.
    #[error("{detail}")]
    UpstreamUnreachable { detail: String, timed_out: bool },

    /// Upstream declared JSON but sent something else.
    #[error("upstream returned malformed JSON: {0}")]
    UpstreamMalformedJson(String),

    /// Invariant violation inside the pipeline.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ForwardError {
    /// Stable wire code.
    pub fn code(&self) -> &'static str {
        match self {
            ForwardError::InvalidPayload(_) => "INVALID_PAYLOAD",
            ForwardError::HostNotAllowed { .. } => "HOST_NOT_ALLOWED",
            ForwardError::UpstreamUnreachable { .. } => "REQUEST_EXECUTION_FAILED",
            ForwardError::UpstreamMalformedJson(_) => "UPSTREAM_MALFORMED_JSON",
            ForwardError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ForwardError::InvalidPayload(_) | ForwardError::HostNotAllowed { .. } => {
                StatusCode::BAD_REQUEST
            }
            ForwardError::UpstreamUnreachable { timed_out: true, .. } => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::UpstreamUnreachable { .. } | ForwardError::UpstreamMalformedJson(_) => {
                StatusCode::BAD_GATEWAY
            }
            ForwardError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ForwardError::InvalidPayload(_) => "invalid_payload",
            ForwardError::HostNotAllowed { .. } => "host_not_allowed",
            ForwardError::UpstreamUnreachable { .. } => "upstream_unreachable",
            ForwardError::UpstreamMalformedJson(_) => "upstream_malformed_json",
            ForwardError::Internal(_) => "internal_error",
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let details = match self {
            // The transport message is passed through verbatim.
            ForwardError::UpstreamUnreachable { detail, .. } => detail.clone(),
            other => other.to_string(),
        };
        ErrorBody {
            ok: false,
            error: self.code().to_string(),
            details,
        }
    }
}

/// Error body sent to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    pub details: String,
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.to_body())).into_response()
    }
}
