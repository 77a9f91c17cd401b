//! Forwarding pipeline.
//!
//! ```text
//! Validated → HostChecked → RequestBuilt → Executed → Classified → Done
//!      └────────────┴─────────────┴────────────┴───────────┴──→ Failed(kind)
//! ```
//!
//! One invocation issues at most one outbound call and never retries. The
//! outbound call is the only await point; no locks are held across it.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};
use url::Url;

use crate::config::ForwarderConfig;
use crate::forwarder::builder::RequestBuilder;
use crate::forwarder::classify;
use crate::forwarder::error::ForwardError;
use crate::forwarder::payload::{ForwardRequest, HttpMethod};
use crate::forwarder::response::{ForwarderResponse, ForwarderResponseMeta};
use crate::forwarder::transport::Transport;
use crate::observability::metrics;
use crate::security::HostAllowList;

/// Shared, read-only after construction.
#[derive(Clone)]
pub struct ForwardingPipeline {
    allowed_hosts: HostAllowList,
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
}

impl ForwardingPipeline {
    pub fn new(config: &ForwarderConfig, transport: Arc<dyn Transport>) -> Self {
        let allowed_hosts = HostAllowList::new(&config.allowed_hosts);
        Self {
            builder: RequestBuilder::new(config, allowed_hosts.clone()),
            allowed_hosts,
            transport,
        }
    }

    /// Run one payload through every stage.
    pub async fn forward(&self, payload: &ForwardRequest) -> Result<ForwarderResponse, ForwardError> {
        let start = Instant::now();
        let result = self.run(payload).await;

        match &result {
            Ok(resp) => metrics::record_forward(payload.method.as_str(), "ok", Some(resp.meta.status), start),
            Err(err) => metrics::record_forward(payload.method.as_str(), err.outcome(), None, start),
        }
        result
    }

    async fn run(&self, payload: &ForwardRequest) -> Result<ForwarderResponse, ForwardError> {
        payload.validate()?;

        if !self.allowed_hosts.is_allowed(&payload.url) {
            let host = Url::parse(&payload.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| payload.url.clone());
            warn!(host = %host, method = %payload.method, "Outbound host rejected by allow-list");
            return Err(ForwardError::HostNotAllowed { host });
        }

        let request = self.builder.build(payload)?;
        let method = request.method;

        debug!(
            method = %method,
            url = %request.url,
            timeout_ms = request.timeout.as_millis() as u64,
            verify_tls = request.tls.reject_unauthorized,
            client_cert = request.tls.identity.is_some(),
            "Executing outbound request"
        );

        let raw = self.transport.execute(request).await.map_err(|e| {
            error!(method = %method, url = %payload.url, error = %e, "Outbound request failed");
            ForwardError::UpstreamUnreachable {
                detail: e.to_string(),
                timed_out: e.is_timeout(),
            }
        })?;

        let body = if method == HttpMethod::Head || matches!(raw.status, 204 | 304) {
            classify::encode_base64(&raw.body)
        } else {
            classify::classify(&raw.body, &raw.headers).inspect_err(|e| {
                error!(url = %payload.url, status = raw.status, error = %e, "Upstream declared JSON but body did not parse");
            })?
        };

        debug!(status = raw.status, body = body.kind(), bytes = raw.body.len(), "Upstream responded");

        Ok(ForwarderResponse::new(
            ForwarderResponseMeta {
                status: raw.status,
                status_text: raw.status_text,
                headers: raw.headers,
            },
            body,
        ))
    }
}
