//! Inbound caller allow-list middleware.
//!
//! Runs before the forward handler. An empty list lets every caller through.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::config::AccessConfig;
use crate::forwarder::ErrorBody;

/// State required for access control.
#[derive(Debug, Clone)]
pub struct ClientAllowList {
    allowed: Arc<[IpAddr]>,
    trust_forwarded_for: bool,
}

impl ClientAllowList {
    /// Entries that are not IP addresses are skipped; config validation
    /// reports them.
    pub fn from_config(config: &AccessConfig) -> Self {
        let allowed: Vec<IpAddr> = config
            .allowed_clients
            .iter()
            .filter_map(|c| c.trim().parse::<IpAddr>().ok())
            .map(|ip| ip.to_canonical())
            .collect();
        Self {
            allowed: allowed.into(),
            trust_forwarded_for: config.trust_forwarded_for,
        }
    }

    pub fn is_open(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn is_allowed(&self, ip: IpAddr) -> bool {
        self.is_open() || self.allowed.contains(&ip.to_canonical())
    }

    /// Caller address: first `X-Forwarded-For` hop when trusted, otherwise
    /// the socket peer.
    pub fn caller_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
        if self.trust_forwarded_for {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse::<IpAddr>().ok());
            if forwarded.is_some() {
                return forwarded;
            }
        }
        peer.map(|addr| addr.ip())
    }
}

pub async fn client_allowlist_middleware(
    State(allow): State<ClientAllowList>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if allow.is_open() {
        return next.run(request).await;
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    match allow.caller_ip(request.headers(), peer) {
        Some(ip) if allow.is_allowed(ip) => next.run(request).await,
        caller => {
            let shown = caller
                .map(|ip| ip.to_canonical().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(client = %shown, "Caller rejected by client allow-list");
            let body = ErrorBody {
                ok: false,
                error: "CLIENT_NOT_ALLOWED".to_string(),
                details: format!("IP address {shown} is not allowed."),
            };
            (StatusCode::FORBIDDEN, Json(body)).into_response()
        }
    }
}
