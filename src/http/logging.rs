//! Access logging for inbound calls.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;

/// Log arrival and completion of every inbound request.
pub async fn access_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request_id(&request).to_string();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    tracing::info!(request_id = %request_id, method = %method, path = %path, client = %client, "Incoming request");

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        tracing::warn!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), elapsed_ms, "Request failed");
    } else {
        tracing::info!(request_id = %request_id, method = %method, path = %path, status = status.as_u16(), elapsed_ms, "Handled request");
    }

    response
}
