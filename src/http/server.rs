//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, limits, access log, caller gate)
//! - Bind server to listener
//! - Hand forward payloads to the pipeline and serialize the outcome

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::forwarder::{ForwardError, ForwardRequest, ForwarderResponse, ForwardingPipeline, ReqwestTransport, Transport};
use crate::http::logging::access_log_middleware;
use crate::http::request::UuidRequestId;
use crate::security::{client_allowlist_middleware, ClientAllowList};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: ForwardingPipeline,
}

/// HTTP server for the forwarding gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a server that forwards with the reqwest transport.
    pub fn new(config: GatewayConfig) -> Self {
        let transport = ReqwestTransport::new()
            .with_user_agent(concat!("egress-forwarder/", env!("CARGO_PKG_VERSION")));
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a server with a custom transport.
    pub fn with_transport(config: GatewayConfig, transport: Arc<dyn Transport>) -> Self {
        let state = AppState {
            pipeline: ForwardingPipeline::new(&config.forwarder, transport),
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config: Arc::new(config),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let clients = ClientAllowList::from_config(&config.access);

        let forward = Router::new()
            .route("/forwarder/exec", post(exec_handler))
            .route_layer(middleware::from_fn_with_state(clients, client_allowlist_middleware))
            .with_state(state);

        Router::new()
            .route("/health", get(health_handler))
            .merge(forward)
            .layer(middleware::from_fn(access_log_middleware))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.listener.max_payload_bytes))
            .layer(middleware::map_response_with_state(
                config.listener.max_payload_bytes,
                payload_too_large_as_json,
            ))
            .layer(TimeoutLayer::new(Duration::from_millis(config.listener.request_timeout_ms)))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Router with all layers, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            allowed_hosts = self.config.forwarder.allowed_hosts.len(),
            allowed_clients = self.config.access.allowed_clients.len(),
            "HTTP server starting"
        );
        if self.config.forwarder.allowed_hosts.is_empty() {
            tracing::warn!("Outbound host allow-list is empty; any host may be contacted");
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `POST /forwarder/exec`
async fn exec_handler(
    State(state): State<AppState>,
    payload: Result<Json<ForwardRequest>, JsonRejection>,
) -> Result<Json<ForwarderResponse>, ForwardError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "Rejected forward payload");
        ForwardError::InvalidPayload(rejection.body_text())
    })?;

    state.pipeline.forward(&payload).await.map(Json)
}

/// Rewrite the body limit's plain-text 413 into the gateway's error body.
async fn payload_too_large_as_json(State(limit): State<usize>, response: Response) -> Response {
    if response.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::debug!(limit, "Rejected oversized request body");
        return ForwardError::InvalidPayload(format!("request body exceeds {limit} bytes")).into_response();
    }
    response
}

/// `GET /health`
async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
