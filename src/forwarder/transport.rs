//! Outbound transport.
//!
//! # Responsibilities
//! - Execute one fully built [`OutboundRequestConfig`]
//! - Buffer the response as raw bytes, bounded by `max_response_bytes`
//! - Report every HTTP status as a normal result
//!
//! # Design Decisions
//! - The pipeline depends on the [`Transport`] trait only, so tests swap in
//!   a scripted double
//! - One reqwest client per call: TLS identity and verification are
//!   per-request and nothing is pooled across callers
//! - Redirect targets are re-checked against the host allow-list

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use reqwest::{Client, Identity, Method};
use thiserror::Error;

use crate::forwarder::body::EncodedBody;
use crate::forwarder::builder::{OutboundRequestConfig, RedirectPolicy};
use crate::forwarder::payload::HttpMethod;
use crate::forwarder::response::ResponseHeaders;

/// What came back from the upstream.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: ResponseHeaders,
    pub body: Bytes,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    #[error("{0}")]
    Connect(String),

    #[error("{0}")]
    Tls(String),

    #[error("request body larger than maxBodyLength limit of {limit} bytes")]
    RequestBodyTooLarge { limit: u64 },

    #[error("response body larger than limit of {limit} bytes")]
    ResponseTooLarge { limit: u64 },

    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

/// Performs the network I/O for one outbound call.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutboundRequestConfig) -> Result<RawResponse, TransportError>;
}

/// [`Transport`] backed by reqwest with rustls.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    user_agent: Option<String>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// User-Agent sent when the caller supplies none.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    fn client_for(&self, request: &OutboundRequestConfig) -> Result<Client, TransportError> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .timeout(request.timeout)
            .redirect(redirect_policy(request.redirects.clone()))
            .danger_accept_invalid_certs(!request.tls.reject_unauthorized);

        if let Some(ua) = &self.user_agent {
            builder = builder.user_agent(ua.clone());
        }

        if let Some(identity) = &request.tls.identity {
            let identity = Identity::from_pem(&identity.to_pem_bundle())
                .map_err(|e| TransportError::Tls(format!("invalid client certificate: {}", describe(&e))))?;
            builder = builder.identity(identity);
        }

        builder
            .build()
            .map_err(|e| TransportError::Other(describe(&e)))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: OutboundRequestConfig) -> Result<RawResponse, TransportError> {
        let client = self.client_for(&request)?;
        let timeout_ms = request.timeout.as_millis() as u64;

        let mut outbound = client
            .request(to_method(request.method), request.url.clone())
            .headers(to_header_map(&request)?);

        if !request.query.is_empty() {
            outbound = outbound.query(&request.query);
        }
        if let Some(body) = body_bytes(&request.body)? {
            if body.len() as u64 > request.max_body_length {
                return Err(TransportError::RequestBodyTooLarge {
                    limit: request.max_body_length,
                });
            }
            outbound = outbound.body(body);
        }

        let response = outbound
            .send()
            .await
            .map_err(|e| classify_error(&e, timeout_ms))?;

        let status = response.status();
        let mut headers = ResponseHeaders::new();
        for (name, value) in response.headers() {
            headers.append(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }

        let body = read_bounded(response, request.max_response_bytes, timeout_ms).await?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

async fn read_bounded(
    mut response: reqwest::Response,
    limit: u64,
    timeout_ms: u64,
) -> Result<Bytes, TransportError> {
    if response.content_length().is_some_and(|len| len > limit) {
        return Err(TransportError::ResponseTooLarge { limit });
    }

    let mut buf = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| classify_error(&e, timeout_ms))?
    {
        if (buf.len() + chunk.len()) as u64 > limit {
            return Err(TransportError::ResponseTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf.freeze())
}

fn redirect_policy(policy: RedirectPolicy) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > policy.max_redirects {
            attempt.stop()
        } else if !policy.allowed_hosts.is_url_allowed(attempt.url()) {
            tracing::warn!(target_url = %attempt.url(), "Redirect to disallowed host not followed");
            attempt.stop()
        } else {
            attempt.follow()
        }
    })
}

fn to_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Options => Method::OPTIONS,
    }
}

fn to_header_map(request: &OutboundRequestConfig) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(request.headers.len());
    for (name, value) in request.headers.iter() {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| TransportError::InvalidRequest(format!("header name {name:?}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| TransportError::InvalidRequest(format!("value of header {name}")))?;
        map.append(name, value);
    }
    Ok(map)
}

fn body_bytes(body: &EncodedBody) -> Result<Option<Bytes>, TransportError> {
    Ok(match body {
        EncodedBody::None => None,
        EncodedBody::Text(s) => Some(Bytes::from(s.clone())),
        EncodedBody::Bytes(b) => Some(b.clone()),
        EncodedBody::Json(v) => Some(Bytes::from(
            serde_json::to_vec(v).map_err(|e| TransportError::InvalidRequest(e.to_string()))?,
        )),
    })
}

/// Error message including the source chain, e.g.
/// `error sending request for url (...): client error (Connect): tcp connect error`.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

fn classify_error(err: &reqwest::Error, timeout_ms: u64) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout_ms);
    }

    let message = describe(err);
    let lower = message.to_ascii_lowercase();
    if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
        TransportError::Tls(message)
    } else if err.is_connect() {
        TransportError::Connect(message)
    } else {
        TransportError::Other(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ForwarderConfig;
    use crate::forwarder::builder::RequestBuilder;
    use crate::forwarder::payload::ForwardRequest;
    use crate::forwarder::tls::ClientIdentity;
    use crate::security::HostAllowList;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn build(url: &str) -> OutboundRequestConfig {
        RequestBuilder::new(&ForwarderConfig::default(), HostAllowList::default())
            .build(&ForwardRequest::new(url))
            .unwrap()
    }

    /// Serves one canned HTTP response and returns the raw request it saw.
    async fn one_shot(response: &'static [u8]) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (format!("http://{addr}"), handle)
    }

    /// Answers every request with a 302 to `location` and counts the hits.
    async fn redirecting(location: &'static str) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        (format!("http://{addr}"), hits)
    }

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_method(HttpMethod::Patch), Method::PATCH);
        assert_eq!(to_method(HttpMethod::Options), Method::OPTIONS);
    }

    #[test]
    fn test_body_bytes() {
        assert!(body_bytes(&EncodedBody::None).unwrap().is_none());
        assert_eq!(
            body_bytes(&EncodedBody::Json(serde_json::json!({ "a": 1 }))).unwrap(),
            Some(Bytes::from_static(br#"{"a":1}"#))
        );
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_failure() {
        let (url, server) = one_shot(
            b"HTTP/1.1 503 Service Unavailable\r\nContent-Type: text/plain\r\nContent-Length: 4\r\nConnection: close\r\n\r\ndown",
        )
        .await;

        let raw = ReqwestTransport::new().execute(build(&url)).await.unwrap();
        assert_eq!(raw.status, 503);
        assert_eq!(raw.status_text, "Service Unavailable");
        assert_eq!(raw.headers.content_type(), Some("text/plain"));
        assert_eq!(&raw.body[..], b"down");
        assert!(server.await.unwrap().starts_with("GET / HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_oversize_response_rejected() {
        let (url, _server) = one_shot(
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789",
        )
        .await;

        let mut config = build(&url);
        config.max_response_bytes = 4;
        let err = ReqwestTransport::new().execute(config).await.unwrap_err();
        assert!(matches!(err, TransportError::ResponseTooLarge { limit: 4 }));
    }

    #[tokio::test]
    async fn test_oversize_request_body_rejected_before_sending() {
        let mut config = build("http://127.0.0.1:9/");
        config.body = EncodedBody::Text("x".repeat(32));
        config.max_body_length = 8;
        let err = ReqwestTransport::new().execute(config).await.unwrap_err();
        assert!(matches!(err, TransportError::RequestBodyTooLarge { limit: 8 }));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = ReqwestTransport::new()
            .execute(build(&format!("http://{addr}/")))
            .await
            .unwrap_err();
        assert!(!err.is_timeout());
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_reported() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut config = build(&format!("http://{addr}/"));
        config.timeout = Duration::from_millis(150);
        let err = ReqwestTransport::new().execute(config).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timeout of 150ms exceeded");
    }

    #[tokio::test]
    async fn test_redirect_to_disallowed_host_not_followed() {
        let (url, hits) = redirecting("http://evil.invalid/steal").await;

        let mut config = build(&format!("{url}/start"));
        config.redirects.allowed_hosts = HostAllowList::new(["127.0.0.1"]);
        let raw = ReqwestTransport::new().execute(config).await.unwrap();

        assert_eq!(raw.status, 302);
        assert_eq!(raw.headers.get("location").and_then(|h| h.first()), Some("http://evil.invalid/steal"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_redirect_hop_limit() {
        let (url, hits) = redirecting("/again").await;

        let mut config = build(&format!("{url}/start"));
        config.redirects.max_redirects = 2;
        let raw = ReqwestTransport::new().execute(config).await.unwrap();

        assert_eq!(raw.status, 302);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_invalid_client_certificate_is_tls_error() {
        let mut config = build("https://127.0.0.1:9/");
        config.tls.identity = Some(ClientIdentity {
            certificate: "not a certificate".into(),
            key: Some("not a key".into()),
        });

        let err = ReqwestTransport::new().execute(config).await.unwrap_err();
        assert!(matches!(err, TransportError::Tls(_)), "unexpected error: {err}");
        assert!(err.to_string().contains("invalid client certificate"));
    }
}
