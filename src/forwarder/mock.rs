//! Scripted transport for tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::forwarder::builder::OutboundRequestConfig;
use crate::forwarder::response::ResponseHeaders;
use crate::forwarder::transport::{RawResponse, Transport, TransportError};

type Script = Box<dyn Fn() -> Result<RawResponse, TransportError> + Send + Sync>;

/// Returns a scripted result and records what it was asked to send.
pub struct MockTransport {
    script: Script,
    calls: AtomicUsize,
    last: Mutex<Option<OutboundRequestConfig>>,
}

impl MockTransport {
    pub fn respond(status: u16, content_type: &str, body: impl Into<Bytes>) -> Self {
        let headers: ResponseHeaders = [("content-type", content_type)].into_iter().collect();
        let body = body.into();
        Self::scripted(move || {
            Ok(RawResponse {
                status,
                status_text: reason(status).to_string(),
                headers: headers.clone(),
                body: body.clone(),
            })
        })
    }

    pub fn fail(make_error: impl Fn() -> TransportError + Send + Sync + 'static) -> Self {
        Self::scripted(move || Err(make_error()))
    }

    pub fn scripted(
        script: impl Fn() -> Result<RawResponse, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Box::new(script),
            calls: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<OutboundRequestConfig> {
        self.last.lock().expect("mock transport mutex poisoned").clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: OutboundRequestConfig) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().expect("mock transport mutex poisoned") = Some(request);
        (self.script)()
    }
}

fn reason(status: u16) -> &'static str {
    axum::http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
}
