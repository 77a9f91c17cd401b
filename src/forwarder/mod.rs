//! Request-forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardRequest (payload.rs, validated)
//!     → security::host_allowlist (reject early)
//!     → builder.rs (headers.rs + body.rs + tls.rs → OutboundRequestConfig)
//!     → transport.rs (one outbound call, raw bytes)
//!     → classify.rs (JSON or base64)
//!     → response.rs (ForwarderResponse envelope)
//! ```
//!
//! Any stage may short-circuit to a [`ForwardError`].
//!
//! # Design Decisions
//! - No state survives an invocation; allow-lists and defaults are read-only
//! - Upstream HTTP error statuses are successful forwards
//! - No retries

pub mod body;
pub mod builder;
pub mod classify;
pub mod error;
pub mod headers;
pub mod payload;
pub mod pipeline;
pub mod response;
pub mod tls;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use builder::{OutboundRequestConfig, RequestBuilder};
pub use error::{ErrorBody, ForwardError};
pub use headers::HeaderList;
pub use payload::{ForwardRequest, HttpMethod, QueryParams, RequestBody};
pub use pipeline::ForwardingPipeline;
pub use response::{ForwarderResponse, ForwarderResponseMeta, ResponseBody};
pub use tls::TlsOptions;
pub use transport::{RawResponse, ReqwestTransport, Transport, TransportError};
