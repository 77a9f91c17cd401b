//! Response body classification.
//!
//! JSON content types (`application/json`, any `+json` suffix) are decoded;
//! anything else is base64-encoded so the envelope is always text-safe.
//! A JSON content type with an undecodable body is an error, never a
//! silent base64 fallback.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::forwarder::error::ForwardError;
use crate::forwarder::response::{ResponseBody, ResponseHeaders};

/// Whether a Content-Type value declares JSON.
pub fn looks_like_json(content_type: &str) -> bool {
    let ct = content_type.to_ascii_lowercase();
    ct.contains("application/json") || ct.contains("+json")
}

pub fn classify(raw: &[u8], headers: &ResponseHeaders) -> Result<ResponseBody, ForwardError> {
    match headers.content_type() {
        Some(ct) if looks_like_json(ct) => decode_json(raw).map(ResponseBody::json),
        _ => Ok(encode_base64(raw)),
    }
}

/// Base64 envelope body, used directly for responses that cannot carry a
/// body (HEAD, 204, 304) even when they advertise JSON.
pub fn encode_base64(raw: &[u8]) -> ResponseBody {
    ResponseBody::base64(STANDARD.encode(raw))
}

fn decode_json(raw: &[u8]) -> Result<serde_json::Value, ForwardError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| ForwardError::UpstreamMalformedJson(format!("body is not valid UTF-8: {e}")))?;
    // A UTF-8 BOM is legal in front of JSON text.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    serde_json::from_str(text).map_err(|e| ForwardError::UpstreamMalformedJson(e.to_string()))
}
