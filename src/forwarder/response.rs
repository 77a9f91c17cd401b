//! Response envelope returned for every executed forward.
//!
//! `ok` is true whenever the transport completed, whatever the upstream
//! status; callers read `meta.status` themselves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A response header value; repeated headers become a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderField {
    Single(String),
    Multiple(Vec<String>),
}

impl HeaderField {
    /// First value, for lookups such as Content-Type.
    pub fn first(&self) -> Option<&str> {
        match self {
            HeaderField::Single(v) => Some(v),
            HeaderField::Multiple(vs) => vs.first().map(String::as_str),
        }
    }

    fn append(&mut self, value: String) {
        match self {
            HeaderField::Single(existing) => {
                *self = HeaderField::Multiple(vec![std::mem::take(existing), value]);
            }
            HeaderField::Multiple(vs) => vs.push(value),
        }
    }
}

/// Response headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResponseHeaders(BTreeMap<String, HeaderField>);

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match self.0.get_mut(&name) {
            Some(field) => field.append(value),
            None => {
                self.0.insert(name, HeaderField::Single(value));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&HeaderField> {
        self.0.get(&name.to_ascii_lowercase())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type").and_then(HeaderField::first)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = ResponseHeaders::new();
        for (k, v) in iter {
            headers.append(k.as_ref(), v);
        }
        headers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderResponseMeta {
    pub status: u16,
    pub status_text: String,
    pub headers: ResponseHeaders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Base64,
}

/// Exactly one representation of the upstream body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Json {
        #[serde(rename = "bodyJson")]
        body_json: Value,
    },
    Base64 {
        #[serde(rename = "bodyBase64")]
        body_base64: String,
        #[serde(rename = "bodyEncoding")]
        body_encoding: BodyEncoding,
    },
}

impl ResponseBody {
    pub fn json(value: Value) -> Self {
        ResponseBody::Json { body_json: value }
    }

    pub fn base64(encoded: String) -> Self {
        ResponseBody::Base64 {
            body_base64: encoded,
            body_encoding: BodyEncoding::Base64,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResponseBody::Json { .. } => "json",
            ResponseBody::Base64 { .. } => "base64",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForwarderResponse {
    pub ok: bool,
    pub meta: ForwarderResponseMeta,
    #[serde(flatten)]
    pub body: ResponseBody,
}

impl ForwarderResponse {
    pub fn new(meta: ForwarderResponseMeta, body: ResponseBody) -> Self {
        Self { ok: true, meta, body }
    }

    pub fn body_json(&self) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json { body_json } => Some(body_json),
            ResponseBody::Base64 { .. } => None,
        }
    }

    pub fn body_base64(&self) -> Option<&str> {
        match &self.body {
            ResponseBody::Base64 { body_base64, .. } => Some(body_base64),
            ResponseBody::Json { .. } => None,
        }
    }
}
