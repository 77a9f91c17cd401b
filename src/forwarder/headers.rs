//! Outbound header sanitization.
//!
//! # Responsibilities
//! - Hold caller-supplied headers in their original order and casing
//! - Strip hop-by-hop headers before replaying them on a new connection
//! - Drop Content-Type on bodyless methods (GET, HEAD)
//!
//! # Design Decisions
//! - Pure transforms: every function returns a new list, the input is untouched
//! - Names compare case-insensitively; values are never rewritten

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::forwarder::payload::HttpMethod;

/// Connection-scoped headers that must not cross a proxy hop.
pub const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Ordered header list. Serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(String, String)>);

impl HeaderList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append a header, keeping any existing entries with the same name.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value for `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy of the list without entries whose name matches `drop`.
    fn without(&self, drop: impl Fn(&str) -> bool) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !drop(k))
                .cloned()
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Serialize for HeaderList {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for HeaderList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeaderListVisitor;

        impl<'de> Visitor<'de> for HeaderListVisitor {
            type Value = HeaderList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    entries.push((k, v));
                }
                Ok(HeaderList(entries))
            }
        }

        deserializer.deserialize_map(HeaderListVisitor)
    }
}

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Remove every hop-by-hop header. Idempotent.
pub fn strip_hop_by_hop(headers: &HeaderList) -> HeaderList {
    headers.without(is_hop_by_hop)
}

/// Remove Content-Length. The transport frames the encoded body itself.
pub fn strip_content_length(headers: &HeaderList) -> HeaderList {
    headers.without(|k| k.eq_ignore_ascii_case("content-length"))
}

/// Remove Content-Type when `method` carries no body.
///
/// Some upstream APIs reject a Content-Type on a GET.
pub fn strip_content_type_for_safe_methods(headers: &HeaderList, method: HttpMethod) -> HeaderList {
    if method.is_bodyless() {
        headers.without(|k| k.eq_ignore_ascii_case("content-type"))
    } else {
        headers.clone()
    }
}
