//! Outbound body encoding.
//!
//! Decides how a caller-supplied body goes on the wire based on the declared
//! Content-Type. Only `application/x-www-form-urlencoded` triggers a rewrite;
//! everything else is passed through for the transport to serialize.

use bytes::Bytes;
use serde_json::Value;
use url::form_urlencoded;

use crate::forwarder::headers::HeaderList;
use crate::forwarder::payload::RequestBody;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Body ready for the transport.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EncodedBody {
    #[default]
    None,
    Text(String),
    /// Structured data the transport serializes as JSON.
    Json(Value),
    Bytes(Bytes),
}

/// Encode `body` according to the Content-Type found in `headers`.
pub fn encode(body: &RequestBody, headers: &HeaderList) -> EncodedBody {
    if body.is_empty() {
        return EncodedBody::None;
    }

    let is_form = headers
        .get("content-type")
        .is_some_and(|ct| ct.to_ascii_lowercase().contains(FORM_CONTENT_TYPE));

    match body {
        RequestBody::Empty => EncodedBody::None,
        RequestBody::Text(s) => EncodedBody::Text(s.clone()),
        RequestBody::Form(pairs) => EncodedBody::Text(serialize_pairs(pairs)),
        RequestBody::Binary(b) => EncodedBody::Bytes(b.clone()),
        RequestBody::Structured(Value::Object(map)) if is_form => {
            EncodedBody::Text(serialize_pairs(&flatten_object(map)))
        }
        RequestBody::Structured(v) => EncodedBody::Json(v.clone()),
    }
}

/// `key=value&key2=value2`, form-encoded, in input order.
pub fn serialize_pairs(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Flatten a JSON object into string pairs.
///
/// Scalars are stringified, arrays repeat the key once per element, null
/// becomes an empty value and nested objects are sent as compact JSON.
pub fn flatten_object(map: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_to_string(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_to_string(other))),
        }
    }
    pairs
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form_headers() -> HeaderList {
        [("Content-Type", "application/x-www-form-urlencoded")].into_iter().collect()
    }

    #[test]
    fn test_object_is_form_encoded_in_key_order() {
        let body = RequestBody::Structured(json!({ "a": "1", "b": "2" }));
        assert_eq!(encode(&body, &form_headers()), EncodedBody::Text("a=1&b=2".into()));

        let body = RequestBody::Structured(json!({ "z": "1", "a": "2" }));
        assert_eq!(encode(&body, &form_headers()), EncodedBody::Text("z=1&a=2".into()));
    }

    #[test]
    fn test_pre_encoded_string_unchanged() {
        let body = RequestBody::Text("a=1&b=hello%20world".into());
        assert_eq!(
            encode(&body, &form_headers()),
            EncodedBody::Text("a=1&b=hello%20world".into())
        );
    }

    #[test]
    fn test_reserved_characters_are_escaped() {
        let body = RequestBody::Structured(json!({ "q": "a b&c=d", "e": "ü" }));
        assert_eq!(
            encode(&body, &form_headers()),
            EncodedBody::Text("q=a+b%26c%3Dd&e=%C3%BC".into())
        );
    }

    #[test]
    fn test_form_pairs_become_string() {
        let body = RequestBody::Form(vec![("x".into(), "1".into()), ("x".into(), "2".into())]);
        assert_eq!(encode(&body, &HeaderList::new()), EncodedBody::Text("x=1&x=2".into()));
    }

    #[test]
    fn test_scalar_and_array_values() {
        let body = RequestBody::Structured(json!({
            "n": 5, "t": true, "none": null, "list": ["a", "b"]
        }));
        assert_eq!(
            encode(&body, &form_headers()),
            EncodedBody::Text("n=5&t=true&none=&list=a&list=b".into())
        );
    }

    #[test]
    fn test_content_type_lookup_is_case_insensitive() {
        let headers: HeaderList = [("CONTENT-TYPE", "Application/X-WWW-Form-Urlencoded; charset=UTF-8")]
            .into_iter()
            .collect();
        let body = RequestBody::Structured(json!({ "a": "1" }));
        assert_eq!(encode(&body, &headers), EncodedBody::Text("a=1".into()));
    }

    #[test]
    fn test_other_content_types_pass_through() {
        let json_headers: HeaderList = [("Content-Type", "application/json")].into_iter().collect();
        let body = RequestBody::Structured(json!({ "a": "1" }));
        assert_eq!(encode(&body, &json_headers), EncodedBody::Json(json!({ "a": "1" })));
        assert_eq!(encode(&body, &HeaderList::new()), EncodedBody::Json(json!({ "a": "1" })));

        let text = RequestBody::Text("plain".into());
        assert_eq!(encode(&text, &json_headers), EncodedBody::Text("plain".into()));
    }

    #[test]
    fn test_array_body_under_form_type_passes_through() {
        let body = RequestBody::Structured(json!([1, 2]));
        assert_eq!(encode(&body, &form_headers()), EncodedBody::Json(json!([1, 2])));
    }

    #[test]
    fn test_empty_bodies() {
        assert_eq!(encode(&RequestBody::Empty, &form_headers()), EncodedBody::None);
        assert_eq!(encode(&RequestBody::Text(String::new()), &form_headers()), EncodedBody::None);
    }

    #[test]
    fn test_binary_untouched() {
        let body = RequestBody::Binary(Bytes::from_static(&[0, 159, 146, 150]));
        assert_eq!(
            encode(&body, &form_headers()),
            EncodedBody::Bytes(Bytes::from_static(&[0, 159, 146, 150]))
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let body = RequestBody::Structured(json!({ "b": "2", "a": "1" }));
        assert_eq!(encode(&body, &form_headers()), encode(&body, &form_headers()));
    }
}
