//! Request descriptors.
//!
//! # Responsibilities
//! - Describe one logical API call (endpoint, method, headers, body, query)
//! - Merge client-wide default headers at send time
//!
//! # Design Decisions
//! - Descriptors are plain serializable values so the offline queue can persist them
//! - Call-specific headers override defaults with the same name (case-insensitive)
//! - Ordered maps keep the persisted JSON stable across saves

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods the client issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An immutable description of a single API call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    /// Path appended to the client's base URL (e.g. `/leads`).
    pub endpoint: String,

    #[serde(default)]
    pub method: Method,

    /// Call-specific headers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    /// JSON body, serialized by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, String>,
}

impl RequestDescriptor {
    /// Create a descriptor with no headers, body or query parameters.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            method,
            headers: BTreeMap::new(),
            body: None,
            query_params: BTreeMap::new(),
        }
    }

    pub fn get(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Get, endpoint)
    }

    pub fn post(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, endpoint).with_body(body)
    }

    pub fn put(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, endpoint).with_body(body)
    }

    pub fn patch(endpoint: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, endpoint).with_body(body)
    }

    pub fn delete(endpoint: impl Into<String>) -> Self {
        Self::new(Method::Delete, endpoint)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Add every `(key, value)` pair as a query parameter.
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.query_params.insert(key.into(), value.into());
        }
        self
    }

    /// Return a copy whose headers are `defaults` overlaid with this descriptor's own headers.
    pub fn with_defaults(&self, defaults: &BTreeMap<String, String>) -> Self {
        let mut headers: BTreeMap<String, String> = defaults
            .iter()
            .filter(|(name, _)| {
                !self
                    .headers
                    .keys()
                    .any(|own| own.eq_ignore_ascii_case(name))
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            headers,
            ..self.clone()
        }
    }

    /// Look up a header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_headers_override_defaults() {
        let mut defaults = BTreeMap::new();
        defaults.insert("Content-Type".to_string(), "application/json".to_string());
        defaults.insert("Authorization".to_string(), "Bearer old".to_string());

        let request = RequestDescriptor::get("/leads").with_header("authorization", "Bearer call");
        let merged = request.with_defaults(&defaults);

        assert_eq!(merged.headers.len(), 2);
        assert_eq!(merged.header("Authorization"), Some("Bearer call"));
        assert_eq!(merged.header("content-type"), Some("application/json"));
        // The original descriptor is untouched
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_persisted_shape_is_camel_case() {
        let request = RequestDescriptor::post("/leads", json!({"name": "A"}))
            .with_query("source", "web");

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "POST");
        assert_eq!(value["queryParams"]["source"], "web");
        assert!(value.get("headers").is_none());

        let decoded: RequestDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_missing_method_defaults_to_get() {
        let decoded: RequestDescriptor = serde_json::from_str(r#"{"endpoint":"/x"}"#).unwrap();
        assert_eq!(decoded.method, Method::Get);
        assert!(decoded.body.is_none());
    }
}
